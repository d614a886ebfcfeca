//! Crate for connecting to the Kubernetes API with credentials resolved
//! from the environment
//!
//! Connection credentials come from either the in-cluster service-account
//! environment or the local kubeconfig file, and the resulting [`Client`]
//! is a thin wrapper over the REST API: plain verbs against API paths,
//! watch/log streams, and a wait-until-condition helper.
//!
//! # Example
//!
//! ```rust,no_run
//! use kubelink::{client::EventType, Client};
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Tries the in-cluster environment first, then `~/.kube/config`.
//!     let client = Client::try_default().await?;
//!
//!     client
//!         .upsert(
//!             "/api/v1/namespaces/default/configmaps",
//!             &json!({
//!                 "metadata": { "name": "demo", "labels": { "role": "demo" } },
//!                 "data": { "hello": "world" }
//!             }),
//!         )
//!         .await?;
//!
//!     // Follow a pod and wait for it to finish.
//!     let complete: fn(&Value, EventType) -> bool =
//!         |pod, _| pod["status"]["phase"] == "Succeeded" || pod["status"]["phase"] == "Failed";
//!     let pod = client
//!         .wait_for(complete, "/api/v1/watch/namespaces/default/pods/demo")
//!         .await?;
//!     println!("pod finished as {}", pod["status"]["phase"]);
//!
//!     Ok(())
//! }
//! ```
//!
//! For more details, see:
//!
//! - [`Client`](crate::client) for the request, watch, and wait surface
//! - [`Config`](crate::config) for credential resolution
//! - [`Kubeconfig`](crate::config::Kubeconfig) for the raw kubeconfig model

pub mod client;
pub mod config;
pub mod error;

#[doc(inline)]
pub use client::Client;
#[doc(inline)]
pub use config::Config;
pub use error::{Error, Result};
