//! Error handling in [`kubelink`][crate]
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenient alias for `Result<T, kubelink::Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors when working with [`kubelink`][crate]
#[derive(Error, Debug)]
pub enum Error {
    /// ApiError for when things fail
    ///
    /// This can be parsed into as an error handling fallback.
    /// It's also what watch endpoints emit on bare error lines.
    #[error("ApiError: {0} ({0:?})")]
    Api(#[source] ErrorResponse),

    /// Hyper error
    #[error("HyperError: {0}")]
    HyperError(#[source] hyper::Error),
    /// Service error
    #[error("ServiceError: {0}")]
    Service(#[source] tower::BoxError),

    /// UTF-8 Error
    #[error("UTF-8 Error: {0}")]
    FromUtf8(#[source] std::string::FromUtf8Error),

    /// Returned when failed to find a newline character within max length.
    /// Should never happen as the max is `usize::MAX`.
    #[error("Error finding newline character")]
    LinesCodecMaxLineLengthExceeded,

    /// Returned on `std::io::Error` when reading an event stream.
    #[error("Error reading events stream: {0}")]
    ReadEvents(#[source] std::io::Error),

    /// Http based error
    #[error("HttpError: {0}")]
    HttpError(#[source] http::Error),

    /// Failed to construct a URI.
    #[error("InvalidUri: {0}")]
    InvalidUri(#[source] http::uri::InvalidUri),

    /// Common error case when requesting parsing into own structs
    #[error("Error deserializing response: {0}")]
    SerdeError(#[source] serde_json::Error),

    /// Configuration error from the kubeconfig file.
    ///
    /// Transparent on purpose: resolution messages are a compatibility
    /// contract and wrapping must not alter them.
    #[error(transparent)]
    Kubeconfig(#[from] KubeconfigError),

    /// Configuration error from the in-cluster environment.
    #[error(transparent)]
    InCluster(#[from] InClusterError),

    /// Neither an explicit config was given nor could one be discovered
    #[error("kubernetes config could not be found")]
    NoConfig(#[source] Box<Error>),

    /// An error with configuring TLS occured
    #[error("SslError: {0}")]
    SslError(String),

    /// An active watch stream closed before a waited-for condition held
    #[error("watch stream closed before the condition was satisfied")]
    WatchClosed,
}

/// An error response from the API.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[error("{message}: {reason}")]
pub struct ErrorResponse {
    /// The status
    pub status: String,
    /// A message about the error
    #[serde(default)]
    pub message: String,
    /// The reason for the error
    #[serde(default)]
    pub reason: String,
    /// The error code
    pub code: u16,
}

#[derive(Error, Debug)]
// Redundant with the error messages and machine names
#[allow(missing_docs)]
/// Possible errors when resolving the kubeconfig file
pub enum KubeconfigError {
    #[error("kubectl could not find home path")]
    FindHome,

    #[error("kubectl config could not be found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("kubectl config could not be parsed: {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("kubectl `current-context` key could not be found")]
    MissingCurrentContext,

    #[error("kubectl `contexts` key could not be found")]
    MissingContexts,

    #[error("kubectl `context` could not be found by key: {0}")]
    ContextNotFound(String),

    #[error("kubectl `clusters` key could not be found")]
    MissingClusters,

    #[error("kubectl `cluster` could not be found by key: {0}")]
    ClusterNotFound(String),

    #[error("kubectl `users` key could not be found")]
    MissingUsers,

    #[error("kubectl `user` could not be found by key: {0}")]
    UserNotFound(String),

    #[error("Failed to read '{path:?}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to run credential command '{cmd}': {source}")]
    ExecCommand {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("credential command '{cmd}' failed with {status}")]
    CommandFailed {
        cmd: String,
        status: std::process::ExitStatus,
    },

    #[error("failed to parse credential command output: {0}")]
    ParseCommandOutput(#[source] serde_json::Error),

    #[error("credential command output had no string value at {0}")]
    MissingCommandKey(String),
}

#[derive(Error, Debug)]
// Redundant with the error messages and machine names
#[allow(missing_docs)]
/// Possible errors when resolving the in-cluster environment
pub enum InClusterError {
    #[error("cannot get kubernetes client config without `KUBERNETES_SERVICE_HOST` env var")]
    MissingServiceHost,

    #[error("cannot get kubernetes client config without `KUBERNETES_PORT_443_TCP_PORT` env var")]
    MissingServicePort,

    #[error("cannot get kubernetes client config without cert file")]
    MissingCertFile,

    #[error("cannot get kubernetes client config without token file")]
    MissingTokenFile,

    #[error("Failed to read '{path:?}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
