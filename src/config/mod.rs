//! Kubernetes connection configuration from `~/.kube/config` or the
//! [cluster environment](https://kubernetes.io/docs/tasks/access-application-cluster/access-cluster/#accessing-the-api-from-a-pod).
//!
//! # Usage
//! The [`Config`] has several constructors plus logic to infer environment.
//!
//! Unless you have issues, prefer using [`Config::infer`], and pass it to a
//! [`Client`][crate::Client].
mod file_config;
mod file_loader;
mod incluster_config;

use std::path::Path;

use http::Uri;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{Error, InClusterError, Result};

pub use file_config::{
    AuthInfo, AuthProvider, AuthProviderConfig, Cluster, Context, Kubeconfig, NamedAuthInfo,
    NamedCluster, NamedContext,
};
pub use file_loader::{ConfigLoader, KubeConfigOptions};
pub use incluster_config::{in_cluster, SERVICE_HOSTENV, SERVICE_PORTENV};

/// Connection descriptor detailing cluster URL, TLS material, and the
/// authorization header, ready to configure an HTTP transport.
///
/// Construct one with [`Config::infer`] (or one of the explicit
/// constructors) and hand it to a [`Client`][crate::Client]. Immutable once
/// built; holds no open resources.
#[derive(Clone, Debug)]
pub struct Config {
    /// The configured cluster url
    pub cluster_url: Uri,
    /// Certificate-authority contents used to verify the server
    pub ca_data: Option<String>,
    /// Client certificate in PEM
    pub client_cert_data: Option<String>,
    /// Client private key in PEM
    pub client_key_data: Option<SecretString>,
    /// Whether to accept invalid certificates
    pub accept_invalid_certs: bool,
    /// Complete `authorization` header value, when credentials resolve to one
    pub authorization: Option<SecretString>,
}

impl Config {
    /// Infer the configuration from the environment.
    ///
    /// Uses the in-cluster environment when both service environment
    /// variables are present, and the local kubeconfig otherwise.
    pub async fn infer() -> Result<Self> {
        if in_cluster() {
            tracing::debug!("configuring from the in-cluster environment");
            Self::from_cluster_env().await
        } else {
            tracing::debug!("configuring from the local kubeconfig");
            Self::from_kubeconfig(&KubeConfigOptions::default()).await
        }
    }

    /// Create configuration from the cluster's environment variables and
    /// mounted service-account files.
    ///
    /// This follows the standard [API Access from a Pod](https://kubernetes.io/docs/tasks/access-application-cluster/access-cluster/#accessing-the-api-from-a-pod)
    /// and relies on the service account's token being mounted.
    pub async fn from_cluster_env() -> Result<Self> {
        Self::cluster_env_config(
            incluster_config::kube_host(),
            incluster_config::kube_port(),
            incluster_config::cert_file(),
            incluster_config::token_file(),
        )
        .await
    }

    async fn cluster_env_config(
        host: Option<String>,
        port: Option<String>,
        cert_file: &Path,
        token_file: &Path,
    ) -> Result<Self> {
        let host = host.ok_or(Error::InCluster(InClusterError::MissingServiceHost))?;
        let port = port.ok_or(Error::InCluster(InClusterError::MissingServicePort))?;
        let ca = incluster_config::load_cert(cert_file).await?;
        let token = incluster_config::load_token(token_file).await?;

        let cluster_url = format!("https://{host}:{port}")
            .parse::<Uri>()
            .map_err(Error::InvalidUri)?;

        Ok(Config {
            cluster_url,
            ca_data: Some(ca),
            client_cert_data: None,
            client_key_data: None,
            accept_invalid_certs: false,
            authorization: Some(SecretString::from(format!("Bearer {token}"))),
        })
    }

    /// Create configuration from the default local kubeconfig file,
    /// resolving `options.context` (or the file's `current-context`).
    pub async fn from_kubeconfig(options: &KubeConfigOptions) -> Result<Self> {
        let loader = ConfigLoader::new_from_options(options).await?;
        Self::new_from_loader(loader)
    }

    /// Create configuration from a [`Kubeconfig`] struct, bypassing the
    /// file read.
    pub async fn from_custom_kubeconfig(
        kubeconfig: Kubeconfig,
        options: &KubeConfigOptions,
    ) -> Result<Self> {
        let loader = ConfigLoader::load(kubeconfig, options.context.as_deref()).await?;
        Self::new_from_loader(loader)
    }

    fn new_from_loader(loader: ConfigLoader) -> Result<Self> {
        let cluster_url = loader
            .cluster
            .server
            .clone()
            .unwrap_or_default()
            .parse::<Uri>()
            .map_err(Error::InvalidUri)?;

        // Client identity only when both halves are present.
        let (client_cert_data, client_key_data) = match (
            &loader.user.client_certificate_data,
            &loader.user.client_key_data,
        ) {
            (Some(cert), Some(key)) => (Some(cert.clone()), Some(key.clone())),
            _ => (None, None),
        };

        // The header is fed by the top-level `access-token` field on the
        // provider, not the nested command configuration.
        let authorization = loader
            .user
            .auth_provider
            .as_ref()
            .and_then(|provider| provider.access_token.as_deref())
            .filter(|token| !token.is_empty())
            .map(|token| SecretString::from(format!("Bearer {token}")));

        Ok(Config {
            cluster_url,
            ca_data: None,
            client_cert_data,
            client_key_data,
            // Server verification stays off for kubeconfig connections,
            // with or without a client certificate pair.
            accept_invalid_certs: true,
            authorization,
        })
    }

    /// Client certificate and key as a single PEM bundle, when both exist.
    pub(crate) fn identity_pem(&self) -> Option<Vec<u8>> {
        let cert = self.client_cert_data.as_ref()?;
        let key = self.client_key_data.as_ref()?;
        let mut buffer = key.expose_secret().as_bytes().to_vec();
        buffer.push(b'\n');
        buffer.extend_from_slice(cert.as_bytes());
        buffer.push(b'\n');
        Some(buffer)
    }
}
