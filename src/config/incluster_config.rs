use std::path::{Path, PathBuf};

use crate::error::InClusterError;

/// Environment variable naming the API service host inside a pod.
pub const SERVICE_HOSTENV: &str = "KUBERNETES_SERVICE_HOST";
/// Environment variable naming the API service port inside a pod.
pub const SERVICE_PORTENV: &str = "KUBERNETES_PORT_443_TCP_PORT";

// Mounted service-account credential files
const SERVICE_CERTFILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
const SERVICE_TOKENFILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

pub(crate) fn kube_host() -> Option<String> {
    env_nonempty(SERVICE_HOSTENV)
}

pub(crate) fn kube_port() -> Option<String> {
    env_nonempty(SERVICE_PORTENV)
}

/// Whether the process appears to run as a workload inside a cluster:
/// both service environment variables are set and non-empty.
pub fn in_cluster() -> bool {
    kube_host().is_some() && kube_port().is_some()
}

pub(crate) fn cert_file() -> &'static Path {
    Path::new(SERVICE_CERTFILE)
}

pub(crate) fn token_file() -> &'static Path {
    Path::new(SERVICE_TOKENFILE)
}

/// Read the mounted certificate-authority bundle.
pub(crate) async fn load_cert(path: &Path) -> Result<String, InClusterError> {
    if tokio::fs::metadata(path).await.is_err() {
        return Err(InClusterError::MissingCertFile);
    }
    read(path).await
}

/// Read the mounted service-account token.
pub(crate) async fn load_token(path: &Path) -> Result<String, InClusterError> {
    if tokio::fs::metadata(path).await.is_err() {
        return Err(InClusterError::MissingTokenFile);
    }
    read(path).await
}

async fn read(path: &Path) -> Result<String, InClusterError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| InClusterError::ReadFile {
            path: PathBuf::from(path),
            source,
        })
}
