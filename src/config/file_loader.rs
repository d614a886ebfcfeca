use super::file_config::{AuthInfo, Cluster, Kubeconfig};
use crate::error::KubeconfigError;

/// KubeConfigOptions stores options used when loading a kubeconfig file.
#[derive(Default, Clone)]
pub struct KubeConfigOptions {
    /// The named context to load; the config's `current-context` when absent
    pub context: Option<String>,
}

/// ConfigLoader resolves a named context into concrete cluster and user
/// records with their credential material filled in.
///
/// Built fresh on every load; nothing is cached between calls.
#[derive(Clone, Debug)]
pub struct ConfigLoader {
    /// Name of the resolved context
    pub context_name: String,
    /// Cluster with materialized certificate-authority data
    pub cluster: Cluster,
    /// User with materialized certificate, key, and token data
    pub user: AuthInfo,
}

impl ConfigLoader {
    /// Resolve from the kubeconfig file in the caller's home directory.
    pub async fn new_from_options(options: &KubeConfigOptions) -> Result<Self, KubeconfigError> {
        let config = Kubeconfig::read().await?;
        Self::load(config, options.context.as_deref()).await
    }

    /// Resolve `context` (or the config's `current-context`) against an
    /// already parsed [`Kubeconfig`].
    ///
    /// Lookups are first-match-wins. A missing cluster or user reports the
    /// context name, not the dangling reference it holds.
    pub async fn load(
        config: Kubeconfig,
        context: Option<&str>,
    ) -> Result<Self, KubeconfigError> {
        let context_name = context
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .or_else(|| config.current_context.clone().filter(|name| !name.is_empty()))
            .ok_or(KubeconfigError::MissingCurrentContext)?;

        let contexts = config
            .contexts
            .as_ref()
            .ok_or(KubeconfigError::MissingContexts)?;
        let context = contexts
            .iter()
            .find(|named| named.name == context_name)
            .ok_or_else(|| KubeconfigError::ContextNotFound(context_name.clone()))?;

        let cluster_ref = context.context.as_ref().and_then(|c| c.cluster.as_deref());
        let clusters = config
            .clusters
            .as_ref()
            .ok_or(KubeconfigError::MissingClusters)?;
        let cluster = clusters
            .iter()
            .find(|named| Some(named.name.as_str()) == cluster_ref)
            .ok_or_else(|| KubeconfigError::ClusterNotFound(context_name.clone()))?;

        let user_ref = context.context.as_ref().and_then(|c| c.user.as_deref());
        let users = config
            .users
            .as_ref()
            .ok_or(KubeconfigError::MissingUsers)?;
        let user = users
            .iter()
            .find(|named| Some(named.name.as_str()) == user_ref)
            .ok_or_else(|| KubeconfigError::UserNotFound(context_name.clone()))?;

        let cluster = cluster.cluster.clone().unwrap_or_default().resolved().await?;
        let user = user.auth_info.clone().unwrap_or_default().resolved().await?;

        Ok(ConfigLoader {
            context_name,
            cluster,
            user,
        })
    }
}
