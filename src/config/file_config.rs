use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    process::Command,
};

use base64::Engine;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::KubeconfigError;

/// [`Kubeconfig`] represents information on how to connect to a remote Kubernetes cluster
///
/// Read from `~/.kube/config` in the caller's home directory. Only the keys
/// this client interprets are promoted to fields; everything else is carried
/// through untouched so resolved views keep whatever extra data the file had.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Kubeconfig {
    /// The name of the context used when none is requested explicitly
    #[serde(rename = "current-context", skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,

    /// Referencable names to context configs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<NamedContext>>,

    /// Referencable names to cluster configs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clusters: Option<Vec<NamedCluster>>,

    /// Referencable names to user configs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<NamedAuthInfo>>,

    /// Uninterpreted top-level keys (`kind`, `apiVersion`, `preferences`, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// NamedContext associates name with context.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct NamedContext {
    /// Name of the context
    pub name: String,
    /// Associations for the context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

/// Context stores tuple of cluster and user references.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Context {
    /// Name of the cluster for this context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    /// Name of the user for this context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Uninterpreted keys (`namespace`, extensions, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// NamedCluster associates name with cluster.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct NamedCluster {
    /// Name of the cluster
    pub name: String,
    /// Information about how to communicate with a kubernetes cluster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<Cluster>,
}

/// Cluster stores information to connect to a Kubernetes cluster.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Cluster {
    /// The address of the kubernetes cluster (https://hostname:port)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// The path to a cert file for the certificate authority
    #[serde(rename = "certificate-authority", skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<String>,
    /// Certificate authority contents; takes precedence over `certificate_authority`
    #[serde(rename = "certificate-authority-data", skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
    /// Uninterpreted keys
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// NamedAuthInfo associates name with authentication.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct NamedAuthInfo {
    /// Name of the user
    pub name: String,
    /// Information that describes identity of the user
    #[serde(rename = "user", skip_serializing_if = "Option::is_none")]
    pub auth_info: Option<AuthInfo>,
}

/// AuthInfo stores information to tell the cluster who you are.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AuthInfo {
    /// Path to a client cert file for TLS
    #[serde(rename = "client-certificate", skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<String>,
    /// Client cert contents; takes precedence over `client_certificate`
    #[serde(rename = "client-certificate-data", skip_serializing_if = "Option::is_none")]
    pub client_certificate_data: Option<String>,

    /// Path to a client key file for TLS
    #[serde(rename = "client-key", skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    /// Client key contents; takes precedence over `client_key`
    #[serde(
        rename = "client-key-data",
        skip_serializing_if = "Option::is_none",
        default,
        serialize_with = "serialize_secretstring",
        deserialize_with = "deserialize_secretstring"
    )]
    pub client_key_data: Option<SecretString>,

    /// Specifies a custom authentication plugin for the kubernetes cluster
    #[serde(rename = "auth-provider", skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<AuthProvider>,

    /// Uninterpreted keys
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[cfg(test)]
impl PartialEq for AuthInfo {
    fn eq(&self, other: &Self) -> bool {
        serde_json::to_value(self).unwrap() == serde_json::to_value(other).unwrap()
    }
}

/// AuthProvider wraps provider-specific credential state.
///
/// A bearer token may appear in two places: refreshed tokens land in
/// `config.access-token`, while some tools write a top-level `access-token`
/// next to `config`. Both shapes are kept addressable.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AuthProvider {
    /// Bearer token stored directly on the provider
    #[serde(rename = "access-token", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Provider configuration, including refresh-command settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<AuthProviderConfig>,
    /// Uninterpreted keys (`name`, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// AuthProviderConfig stores credential state for a provider.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AuthProviderConfig {
    /// Bearer token to present to the cluster
    #[serde(rename = "access-token", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Expiry timestamp of `access_token`; absent means non-expiring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    /// Executable refreshing the token
    #[serde(rename = "cmd-path", skip_serializing_if = "Option::is_none")]
    pub cmd_path: Option<String>,
    /// Arguments handed to `cmd_path` through the shell
    #[serde(rename = "cmd-args", skip_serializing_if = "Option::is_none")]
    pub cmd_args: Option<String>,
    /// Brace-wrapped JSON path of the expiry in the command output
    #[serde(rename = "expiry-key", skip_serializing_if = "Option::is_none")]
    pub expiry_key: Option<String>,
    /// Brace-wrapped JSON path of the token in the command output
    #[serde(rename = "token-key", skip_serializing_if = "Option::is_none")]
    pub token_key: Option<String>,
    /// Uninterpreted keys
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

fn serialize_secretstring<S>(pw: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match pw {
        Some(secret) => serializer.serialize_str(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_secretstring<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer) {
        Ok(Some(secret)) => Ok(Some(SecretString::from(secret))),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Some helpers on the raw config object are exposed for people needing to parse it
impl Kubeconfig {
    /// Read the config from `~/.kube/config`.
    pub async fn read() -> Result<Kubeconfig, KubeconfigError> {
        let path = default_kube_path().ok_or(KubeconfigError::FindHome)?;
        Self::read_from(path).await
    }

    /// Read a config from an arbitrary location.
    pub async fn read_from<P: AsRef<Path>>(path: P) -> Result<Kubeconfig, KubeconfigError> {
        let path = path.as_ref();
        if tokio::fs::metadata(path).await.is_err() {
            return Err(KubeconfigError::NotFound(path.to_path_buf()));
        }
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| KubeconfigError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        serde_yaml::from_str(&data).map_err(|source| KubeconfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a config from a YAML string.
    pub fn from_yaml(text: &str) -> Result<Kubeconfig, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

/// Returns kubeconfig path from `$HOME/.kube/config`.
fn default_kube_path() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(".kube").join("config"))
}

impl Cluster {
    /// Materialize `certificate-authority-data`.
    ///
    /// Inline data passes through unchanged; otherwise an existing file at
    /// `certificate-authority` is read and its contents stored as given.
    pub(crate) async fn resolved(mut self) -> Result<Cluster, KubeconfigError> {
        if let Some(ca) =
            data_or_file(&self.certificate_authority_data, &self.certificate_authority).await?
        {
            self.certificate_authority_data = Some(ca);
        }
        Ok(self)
    }
}

impl AuthInfo {
    /// Materialize certificate, key, and token data on a user record.
    ///
    /// Each field resolves independently: inline `-data` values win over
    /// path fields, and resolved values go through [`ensure_decoded`].
    pub(crate) async fn resolved(mut self) -> Result<AuthInfo, KubeconfigError> {
        if let Some(cert) =
            data_or_file(&self.client_certificate_data, &self.client_certificate).await?
        {
            self.client_certificate_data = Some(ensure_decoded(&cert));
        }

        let key_inline = self
            .client_key_data
            .as_ref()
            .map(|key| key.expose_secret().to_owned());
        if let Some(key) = data_or_file(&key_inline, &self.client_key).await? {
            self.client_key_data = Some(SecretString::from(ensure_decoded(&key)));
        }

        self.auth_provider = self.resolve_auth_provider()?;
        Ok(self)
    }

    /// Resolve the auth provider to carry on this user's view.
    ///
    /// A non-empty unexpired `config.access-token` is reused as-is (absent
    /// expiry means non-expiring). A stale or missing token is refreshed
    /// through the configured credential command, which runs synchronously
    /// to completion before resolution continues. A provider whose token is
    /// stale and which has no complete command configuration resolves to
    /// `None` and is dropped from the view.
    fn resolve_auth_provider(&self) -> Result<Option<AuthProvider>, KubeconfigError> {
        let Some(provider) = &self.auth_provider else {
            return Ok(None);
        };
        let Some(config) = &provider.config else {
            return Ok(Some(provider.clone()));
        };

        if let Some(token) = &config.access_token {
            if !token.is_empty() && !is_expired(config.expiry.as_deref()) {
                return Ok(Some(provider.clone()));
            }
        }

        if let (Some(cmd_path), Some(cmd_args), Some(expiry_key), Some(token_key)) = (
            &config.cmd_path,
            &config.cmd_args,
            &config.expiry_key,
            &config.token_key,
        ) {
            let payload = run_credential_command(cmd_path, cmd_args)?;
            let expiry = json_path_value(&payload, expiry_key)?;
            let token = json_path_value(&payload, token_key)?;
            let mut refreshed = provider.clone();
            refreshed.config = Some(AuthProviderConfig {
                access_token: Some(token),
                expiry: Some(expiry),
                ..config.clone()
            });
            return Ok(Some(refreshed));
        }

        Ok(None)
    }
}

/// `true` only when `expiry` parses and lies in the past.
fn is_expired(expiry: Option<&str>) -> bool {
    expiry
        .and_then(|e| e.parse::<DateTime<Utc>>().ok())
        .map(|e| e < Utc::now())
        .unwrap_or(false)
}

/// Run `{cmd_path} {cmd_args}` through the shell and parse stdout as JSON.
fn run_credential_command(cmd_path: &str, cmd_args: &str) -> Result<Value, KubeconfigError> {
    let cmd = format!("{cmd_path} {cmd_args}");
    tracing::debug!(%cmd_path, "refreshing credentials");
    let output = Command::new("sh")
        .arg("-c")
        .arg(&cmd)
        .output()
        .map_err(|source| KubeconfigError::ExecCommand {
            cmd: cmd.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(KubeconfigError::CommandFailed {
            cmd,
            status: output.status,
        });
    }
    serde_json::from_slice(&output.stdout).map_err(KubeconfigError::ParseCommandOutput)
}

/// Resolve a `{.foo.bar}` style key against the command payload.
///
/// Only this brace-wrapped single-expression form is accepted; the braces
/// are stripped and a root selector prefixed before evaluation.
fn json_path_value(json: &Value, path: &str) -> Result<String, KubeconfigError> {
    let pure_path = path.trim_matches(|c| c == '"' || c == '{' || c == '}');
    match jsonpath_lib::select(json, &format!("${pure_path}")) {
        Ok(values) => match values.first() {
            Some(Value::String(value)) => Ok(value.clone()),
            _ => Err(KubeconfigError::MissingCommandKey(pure_path.to_owned())),
        },
        Err(_) => Err(KubeconfigError::MissingCommandKey(pure_path.to_owned())),
    }
}

/// Prefer inline `data`, else read `file` when it exists.
async fn data_or_file(
    data: &Option<String>,
    file: &Option<String>,
) -> Result<Option<String>, KubeconfigError> {
    if let Some(data) = data {
        return Ok(Some(data.clone()));
    }
    if let Some(file) = file {
        if tokio::fs::metadata(file).await.is_ok() {
            let contents = tokio::fs::read_to_string(file).await.map_err(|source| {
                KubeconfigError::ReadFile {
                    path: PathBuf::from(file),
                    source,
                }
            })?;
            return Ok(Some(contents));
        }
    }
    Ok(None)
}

/// Normalize a value that may or may not be base64 encoded.
///
/// The check is self-inverse: a value counts as encoded only when decoding
/// and re-encoding reproduces it exactly (and the decoded bytes are valid
/// UTF-8); anything else is used verbatim.
fn ensure_decoded(value: &str) -> String {
    let engine = base64::engine::general_purpose::STANDARD;
    match engine.decode(value) {
        Ok(decoded) if engine.encode(&decoded) == value => {
            String::from_utf8(decoded).unwrap_or_else(|_| value.to_owned())
        }
        _ => value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn encode(value: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(value)
    }

    #[test]
    fn ensure_decoded_round_trips_encoded_values() {
        for value in ["hello", "client certificate content data", "with\nnewlines\n"] {
            assert_eq!(ensure_decoded(&encode(value)), value);
        }
    }

    #[test]
    fn ensure_decoded_keeps_plain_values_verbatim() {
        for value in [
            "client certificate content",
            "not base64!",
            "-----BEGIN CERTIFICATE-----",
            "",
        ] {
            assert_eq!(ensure_decoded(value), value);
        }
    }

    #[test]
    fn kubeconfig_deserialize_preserves_unknown_keys() {
        let config_yaml = "apiVersion: v1
kind: Config
current-context: minikube
clusters:
- name: minikube
  cluster:
    server: https://192.168.49.2:8443
    certificate-authority: /home/kevin/.minikube/ca.crt
    extensions:
    - extension:
        provider: minikube.sigs.k8s.io
      name: cluster_info
contexts:
- name: minikube
  context:
    cluster: minikube
    user: minikube
    namespace: default
users:
- name: minikube
  user:
    client-certificate: /home/kevin/.minikube/client.crt
    client-key: /home/kevin/.minikube/client.key";

        let config = Kubeconfig::from_yaml(config_yaml).unwrap();
        assert_eq!(config.current_context.as_deref(), Some("minikube"));
        assert_eq!(config.extra.get("kind"), Some(&json!("Config")));

        let cluster = config.clusters.as_ref().unwrap()[0].cluster.as_ref().unwrap();
        assert_eq!(
            cluster.extra.get("extensions").unwrap()[0]["extension"]["provider"],
            json!("minikube.sigs.k8s.io")
        );

        let context = config.contexts.as_ref().unwrap()[0].context.as_ref().unwrap();
        assert_eq!(context.extra.get("namespace"), Some(&json!("default")));
    }

    #[test]
    fn kubeconfig_missing_keys_deserialize_as_absent() {
        let config = Kubeconfig::from_yaml("current-context: foo").unwrap();
        assert!(config.contexts.is_none());
        assert!(config.clusters.is_none());
        assert!(config.users.is_none());
    }

    #[test]
    fn authinfo_debug_does_not_leak_key_data() {
        let auth_info: AuthInfo = serde_yaml::from_str("client-key-data: c3VwZXJzZWNyZXQ=").unwrap();
        let debugged = format!("{auth_info:?}");
        assert!(!debugged.contains("c3VwZXJzZWNyZXQ="));
    }

    #[tokio::test]
    async fn cluster_view_reads_ca_file_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"certificate authority content").unwrap();

        let cluster = Cluster {
            server: Some("https://1.2.3.4:6443".into()),
            certificate_authority: Some(file.path().to_str().unwrap().to_owned()),
            ..Default::default()
        };
        let resolved = cluster.resolved().await.unwrap();
        assert_eq!(
            resolved.certificate_authority_data.as_deref(),
            Some("certificate authority content")
        );
    }

    #[tokio::test]
    async fn cluster_view_prefers_inline_data() {
        let cluster = Cluster {
            certificate_authority: Some("/definitely/not/a/file".into()),
            certificate_authority_data: Some("inline".into()),
            ..Default::default()
        };
        let resolved = cluster.resolved().await.unwrap();
        assert_eq!(resolved.certificate_authority_data.as_deref(), Some("inline"));
    }

    #[tokio::test]
    async fn user_view_reads_certificate_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"client certificate content").unwrap();

        let auth_info = AuthInfo {
            client_certificate: Some(file.path().to_str().unwrap().to_owned()),
            ..Default::default()
        };
        let resolved = auth_info.resolved().await.unwrap();
        assert_eq!(
            resolved.client_certificate_data.as_deref(),
            Some("client certificate content")
        );
    }

    #[tokio::test]
    async fn user_view_decodes_inline_data() {
        let auth_info = AuthInfo {
            client_certificate_data: Some(encode("client certificate content data")),
            client_key_data: Some(SecretString::from(encode("client key content data"))),
            // inline data wins; this path must never be touched
            client_certificate: Some("/definitely/not/a/file".into()),
            ..Default::default()
        };
        let resolved = auth_info.resolved().await.unwrap();
        assert_eq!(
            resolved.client_certificate_data.as_deref(),
            Some("client certificate content data")
        );
        assert_eq!(
            resolved.client_key_data.unwrap().expose_secret(),
            "client key content data"
        );
    }

    #[tokio::test]
    async fn auth_provider_reused_while_unexpired() {
        let auth_info = AuthInfo {
            auth_provider: Some(AuthProvider {
                config: Some(AuthProviderConfig {
                    access_token: Some("unexpired-token".into()),
                    expiry: Some("9000-08-27T04:32:36Z".into()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolved = auth_info.resolved().await.unwrap();
        let config = resolved.auth_provider.unwrap().config.unwrap();
        assert_eq!(config.access_token.as_deref(), Some("unexpired-token"));
        assert_eq!(config.expiry.as_deref(), Some("9000-08-27T04:32:36Z"));
    }

    #[tokio::test]
    async fn auth_provider_reused_when_expiry_absent() {
        let auth_info = AuthInfo {
            auth_provider: Some(AuthProvider {
                config: Some(AuthProviderConfig {
                    access_token: Some("eternal-token".into()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolved = auth_info.resolved().await.unwrap();
        let config = resolved.auth_provider.unwrap().config.unwrap();
        assert_eq!(config.access_token.as_deref(), Some("eternal-token"));
    }

    fn refresh_command_config(access_token: Option<&str>, expiry: Option<&str>) -> AuthInfo {
        AuthInfo {
            auth_provider: Some(AuthProvider {
                config: Some(AuthProviderConfig {
                    access_token: access_token.map(str::to_owned),
                    expiry: expiry.map(str::to_owned),
                    cmd_path: Some("echo".into()),
                    cmd_args: Some(
                        r#"'{"foo": {"token": "generated-token", "expiry": "9000-08-27T04:32:36Z"}}'"#
                            .into(),
                    ),
                    expiry_key: Some("{.foo.expiry}".into()),
                    token_key: Some("{.foo.token}".into()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn auth_provider_refreshed_when_expired() {
        let auth_info = refresh_command_config(Some("expired-token"), Some("2000-08-27T04:32:36Z"));
        let resolved = auth_info.resolved().await.unwrap();
        let config = resolved.auth_provider.unwrap().config.unwrap();
        assert_eq!(config.access_token.as_deref(), Some("generated-token"));
        assert_eq!(config.expiry.as_deref(), Some("9000-08-27T04:32:36Z"));
    }

    #[tokio::test]
    async fn auth_provider_refreshed_when_token_absent() {
        let auth_info = refresh_command_config(None, None);
        let resolved = auth_info.resolved().await.unwrap();
        let config = resolved.auth_provider.unwrap().config.unwrap();
        assert_eq!(config.access_token.as_deref(), Some("generated-token"));
    }

    #[tokio::test]
    async fn auth_provider_dropped_when_stale_and_not_refreshable() {
        let auth_info = AuthInfo {
            auth_provider: Some(AuthProvider {
                config: Some(AuthProviderConfig {
                    access_token: Some("expired-token".into()),
                    expiry: Some("2000-08-27T04:32:36Z".into()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolved = auth_info.resolved().await.unwrap();
        assert!(resolved.auth_provider.is_none());
    }

    #[tokio::test]
    async fn auth_provider_without_config_passes_through() {
        let auth_info = AuthInfo {
            auth_provider: Some(AuthProvider {
                access_token: Some("top-level-token".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolved = auth_info.resolved().await.unwrap();
        assert_eq!(
            resolved.auth_provider.unwrap().access_token.as_deref(),
            Some("top-level-token")
        );
    }

    #[tokio::test]
    async fn credential_command_failure_is_fatal() {
        let auth_info = AuthInfo {
            auth_provider: Some(AuthProvider {
                config: Some(AuthProviderConfig {
                    cmd_path: Some("false".into()),
                    cmd_args: Some("".into()),
                    expiry_key: Some("{.expiry}".into()),
                    token_key: Some("{.token}".into()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            auth_info.resolved().await,
            Err(KubeconfigError::CommandFailed { .. })
        ));
    }

    #[tokio::test]
    async fn credential_command_non_json_output_is_fatal() {
        let auth_info = AuthInfo {
            auth_provider: Some(AuthProvider {
                config: Some(AuthProviderConfig {
                    cmd_path: Some("echo".into()),
                    cmd_args: Some("not json".into()),
                    expiry_key: Some("{.expiry}".into()),
                    token_key: Some("{.token}".into()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            auth_info.resolved().await,
            Err(KubeconfigError::ParseCommandOutput(_))
        ));
    }

    #[test]
    fn json_path_values_extract_strings() {
        let payload = json!({"credential": {"access_token": "tok", "token_expiry": "soon"}});
        assert_eq!(
            json_path_value(&payload, "{.credential.access_token}").unwrap(),
            "tok"
        );
        assert!(matches!(
            json_path_value(&payload, "{.credential.missing}"),
            Err(KubeconfigError::MissingCommandKey(_))
        ));
    }

    #[tokio::test]
    async fn read_from_missing_file_reports_path() {
        let err = Kubeconfig::read_from("/definitely/not/a/kubeconfig")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "kubectl config could not be found: /definitely/not/a/kubeconfig"
        );
    }

    #[tokio::test]
    async fn read_from_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"]").unwrap();
        let path = file.path().to_str().unwrap().to_owned();

        let err = Kubeconfig::read_from(&path).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("kubectl config could not be parsed: {path}")
        );
    }
}
