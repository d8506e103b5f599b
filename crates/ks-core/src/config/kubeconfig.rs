//! Cluster configuration in kubeconfig format
//!
//! A kubeconfig lists clusters, users and contexts; the current context
//! selects one cluster/user pair. Only that pair is consulted when a
//! connection is made.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::traits::{ActiveClusterConfig, Authenticator, Headers, TlsOptions};

/// Service account mount inside a pod
pub const SERVICEACCOUNT_ROOT: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// CA bundle of the in-cluster service account
pub const SERVICEACCOUNT_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Token of the in-cluster service account
pub const SERVICEACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

const IN_CLUSTER_NAME: &str = "inCluster";
const IN_CLUSTER_USER: &str = "inClusterUser";
const IN_CLUSTER_CONTEXT: &str = "inClusterContext";
const LOADED_CONTEXT: &str = "loaded-context";
const FALLBACK_SERVER: &str = "http://localhost:8080";

/// Connection details for one API server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cluster {
    /// API server URL, e.g. `https://10.0.0.1:6443`
    pub server: String,

    /// Path to a PEM CA bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<PathBuf>,

    /// Base64 PEM CA bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,

    /// Accept any server certificate
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
}

/// Auth plugin settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProviderConfig {
    pub name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

/// Environment variable for an exec credential plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecEnvVar {
    pub name: String,
    pub value: String,
}

/// Exec credential plugin settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<ExecEnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Credentials for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, rename = "tokenFile", skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_provider: Option<AuthProviderConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecConfig>,
}

/// Cluster/user pairing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub cluster: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

/// On-disk document layout
#[derive(Debug, Default, Deserialize)]
struct KubeConfigFile {
    #[serde(default, rename = "apiVersion")]
    api_version: Option<String>,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    users: Vec<NamedUser>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default, rename = "current-context")]
    current_context: Option<String>,
}

/// Loaded cluster configuration
#[derive(Debug, Clone, Default)]
pub struct KubeConfig {
    pub clusters: Vec<NamedCluster>,
    pub users: Vec<NamedUser>,
    pub contexts: Vec<NamedContext>,
    pub current_context: Option<String>,
    /// Directory that relative file references resolve against
    root_dir: Option<PathBuf>,
    authenticators: Vec<Arc<dyn Authenticator>>,
}

impl KubeConfig {
    /// Create an empty configuration with no authenticators
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty configuration consulting `authenticators` in order
    pub fn with_authenticators(authenticators: Vec<Arc<dyn Authenticator>>) -> Self {
        Self {
            authenticators,
            ..Self::default()
        }
    }

    /// Registered token provider strategies
    pub fn authenticators(&self) -> &[Arc<dyn Authenticator>] {
        &self.authenticators
    }

    /// Directory relative paths resolve against
    pub fn root_dir(&self) -> Option<&Path> {
        self.root_dir.as_deref()
    }

    /// Replace the contents with a parsed kubeconfig document
    pub fn load_from_str(&mut self, content: &str) -> Result<(), ConfigError> {
        let file: KubeConfigFile = serde_yaml::from_str(content)?;
        match file.api_version.as_deref() {
            Some("v1") => {}
            other => {
                return Err(ConfigError::UnsupportedVersion(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        }

        self.clusters = file.clusters;
        self.users = file.users;
        self.contexts = file.contexts;
        self.current_context = file.current_context;
        Ok(())
    }

    /// Load a kubeconfig file; relative references resolve from its directory
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        self.root_dir = path.parent().map(Path::to_path_buf);
        self.load_from_str(&content)?;
        tracing::debug!("Loaded kubeconfig from {}", path.display());
        Ok(())
    }

    /// Replace the contents with explicit lists
    pub fn load_from_options(
        &mut self,
        clusters: Vec<NamedCluster>,
        users: Vec<NamedUser>,
        contexts: Vec<NamedContext>,
        current_context: Option<String>,
    ) {
        self.clusters = clusters;
        self.users = users;
        self.contexts = contexts;
        self.current_context = current_context;
    }

    /// Use a single cluster and user through a synthetic context
    pub fn load_from_cluster_and_user(&mut self, cluster: NamedCluster, user: NamedUser) {
        self.contexts = vec![NamedContext {
            name: LOADED_CONTEXT.to_string(),
            context: Context {
                cluster: cluster.name.clone(),
                user: user.name.clone(),
                namespace: None,
            },
        }];
        self.clusters = vec![cluster];
        self.users = vec![user];
        self.current_context = Some(LOADED_CONTEXT.to_string());
    }

    /// Use the service account of the pod this process runs in
    ///
    /// `path_prefix` is prepended to the service account paths.
    pub fn load_from_cluster(&mut self, path_prefix: &str) -> Result<(), ConfigError> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| ConfigError::Invalid("KUBERNETES_SERVICE_HOST is not set".to_string()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| ConfigError::Invalid("KUBERNETES_SERVICE_PORT is not set".to_string()))?;

        let token = std::fs::read_to_string(format!("{}{}", path_prefix, SERVICEACCOUNT_TOKEN_PATH))?;

        self.clusters = vec![NamedCluster {
            name: IN_CLUSTER_NAME.to_string(),
            cluster: Cluster {
                server: in_cluster_server(&host, &port),
                certificate_authority: Some(PathBuf::from(format!(
                    "{}{}",
                    path_prefix, SERVICEACCOUNT_CA_PATH
                ))),
                ..Default::default()
            },
        }];
        self.users = vec![NamedUser {
            name: IN_CLUSTER_USER.to_string(),
            user: User {
                token: Some(token.trim().to_string()),
                ..Default::default()
            },
        }];
        self.contexts = vec![NamedContext {
            name: IN_CLUSTER_CONTEXT.to_string(),
            context: Context {
                cluster: IN_CLUSTER_NAME.to_string(),
                user: IN_CLUSTER_USER.to_string(),
                namespace: None,
            },
        }];
        self.current_context = Some(IN_CLUSTER_CONTEXT.to_string());
        Ok(())
    }

    /// Load using the usual search order
    ///
    /// `$KUBECONFIG`, then `~/.kube/config`, then the in-cluster service
    /// account, then an anonymous user against `http://localhost:8080`.
    pub fn load_from_default(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = std::env::var(super::KUBECONFIG_ENV) {
            if !path.is_empty() {
                return self.load_from_file(Path::new(&path));
            }
        }

        if let Some(path) = super::default_kubeconfig_path() {
            if path.exists() {
                return self.load_from_file(&path);
            }
        }

        if Path::new(SERVICEACCOUNT_TOKEN_PATH).exists() {
            tracing::debug!("Using in-cluster service account");
            return self.load_from_cluster("");
        }

        tracing::debug!("No kubeconfig found, falling back to {}", FALLBACK_SERVER);
        self.load_from_cluster_and_user(
            NamedCluster {
                name: "cluster".to_string(),
                cluster: Cluster {
                    server: FALLBACK_SERVER.to_string(),
                    ..Default::default()
                },
            },
            NamedUser {
                name: "user".to_string(),
                user: User::default(),
            },
        );
        Ok(())
    }

    /// Name of the selected context
    pub fn current_context(&self) -> Option<&str> {
        self.current_context.as_deref()
    }

    /// Select a context by name
    pub fn set_current_context(&mut self, name: impl Into<String>) {
        self.current_context = Some(name.into());
    }

    /// Look up a context by name
    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.context)
    }

    /// Look up a cluster by name
    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.clusters
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.cluster)
    }

    /// Look up a user by name
    pub fn user(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|u| u.name == name).map(|u| &u.user)
    }

    /// The selected context
    pub fn current_context_object(&self) -> Option<&Context> {
        self.context(self.current_context.as_deref()?)
    }

    /// Cluster of the selected context
    pub fn current_cluster(&self) -> Option<&Cluster> {
        self.cluster(&self.current_context_object()?.cluster)
    }

    /// User of the selected context
    pub fn current_user(&self) -> Option<&User> {
        self.user(&self.current_context_object()?.user)
    }

    /// Namespace of the selected context
    pub fn current_namespace(&self) -> Option<&str> {
        self.current_context_object()?.namespace.as_deref()
    }

    fn bearer_token(&self, user: &User) -> Result<Option<String>, ConfigError> {
        if let Some(token) = &user.token {
            return Ok(Some(token.clone()));
        }
        match &user.token_file {
            Some(file) => {
                let path = resolve_path(self.root_dir.as_deref(), file);
                Ok(Some(std::fs::read_to_string(path)?.trim().to_string()))
            }
            None => Ok(None),
        }
    }
}

impl ActiveClusterConfig for KubeConfig {
    fn current_cluster_server_url(&self) -> Result<Url, ConfigError> {
        let cluster = self.current_cluster().ok_or(ConfigError::NoCluster)?;
        Url::parse(&cluster.server).map_err(|e| {
            ConfigError::Invalid(format!("invalid server URL {:?}: {}", cluster.server, e))
        })
    }

    fn apply_auth_headers(&self, headers: &mut Headers) -> Result<(), ConfigError> {
        let Some(user) = self.current_user() else {
            return Ok(());
        };

        let mut authorization = None;
        for authenticator in &self.authenticators {
            if authenticator.is_auth_provider(user) {
                authorization = authenticator.token(user)?;
            }
        }

        if let Some(token) = self.bearer_token(user)? {
            authorization = Some(format!("Bearer {}", token));
        }

        if authorization.is_none() {
            if let Some(username) = &user.username {
                let password = user.password.as_deref().unwrap_or_default();
                let credentials = STANDARD.encode(format!("{}:{}", username, password));
                authorization = Some(format!("Basic {}", credentials));
            }
        }

        if let Some(value) = authorization {
            headers.insert("Authorization".to_string(), value);
        }
        Ok(())
    }

    fn apply_tls_options(&self, opts: &mut TlsOptions) -> Result<(), ConfigError> {
        let Some(user) = self.current_user() else {
            return Ok(());
        };
        let root = self.root_dir.as_deref();

        if let Some(cluster) = self.current_cluster() {
            if cluster.insecure_skip_tls_verify {
                opts.skip_tls_verify = true;
            }
            if let Some(ca) = bytes_from_file_or_data(
                root,
                cluster.certificate_authority.as_deref(),
                cluster.certificate_authority_data.as_deref(),
            )? {
                opts.ca = Some(ca);
            }
        }

        if let Some(cert) = bytes_from_file_or_data(
            root,
            user.client_certificate.as_deref(),
            user.client_certificate_data.as_deref(),
        )? {
            opts.cert = Some(cert);
        }
        if let Some(key) = bytes_from_file_or_data(
            root,
            user.client_key.as_deref(),
            user.client_key_data.as_deref(),
        )? {
            opts.key = Some(key);
        }
        Ok(())
    }
}

/// Server URL for the in-cluster API endpoint
///
/// Plain HTTP is assumed for the conventional insecure ports.
pub fn in_cluster_server(host: &str, port: &str) -> String {
    let scheme = match port {
        "80" | "8080" | "8001" => "http",
        _ => "https",
    };
    if host.contains(':') {
        format!("{}://[{}]:{}", scheme, host, port)
    } else {
        format!("{}://{}:{}", scheme, host, port)
    }
}

/// Read referenced material, preferring a file over inline base64 data
///
/// Relative file paths are resolved against `root`.
pub fn bytes_from_file_or_data(
    root: Option<&Path>,
    file: Option<&Path>,
    data: Option<&str>,
) -> Result<Option<Vec<u8>>, ConfigError> {
    if let Some(file) = file {
        return Ok(Some(std::fs::read(resolve_path(root, file))?));
    }
    match data {
        Some(data) => STANDARD
            .decode(data.trim())
            .map(Some)
            .map_err(|e| ConfigError::Invalid(format!("invalid base64 data: {}", e))),
        None => Ok(None),
    }
}

fn resolve_path(root: Option<&Path>, file: &Path) -> PathBuf {
    match root {
        Some(root) if file.is_relative() => root.join(file),
        _ => file.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
  - name: dev-cluster
    cluster:
      server: https://dev.example.com:6443
      certificate-authority-data: Q0EtREFUQQ==
  - name: local
    cluster:
      server: http://127.0.0.1:8001
      insecure-skip-tls-verify: true
users:
  - name: dev-user
    user:
      token: abc123
  - name: basic-user
    user:
      username: admin
      password: secret
contexts:
  - name: dev
    context:
      cluster: dev-cluster
      user: dev-user
      namespace: tools
  - name: local
    context:
      cluster: local
      user: basic-user
"#;

    fn sample() -> KubeConfig {
        let mut kc = KubeConfig::new();
        kc.load_from_str(SAMPLE).unwrap();
        kc
    }

    #[derive(Debug)]
    struct FixedAuthenticator {
        provider: &'static str,
        token: &'static str,
    }

    impl Authenticator for FixedAuthenticator {
        fn is_auth_provider(&self, user: &User) -> bool {
            user.auth_provider
                .as_ref()
                .is_some_and(|p| p.name == self.provider)
        }

        fn token(&self, _user: &User) -> Result<Option<String>, ConfigError> {
            Ok(Some(self.token.to_string()))
        }
    }

    #[test]
    fn test_load_from_str() {
        let kc = sample();
        assert_eq!(kc.current_context(), Some("dev"));
        assert_eq!(kc.clusters.len(), 2);
        assert_eq!(
            kc.current_cluster().unwrap().server,
            "https://dev.example.com:6443"
        );
        assert_eq!(kc.current_user().unwrap().token.as_deref(), Some("abc123"));
        assert_eq!(kc.current_namespace(), Some("tools"));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut kc = KubeConfig::new();
        let result = kc.load_from_str("apiVersion: v2\nclusters: []\n");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(v)) if v == "v2"));
    }

    #[test]
    fn test_no_cluster_defined() {
        let kc = KubeConfig::new();
        let err = kc.current_cluster_server_url().unwrap_err();
        assert!(matches!(err, ConfigError::NoCluster));
        assert_eq!(err.to_string(), "No cluster is defined.");
    }

    #[test]
    fn test_bearer_token_header() {
        let kc = sample();
        let mut headers = Headers::new();
        kc.apply_auth_headers(&mut headers).unwrap();
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer abc123");
    }

    #[test]
    fn test_basic_auth_header() {
        let mut kc = sample();
        kc.set_current_context("local");
        let mut headers = Headers::new();
        kc.apply_auth_headers(&mut headers).unwrap();
        let expected = format!("Basic {}", STANDARD.encode("admin:secret"));
        assert_eq!(headers.get("Authorization").unwrap(), &expected);
    }

    #[test]
    fn test_authenticators_last_match_wins() {
        let mut kc = KubeConfig::with_authenticators(vec![
            Arc::new(FixedAuthenticator {
                provider: "gcp",
                token: "Bearer first",
            }),
            Arc::new(FixedAuthenticator {
                provider: "gcp",
                token: "Bearer second",
            }),
        ]);
        kc.load_from_cluster_and_user(
            NamedCluster {
                name: "c".to_string(),
                cluster: Cluster {
                    server: "https://c.example.com".to_string(),
                    ..Default::default()
                },
            },
            NamedUser {
                name: "u".to_string(),
                user: User {
                    auth_provider: Some(AuthProviderConfig {
                        name: "gcp".to_string(),
                        config: BTreeMap::new(),
                    }),
                    ..Default::default()
                },
            },
        );

        let mut headers = Headers::new();
        kc.apply_auth_headers(&mut headers).unwrap();
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer second");
    }

    #[test]
    fn test_tls_options_from_data() {
        let kc = sample();
        let mut opts = TlsOptions::default();
        kc.apply_tls_options(&mut opts).unwrap();
        assert_eq!(opts.ca.as_deref(), Some(&b"CA-DATA"[..]));
        assert!(!opts.skip_tls_verify);
        assert!(opts.cert.is_none());
    }

    #[test]
    fn test_skip_tls_verify() {
        let mut kc = sample();
        kc.set_current_context("local");
        let mut opts = TlsOptions::default();
        kc.apply_tls_options(&mut opts).unwrap();
        assert!(opts.skip_tls_verify);
        assert!(opts.ca.is_none());
    }

    #[test]
    fn test_relative_files_resolve_from_kubeconfig_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("client.crt"), b"CERT").unwrap();
        std::fs::write(dir.path().join("token"), b"from-file\n").unwrap();
        let path = dir.path().join("config");
        std::fs::write(
            &path,
            r#"
apiVersion: v1
current-context: ctx
clusters:
  - name: c
    cluster:
      server: https://c.example.com
users:
  - name: u
    user:
      client-certificate: client.crt
      tokenFile: token
contexts:
  - name: ctx
    context:
      cluster: c
      user: u
"#,
        )
        .unwrap();

        let mut kc = KubeConfig::new();
        kc.load_from_file(&path).unwrap();
        assert_eq!(kc.root_dir(), Some(dir.path()));

        let mut opts = TlsOptions::default();
        kc.apply_tls_options(&mut opts).unwrap();
        assert_eq!(opts.cert.as_deref(), Some(&b"CERT"[..]));

        let mut headers = Headers::new();
        kc.apply_auth_headers(&mut headers).unwrap();
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer from-file");
    }

    #[test]
    fn test_load_from_cluster_and_user() {
        let mut kc = KubeConfig::new();
        kc.load_from_cluster_and_user(
            NamedCluster {
                name: "cluster".to_string(),
                cluster: Cluster {
                    server: "https://foo.company.com".to_string(),
                    ..Default::default()
                },
            },
            NamedUser {
                name: "user".to_string(),
                user: User::default(),
            },
        );
        assert_eq!(kc.current_context(), Some("loaded-context"));
        let url = kc.current_cluster_server_url().unwrap();
        assert_eq!(url.host_str(), Some("foo.company.com"));

        let mut headers = Headers::new();
        kc.apply_auth_headers(&mut headers).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_in_cluster_scheme() {
        assert_eq!(in_cluster_server("10.0.0.1", "443"), "https://10.0.0.1:443");
        assert_eq!(in_cluster_server("10.0.0.1", "8080"), "http://10.0.0.1:8080");
        assert_eq!(in_cluster_server("fd00::1", "443"), "https://[fd00::1]:443");
    }
}
