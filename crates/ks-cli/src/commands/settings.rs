//! Resolved client and cluster configuration

use std::path::Path;

use anyhow::{bail, Context, Result};

use ks_core::config::{self, ClientConfig, KubeConfig};

/// Configuration shared by all stream commands
#[derive(Debug)]
pub struct Settings {
    pub client: ClientConfig,
    pub kube: KubeConfig,
}

impl Settings {
    /// Load settings from the command-line overrides
    ///
    /// An explicit `config_path` must exist; the default client config
    /// file is optional. The kubeconfig comes from `kubeconfig_path`, then
    /// the client config, then the usual search order.
    pub fn load(
        config_path: Option<&Path>,
        kubeconfig_path: Option<&Path>,
        context: Option<&str>,
    ) -> Result<Self> {
        let client = match config_path {
            Some(path) => config::load_config(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => {
                let path = config::default_config_path();
                if path.exists() {
                    config::load_config(&path)
                        .with_context(|| format!("failed to load {}", path.display()))?
                } else {
                    ClientConfig::default()
                }
            }
        };

        let mut kube = KubeConfig::new();
        match kubeconfig_path.or(client.kubeconfig.as_deref()) {
            Some(path) => kube
                .load_from_file(path)
                .with_context(|| format!("failed to load kubeconfig {}", path.display()))?,
            None => kube
                .load_from_default()
                .context("failed to load kubeconfig")?,
        }

        if let Some(name) = context {
            if kube.context(name).is_none() {
                bail!("context {:?} not found in kubeconfig", name);
            }
            kube.set_current_context(name);
        }

        Ok(Self { client, kube })
    }

    /// Namespace to use: explicit flag, then kubeconfig context, then client default
    pub fn namespace(&self, flag: Option<&str>) -> String {
        flag.or(self.kube.current_namespace())
            .unwrap_or(&self.client.namespace)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
clusters:
- name: dev
  cluster:
    server: https://dev.example.com
contexts:
- name: dev
  context:
    cluster: dev
    user: dev
    namespace: tools
- name: bare
  context:
    cluster: dev
    user: dev
users:
- name: dev
  user:
    token: abc
current-context: dev
"#;

    fn write_kubeconfig(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("kubeconfig");
        std::fs::write(&path, KUBECONFIG).unwrap();
        path
    }

    #[test]
    fn test_namespace_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let kubeconfig = write_kubeconfig(&dir);
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "namespace = \"fallback\"\n").unwrap();

        let settings = Settings::load(Some(&config), Some(&kubeconfig), None).unwrap();
        assert_eq!(settings.namespace(Some("explicit")), "explicit");
        assert_eq!(settings.namespace(None), "tools");

        let settings = Settings::load(Some(&config), Some(&kubeconfig), Some("bare")).unwrap();
        assert_eq!(settings.namespace(None), "fallback");
    }

    #[test]
    fn test_unknown_context_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let kubeconfig = write_kubeconfig(&dir);
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();

        let err = Settings::load(Some(&config), Some(&kubeconfig), Some("prod")).unwrap_err();
        assert!(err.to_string().contains("prod"));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let kubeconfig = write_kubeconfig(&dir);
        let result = Settings::load(
            Some(&dir.path().join("missing.toml")),
            Some(&kubeconfig),
            None,
        );
        assert!(result.is_err());
    }
}
