//! Configuration management for kubestream
//!
//! Two files are involved: the cluster kubeconfig (YAML, shared with
//! other Kubernetes tooling) and the client's own settings (TOML).

mod client;
mod kubeconfig;

pub use client::ClientConfig;
pub use kubeconfig::{
    bytes_from_file_or_data, in_cluster_server, AuthProviderConfig, Cluster, Context, ExecConfig,
    ExecEnvVar, KubeConfig, NamedCluster, NamedContext, NamedUser, User, SERVICEACCOUNT_CA_PATH,
    SERVICEACCOUNT_ROOT, SERVICEACCOUNT_TOKEN_PATH,
};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit kubeconfig file
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kubestream")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Get the conventional kubeconfig location (`~/.kube/config`)
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kube").join("config"))
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_client_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "namespace = \"tools\"\ninput_chunk_size = 1024\n").unwrap();

        let loaded: ClientConfig = load_config(&path).unwrap();
        assert_eq!(loaded.namespace, "tools");
        assert_eq!(loaded.input_chunk_size, 1024);
        assert_eq!(loaded.event_channel_capacity, 256);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "namespace = [").unwrap();

        let result: Result<ClientConfig, _> = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<ClientConfig, _> = load_config(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
