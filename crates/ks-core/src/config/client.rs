//! Client settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for the kubestream client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Kubeconfig file to use instead of the default search order
    pub kubeconfig: Option<PathBuf>,

    /// Namespace used when none is given on the command line
    pub namespace: String,

    /// Capacity of the per-connection transport event queue
    pub event_channel_capacity: usize,

    /// Maximum bytes read from local input per stdin frame
    pub input_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            namespace: "default".to_string(),
            event_channel_capacity: 256,
            input_chunk_size: 4096,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ClientConfig = toml::from_str(r#"namespace = "kube-system""#).unwrap();
        assert_eq!(config.namespace, "kube-system");
        assert_eq!(config.input_chunk_size, 4096);
        assert!(config.kubeconfig.is_none());
    }
}
