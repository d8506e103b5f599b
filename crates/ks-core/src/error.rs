//! Core error types for kubestream

use ks_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the kubestream crates
#[derive(Error, Debug)]
pub enum KsError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The upgrade handshake failed
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The transport reported an error
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport closed before the handshake completed
    #[error("Connection closed before it was opened")]
    ClosedBeforeOpen,

    /// Write attempted on a closed connection
    #[error("Connection is closed")]
    Closed,

    /// The endpoint URL could not be built
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No context or cluster is selected
    #[error("No cluster is defined.")]
    NoCluster,

    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Kubeconfig with an apiVersion other than v1
    #[error("unknown version: {0}")]
    UnsupportedVersion(String),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Kubeconfig YAML parse error
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to read referenced material (certificates, tokens)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
