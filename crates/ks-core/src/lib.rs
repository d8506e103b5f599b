//! ks-core: Core abstractions and configuration for kubestream
//!
//! This crate provides the error taxonomy, the cluster configuration
//! model and the collaborator traits (connector, transport, active
//! cluster) used by the stream multiplexer and the CLI.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{ConfigError, ConnectionError, KsError};
pub use types::ConnectionState;
