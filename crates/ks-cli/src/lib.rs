//! ks-cli: Command-line interface for kubestream
//!
//! Provides the `kubestream` binary for attaching to and executing
//! commands in running containers.

pub mod commands;
pub mod output;
pub mod terminal;
