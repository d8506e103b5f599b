//! Core trait definitions

mod cluster;
mod connector;

pub use cluster::{ActiveClusterConfig, Authenticator};
pub use connector::{ConnectRequest, Connector, Headers, TlsOptions, Transport, TransportEvent};
