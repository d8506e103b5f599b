//! Active cluster traits

use std::fmt;

use url::Url;

use super::connector::{Headers, TlsOptions};
use crate::config::User;
use crate::error::ConfigError;

/// Source of the endpoint and credentials for the selected cluster
pub trait ActiveClusterConfig: Send + Sync {
    /// Server URL of the current cluster
    ///
    /// Fails with [`ConfigError::NoCluster`] when no cluster is selected.
    fn current_cluster_server_url(&self) -> Result<Url, ConfigError>;

    /// Add authorization headers for the current user
    fn apply_auth_headers(&self, headers: &mut Headers) -> Result<(), ConfigError>;

    /// Add TLS material for the current cluster and user
    fn apply_tls_options(&self, opts: &mut TlsOptions) -> Result<(), ConfigError>;
}

/// Token provider strategy for users configured with an auth plugin
///
/// Authenticators are consulted in the order they were registered; the
/// last one that claims a user wins.
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Whether this strategy handles the user
    fn is_auth_provider(&self, user: &User) -> bool;

    /// Complete `Authorization` header value for the user, if any
    fn token(&self, user: &User) -> Result<Option<String>, ConfigError>;
}
