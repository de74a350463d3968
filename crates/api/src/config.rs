//! # Liveness Server Configuration
//!
//! The liveness server is optional. It only starts when a port is configured.
//!
//! ## Environment Variables
//!
//! - `HEALTH_HOST`: The host address to bind to (default: "0.0.0.0")
//! - `HEALTH_PORT`: The port to listen on (unset or empty disables the server)

use eyre::{Result, WrapErr};
use std::env;

/// Configuration for the liveness server
///
/// # Example
///
/// ```
/// use rallybot_api::config::HealthConfig;
///
/// let config = HealthConfig::from_lookup(|key| match key {
///     "HEALTH_PORT" => Some("8080".to_string()),
///     _ => None,
/// })
/// .unwrap();
/// assert_eq!(config.server_addr().as_deref(), Some("0.0.0.0:8080"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthConfig {
    /// Host address for the server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port to listen on, `None` when the server is disabled
    pub port: Option<u16>,
}

impl HealthConfig {
    /// Creates a new HealthConfig from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `HEALTH_PORT` is set but is not a valid port number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new HealthConfig through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HEALTH_HOST")
            .filter(|host| !host.trim().is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("HEALTH_PORT")
            .filter(|port| !port.trim().is_empty())
            .map(|port| port.trim().parse::<u16>())
            .transpose()
            .wrap_err("Invalid HEALTH_PORT value")?;

        Ok(Self { host, port })
    }

    /// Returns the server address, or `None` when the server is disabled
    pub fn server_addr(&self) -> Option<String> {
        self.port.map(|port| format!("{}:{}", self.host, port))
    }
}
