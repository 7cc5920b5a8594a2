//! Service settings loaded from `SRAUTO_*` environment variables

use axum::http::HeaderValue;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::net::SocketAddr;

/// Prefix shared by every service setting
pub const ENV_PREFIX: &str = "SRAUTO";

/// HTTP service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// `host:port` the listener binds to
    pub bind_address: String,
    /// The single browser origin allowed to make credentialed requests
    pub allowed_origin: String,
    /// Restrict the session cookie to secure transport
    pub cookie_secure: bool,
    /// Lifetime of a freshly issued session cookie
    pub cookie_max_age_days: i64,
    /// Upper bound on a request body, multipart uploads included
    pub max_upload_bytes: usize,
    /// Reject submissions whose token has no session record
    pub require_known_session: bool,
    /// Apply the embedded schema on startup
    pub run_migrations: bool,
}

impl ServerConfig {
    /// Load the configuration from the process environment
    ///
    /// # Environment Variables
    /// - `SRAUTO_BIND_ADDRESS` (default: `0.0.0.0:3001`)
    /// - `SRAUTO_ALLOWED_ORIGIN` (default: `http://localhost:5173`)
    /// - `SRAUTO_COOKIE_SECURE` (default: `true`)
    /// - `SRAUTO_COOKIE_MAX_AGE_DAYS` (default: `365`)
    /// - `SRAUTO_MAX_UPLOAD_BYTES` (default: 10 MiB)
    /// - `SRAUTO_REQUIRE_KNOWN_SESSION` (default: `false`)
    /// - `SRAUTO_RUN_MIGRATIONS` (default: `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_source(source: Environment) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .set_default("bind_address", "0.0.0.0:3001")?
            .set_default("allowed_origin", "http://localhost:5173")?
            .set_default("cookie_secure", true)?
            .set_default("cookie_max_age_days", 365_i64)?
            .set_default("max_upload_bytes", 10 * 1024 * 1024_i64)?
            .set_default("require_known_session", false)?
            .set_default("run_migrations", true)?
            .add_source(source.try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_listen_address(&self.bind_address) {
            return Err(ConfigError::Message(format!(
                "invalid bind_address {}: expected host:port",
                self.bind_address
            )));
        }

        self.allowed_origin_header()?;

        if self.cookie_max_age_days < 1 {
            return Err(ConfigError::Message(
                "cookie_max_age_days must be at least 1".to_string(),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Message(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// The allowed origin as a header value for the CORS layer
    pub fn allowed_origin_header(&self) -> Result<HeaderValue, ConfigError> {
        if self.allowed_origin == "*" {
            return Err(ConfigError::Message(
                "allowed_origin must name a single origin when credentials are allowed"
                    .to_string(),
            ));
        }

        HeaderValue::from_str(&self.allowed_origin).map_err(|e| {
            ConfigError::Message(format!(
                "invalid allowed_origin {}: {}",
                self.allowed_origin, e
            ))
        })
    }
}

/// Accepts a socket address or a `host:port` pair the listener can resolve
fn is_listen_address(address: &str) -> bool {
    if address.parse::<SocketAddr>().is_ok() {
        return true;
    }

    match address.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}
