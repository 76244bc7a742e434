//! Connection settings and the configuration file they are loaded from.
//!
//! [`ConnectionConfig`] is the immutable value a [`SessionManager`] is built
//! from. [`ClientConfig`] is its TOML form, loaded from
//! `~/.config/userrpc/config.toml` by default and overridable from the
//! environment.
//!
//! [`SessionManager`]: crate::session::SessionManager

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use protocol::ClientError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port used when none is given.
pub const DEFAULT_PORT: u16 = 80;

/// Service endpoint path used when none is given.
pub const DEFAULT_SERVER_PATH: &str = "services/xmlrpc";

/// Where and as whom to call the remote service.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    server_path: String,
    host: String,
    port: u16,
    secret: Option<String>,
    app_id: Option<String>,
}

impl ConnectionConfig {
    /// Creates a configuration for `host` and `server_path` on the default port.
    ///
    /// Fails with a configuration error when either is empty.
    pub fn new(
        host: impl Into<String>,
        server_path: impl Into<String>,
    ) -> protocol::Result<Self> {
        let host = host.into();
        let server_path = server_path.into();

        if host.trim().is_empty() {
            return Err(ClientError::Configuration(
                "host must not be empty".to_string(),
            ));
        }
        if server_path.trim_matches('/').trim().is_empty() {
            return Err(ClientError::Configuration(
                "server path must not be empty".to_string(),
            ));
        }

        Ok(Self {
            server_path,
            host,
            port: DEFAULT_PORT,
            secret: None,
            app_id: None,
        })
    }

    /// Sets the port. Port 0 is rejected with a configuration error.
    pub fn with_port(mut self, port: u16) -> protocol::Result<Self> {
        if port == 0 {
            return Err(ClientError::Configuration(
                "port must be greater than 0".to_string(),
            ));
        }
        self.port = port;
        Ok(self)
    }

    /// Sets the shared secret and the application identifier it is scoped to.
    pub fn with_credentials(mut self, secret: impl Into<String>, app_id: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self.app_id = Some(app_id.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn server_path(&self) -> &str {
        &self.server_path
    }

    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    pub(crate) fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// True when both signing credentials are present and non-empty.
    pub fn can_sign(&self) -> bool {
        matches!((self.secret(), self.app_id()), (Some(s), Some(a)) if !s.is_empty() && !a.is_empty())
    }

    /// The service URL, e.g. `http://example.com:80/services/xmlrpc`.
    pub fn endpoint(&self) -> String {
        format!(
            "http://{}:{}/{}",
            self.host,
            self.port,
            self.server_path.trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server_path", &self.server_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("app_id", &self.app_id)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("server.host must not be empty")]
    EmptyHost,

    #[error("server.path must not be empty")]
    EmptyServerPath,

    #[error("server.port must be greater than 0")]
    InvalidPort,

    #[error("auth.secret and auth.app_id must be set together")]
    IncompleteCredentials,
}

/// File form of the client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote service location.
    pub server: ServerConfig,

    /// Signing credentials.
    pub auth: AuthConfig,
}

/// Remote service location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Signing credentials. Both or neither must be set.
#[derive(Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub app_id: Option<String>,
    pub secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("app_id", &self.app_id)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_SERVER_PATH.to_string(),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("userrpc")
        .join("config.toml")
}

impl ClientConfig {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported variables:
    /// - USERRPC_HOST
    /// - USERRPC_PORT (ignored unless it parses as a port number)
    /// - USERRPC_APP_ID
    /// - USERRPC_SECRET
    pub fn apply_env_overrides(&mut self) {
        if let Some(host) = non_empty_env("USERRPC_HOST") {
            tracing::info!("Overriding server.host from environment: {}", host);
            self.server.host = host;
        }

        if let Some(port) = non_empty_env("USERRPC_PORT") {
            match port.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Overriding server.port from environment: {}", port);
                    self.server.port = port;
                }
                Err(_) => tracing::warn!("Ignoring invalid USERRPC_PORT value: {}", port),
            }
        }

        if let Some(app_id) = non_empty_env("USERRPC_APP_ID") {
            tracing::info!("Overriding auth.app_id from environment: {}", app_id);
            self.auth.app_id = Some(app_id);
        }

        if let Some(secret) = non_empty_env("USERRPC_SECRET") {
            tracing::info!("Overriding auth.secret from environment");
            self.auth.secret = Some(secret);
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        if self.server.path.trim_matches('/').trim().is_empty() {
            return Err(ConfigError::EmptyServerPath);
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let has_secret = self.auth.secret.as_deref().is_some_and(|s| !s.is_empty());
        let has_app_id = self.auth.app_id.as_deref().is_some_and(|s| !s.is_empty());
        if has_secret != has_app_id {
            return Err(ConfigError::IncompleteCredentials);
        }

        Ok(())
    }

    /// Validates the file configuration and turns it into a [`ConnectionConfig`].
    pub fn to_connection_config(&self) -> protocol::Result<ConnectionConfig> {
        self.validate()
            .map_err(|err| ClientError::Configuration(err.to_string()))?;

        let config = ConnectionConfig::new(self.server.host.clone(), self.server.path.clone())?
            .with_port(self.server.port)?;

        Ok(match (&self.auth.secret, &self.auth.app_id) {
            (Some(secret), Some(app_id)) if !secret.is_empty() => {
                config.with_credentials(secret.clone(), app_id.clone())
            }
            _ => config,
        })
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
