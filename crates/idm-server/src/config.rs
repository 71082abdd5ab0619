use std::net::SocketAddr;

use idm_auth::AuthConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL for the server, used as the token issuer when
    /// `auth.issuer` is left at its default.
    /// If not set, defaults to http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Errors raised while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("config build error: {0}")]
    Build(#[source] config::ConfigError),

    #[error("config deserialize error: {0}")]
    Deserialize(#[source] config::ConfigError),

    #[error("{0}")]
    Invalid(String),

    #[error("auth: {0}")]
    Auth(#[from] idm_auth::ConfigError),
}

impl AppConfig {
    pub fn addr(&self) -> SocketAddr {
        let ip: std::net::IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::from((ip, self.server.port))
    }

    pub fn base_url(&self) -> String {
        match &self.server.base_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("http://{}:{}", self.server.host, self.server.port),
        }
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if self.server.port == 0 {
            return Err(LoadError::Invalid("server.port must be > 0".into()));
        }
        if self.server.body_limit_bytes == 0 {
            return Err(LoadError::Invalid("server.body_limit_bytes must be > 0".into()));
        }
        let level = self.logging.level.to_ascii_lowercase();
        let valid = ["error", "warn", "info", "debug", "trace"];
        if !valid.contains(&level.as_str()) {
            return Err(LoadError::Invalid(format!(
                "logging.level must be one of {valid:?}"
            )));
        }
        self.auth.validate()?;
        Ok(())
    }
}

pub mod loader {
    use super::{AppConfig, LoadError};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, read when no path is given.
    pub const DEFAULT_CONFIG_FILE: &str = "idm.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, LoadError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., IDM__AUTH__SIGNING__SECRET=...
        builder = builder.add_source(
            Environment::with_prefix("IDM")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder.build().map_err(LoadError::Build)?;
        let mut merged: AppConfig = cfg.try_deserialize().map_err(LoadError::Deserialize)?;

        // An issuer left at its default follows the server base URL.
        if merged.auth.issuer == idm_auth::AuthConfig::default().issuer {
            merged.auth.issuer = merged.base_url();
        }

        merged.validate()?;
        Ok(merged)
    }
}
