//! Layered application configuration.
//!
//! Sources, later ones winning: built-in defaults, an optional YAML file,
//! `APP__`-prefixed environment variables (`__` separates nesting levels, so
//! `APP__REST__PAGINATION__MAX_PAGE_SIZE=50`), then CLI overrides applied by
//! the binary.

use std::net::SocketAddr;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::openapi::OpenApiInfo;
use crate::route::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
use crate::telemetry::LoggingConfig;

pub const ENV_PREFIX: &str = "APP__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to render configuration: {0}")]
    Render(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub rest: RestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_owned(),
        }
    }
}

impl ServerConfig {
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if `bind_addr` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server.bind_addr `{}`: {e}", self.bind_addr)))
    }
}

/// Settings shared by every entity route and the documentation endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    pub pagination: PaginationConfig,
    pub max_body_bytes: usize,
    pub docs: DocsConfig,
    pub openapi: OpenApiConfig,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            pagination: PaginationConfig::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            docs: DocsConfig::default(),
            openapi: OpenApiConfig::default(),
        }
    }
}

impl RestConfig {
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for a zero page size, a cap below the
    /// default page size, a zero body limit or unusable docs paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let PaginationConfig {
            default_page_size,
            max_page_size,
        } = self.pagination;
        if default_page_size == 0 {
            return Err(ConfigError::Invalid(
                "rest.pagination.default_page_size must be at least 1".to_owned(),
            ));
        }
        if max_page_size < default_page_size {
            return Err(ConfigError::Invalid(format!(
                "rest.pagination.max_page_size ({max_page_size}) is below default_page_size ({default_page_size})"
            )));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("rest.max_body_bytes must be at least 1".to_owned()));
        }
        self.docs.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub enabled: bool,
    pub openapi_path: String,
    pub docs_path: String,
}

impl DocsConfig {
    /// Paths must be literal, absolute and distinct. Disabled docs are not checked.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        for (key, path) in [("openapi_path", &self.openapi_path), ("docs_path", &self.docs_path)] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "rest.docs.{key} `{path}` must start with `/`"
                )));
            }
            if path.contains(['{', '}']) {
                return Err(ConfigError::Invalid(format!(
                    "rest.docs.{key} `{path}` must not contain path parameters"
                )));
            }
        }
        if self.openapi_path == self.docs_path {
            return Err(ConfigError::Invalid(format!(
                "rest.docs.openapi_path and rest.docs.docs_path are both `{}`",
                self.docs_path
            )));
        }
        Ok(())
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            openapi_path: "/openapi.json".to_owned(),
            docs_path: "/docs".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenApiConfig {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        let info = OpenApiInfo::default();
        Self {
            title: info.title,
            version: info.version,
            description: info.description,
        }
    }
}

impl From<&OpenApiConfig> for OpenApiInfo {
    fn from(cfg: &OpenApiConfig) -> Self {
        Self {
            title: cfg.title.clone(),
            version: cfg.version.clone(),
            description: cfg.description.clone(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `path` (if any), then the environment.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate the layered configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a source cannot be parsed or the merged
    /// configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path).extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;
        self.rest.validate()
    }

    /// Replace the port of `server.bind_addr`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the current address does not parse.
    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        let mut addr = self.server.socket_addr()?;
        addr.set_port(port);
        self.server.bind_addr = addr.to_string();
        Ok(())
    }

    /// # Errors
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
