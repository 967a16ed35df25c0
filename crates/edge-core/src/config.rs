//! Cache decision configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Query parameter that marks a request as a cache-control action.
pub const DEFAULT_BYPASS_QUERY_KEY: &str = "LSCWP_CTRL";

/// `vary_value` that turns on mobile variant serving.
pub const MOBILE_VARY_VALUE: &str = "ismobile";

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Web server flavour in front of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    /// LiteSpeed Enterprise (supports ESI delegation).
    #[default]
    LiteSpeed,
    /// OpenLiteSpeed (no ESI).
    OpenLiteSpeed,
}

impl ServerKind {
    /// Whether the server can assemble ESI fragments.
    pub fn supports_esi(&self) -> bool {
        matches!(self, Self::LiteSpeed)
    }
}

/// Per-class time-to-live settings in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub front_page: u32,
    /// 0 disables caching of feeds.
    pub feed: u32,
    /// 0 disables caching of 404 pages.
    pub not_found: u32,
    pub forbidden: u32,
    pub server_error: u32,
    /// Default TTL for everything else.
    pub public: u32,
}

/// Admin-configured do-not-cache rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionConfig {
    /// URI rules. A trailing `$` anchors the rule to the full URI.
    pub uris: Vec<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    /// Pipe-delimited cookie names.
    pub cookies: String,
    /// Regular expression matched against the user agent.
    pub user_agents: String,
}

/// Mobile view settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobileConfig {
    /// Whether a separate mobile view is cached.
    pub enabled: bool,
    /// Vary value supplied by the server environment.
    pub vary_value: String,
}

impl MobileConfig {
    /// Whether this process serves the mobile variant.
    pub fn serves_mobile_variant(&self) -> bool {
        self.vary_value == MOBILE_VARY_VALUE
    }
}

/// ESI settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsiConfig {
    /// Logged-in pages are served shared-private through ESI.
    pub loggedin: bool,
    pub server: ServerKind,
}

fn default_bypass_query_key() -> String {
    DEFAULT_BYPASS_QUERY_KEY.to_string()
}

/// Complete configuration read by the decision engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub ttl: TtlConfig,
    #[serde(default)]
    pub exclusions: ExclusionConfig,
    #[serde(default)]
    pub mobile: MobileConfig,
    #[serde(default)]
    pub esi: EsiConfig,
    /// Global override forcing every response to no-cache.
    #[serde(default)]
    pub no_cache: bool,
    #[serde(default = "default_bypass_query_key")]
    pub bypass_query_key: String,
    /// Base path of the current site in a multisite network, e.g. `/blog2/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: TtlConfig::default(),
            exclusions: ExclusionConfig::default(),
            mobile: MobileConfig::default(),
            esi: EsiConfig::default(),
            no_cache: false,
            bypass_query_key: default_bypass_query_key(),
            site_path: None,
        }
    }
}

impl CacheConfig {
    /// Stock TTL profile shipped with new installs.
    pub fn recommended() -> Self {
        Self {
            ttl: TtlConfig {
                front_page: 1800,
                feed: 0,
                not_found: 3600,
                forbidden: 3600,
                server_error: 3600,
                public: 28800,
            },
            ..Default::default()
        }
    }

    /// Load config from a file. Files ending in `.json` are parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Structural checks. Pattern compilation happens when rules are built.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(ref path) = self.site_path {
            if !path.starts_with('/') || !path.ends_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "site_path must start and end with '/': {:?}",
                    path
                )));
            }
        }

        if self.bypass_query_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "bypass_query_key must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder: set the default TTL.
    pub fn with_public_ttl(mut self, ttl: u32) -> Self {
        self.ttl.public = ttl;
        self
    }

    /// Builder: set the multisite base path.
    pub fn with_site_path(mut self, path: impl Into<String>) -> Self {
        self.site_path = Some(path.into());
        self
    }
}
