//! Connection configuration.
//!
//! This module provides the configuration for a search-engine connection,
//! supporting programmatic configuration, serde deserialization and
//! environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ELASTICSEARCH_HOSTS` | http://localhost:9200 | Comma-separated node URLs |
//! | `ELASTICSEARCH_INDEX` | (none) | Default index for un-modelled queries |
//! | `ELASTICSEARCH_CACHE_PREFIX` | elasticsearch | Prefix for generated cache keys |
//! | `ELASTICSEARCH_PAGE_SIZE` | 10 | Default `take` for new queries |
//! | `ELASTICSEARCH_TIMEOUT` | 30s | Request timeout (humantime syntax) |
//! | `ELASTICSEARCH_USERNAME` | (none) | Basic auth username |
//! | `ELASTICSEARCH_PASSWORD` | (none) | Basic auth password |
//! | `ELASTICSEARCH_API_TOKEN` | (none) | Bearer token |
//! | `ELASTICSEARCH_INSECURE` | false | Disable certificate validation |
//!
//! # Example
//!
//! ```rust
//! use helios_odm::ConnectionConfig;
//!
//! let config = ConnectionConfig {
//!     hosts: vec!["http://search:9200".to_string()],
//!     cache_prefix: "blog".to_string(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Authentication configuration for the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElasticsearchAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Configuration for a search-engine connection.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "helios-odm")]
#[command(about = "Elasticsearch connection settings")]
pub struct ConnectionConfig {
    /// Node URLs. Only the first node is used (single-node connection pool).
    #[arg(
        long,
        env = "ELASTICSEARCH_HOSTS",
        value_delimiter = ',',
        default_value = "http://localhost:9200"
    )]
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    /// Default index for queries that are not bound to a model.
    #[arg(long, env = "ELASTICSEARCH_INDEX")]
    #[serde(default)]
    pub default_index: Option<String>,

    /// Prefix for generated cache keys.
    #[arg(long, env = "ELASTICSEARCH_CACHE_PREFIX", default_value = "elasticsearch")]
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Number of hits a new query takes unless told otherwise.
    #[arg(long, env = "ELASTICSEARCH_PAGE_SIZE", default_value = "10")]
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Request timeout, e.g. `30s` or `2m`.
    #[arg(long, env = "ELASTICSEARCH_TIMEOUT", default_value = "30s")]
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,

    /// Username for basic auth.
    #[arg(long, env = "ELASTICSEARCH_USERNAME")]
    #[serde(default)]
    pub username: Option<String>,

    /// Password for basic auth.
    #[arg(long, env = "ELASTICSEARCH_PASSWORD")]
    #[serde(default)]
    pub password: Option<String>,

    /// Bearer token. Takes precedence over basic auth.
    #[arg(long, env = "ELASTICSEARCH_API_TOKEN")]
    #[serde(default)]
    pub api_token: Option<String>,

    /// Whether to disable certificate validation.
    /// Only use for development/testing.
    #[arg(long, env = "ELASTICSEARCH_INSECURE", default_value = "false")]
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

fn default_hosts() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_cache_prefix() -> String {
    "elasticsearch".to_string()
}

fn default_page_size() -> u64 {
    10
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            default_index: None,
            cache_prefix: default_cache_prefix(),
            default_page_size: default_page_size(),
            request_timeout: default_request_timeout(),
            username: None,
            password: None,
            api_token: None,
            disable_certificate_validation: false,
        }
    }
}

impl ConnectionConfig {
    /// Creates a configuration from `ELASTICSEARCH_*` environment variables,
    /// falling back to defaults.
    pub fn from_env() -> Self {
        Self::try_parse_from(["helios-odm"]).unwrap_or_default()
    }

    /// Returns the first configured node URL.
    pub fn primary_host(&self) -> &str {
        self.hosts
            .first()
            .map(String::as_str)
            .unwrap_or("http://localhost:9200")
    }

    /// Returns the request timeout as a duration.
    pub fn timeout(&self) -> Result<Duration, String> {
        humantime::parse_duration(&self.request_timeout)
            .map_err(|e| format!("Invalid request timeout '{}': {}", self.request_timeout, e))
    }

    /// Resolves the credential fields into an authentication mode.
    pub fn auth(&self) -> Option<ElasticsearchAuth> {
        if let Some(ref token) = self.api_token {
            return Some(ElasticsearchAuth::Bearer {
                token: token.clone(),
            });
        }

        match (&self.username, &self.password) {
            (Some(username), password) => Some(ElasticsearchAuth::Basic {
                username: username.clone(),
                password: password.clone().unwrap_or_default(),
            }),
            _ => None,
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.hosts.is_empty() {
            errors.push("At least one host is required".to_string());
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if let Err(e) = self.timeout() {
            errors.push(e);
        }

        if self.password.is_some() && self.username.is_none() {
            errors.push("Password given without a username".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
