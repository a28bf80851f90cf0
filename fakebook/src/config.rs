//! Configuration stored in `.fakebook/config.toml`.
//!
//! ```toml
//! [store]
//! backend = "redis"
//! url = "${REDIS_URL}"
//! prefix = "fakebook"
//!
//! [social]
//! feed_limit = 100
//! admin_emails = ["admin@example.com"]
//! ```
//!
//! `${VAR}` placeholders are replaced from the environment before parsing.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validators::normalize_email;

pub const CONFIG_DIR: &str = ".fakebook";
pub const CONFIG_FILE: &str = "config.toml";
pub const CONFIG_ENV: &str = "FAKEBOOK_CONFIG";

static ENV_PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FakebookConfig {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub social: SocialSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_redis_url(),
            prefix: default_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_prefix() -> String {
    "fakebook".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialSettings {
    /// Most posts a feed returns.
    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,
    /// Accounts allowed into the admin panel.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

impl Default for SocialSettings {
    fn default() -> Self {
        Self {
            feed_limit: default_feed_limit(),
            admin_emails: Vec::new(),
        }
    }
}

fn default_feed_limit() -> usize {
    100
}

impl SocialSettings {
    pub fn is_admin(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.admin_emails.iter().any(|admin| normalize_email(admin) == email)
    }
}

/// Replace every `${VAR}` in `raw` with the variable's value.
pub fn expand_env(raw: &str) -> Result<String, ConfigError> {
    let pattern = ENV_PLACEHOLDER.as_ref().map_err(|err| ConfigError::Pattern(err.clone()))?;
    let mut missing = None;
    let expanded = pattern.replace_all(raw, |caps: &Captures| match std::env::var(&caps[1]) {
        Ok(value) => value,
        Err(_) => {
            missing.get_or_insert_with(|| caps[1].to_string());
            String::new()
        }
    });
    match missing {
        Some(name) => Err(ConfigError::MissingEnv(name)),
        None => Ok(expanded.into_owned()),
    }
}

impl FakebookConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&expand_env(raw)?)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Default config file location under `root`.
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }
}
