use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fakebook::{
    Authenticator, DataStore, MemoryStore, Query, RedisStore, Row, SessionUser, StoreError,
    config::{CONFIG_DIR, CONFIG_FILE, FakebookConfig, StoreBackend},
};

use crate::output::OutputManager;

/// Configuration the command runs with, and where it came from.
pub struct AppContext {
    pub config: FakebookConfig,
    /// `None` when no config file was found and defaults are in use.
    pub config_path: Option<PathBuf>,
}

impl AppContext {
    /// Load `explicit` if given, otherwise the nearest `.fakebook/config.toml`
    /// from the current directory upwards, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let config = FakebookConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
            return Ok(Self {
                config,
                config_path: Some(path.to_path_buf()),
            });
        }

        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        match Self::find_config(&current_dir) {
            Some(path) => {
                let config =
                    FakebookConfig::load(&path).with_context(|| format!("Failed to load {}", path.display()))?;
                Ok(Self {
                    config,
                    config_path: Some(path),
                })
            }
            None => Ok(Self {
                config: FakebookConfig::default(),
                config_path: None,
            }),
        }
    }

    fn find_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    pub async fn connect(&self, output: &OutputManager) -> Result<AppStore> {
        match &self.config_path {
            Some(path) => output.verbose(&format!("using config {}", path.display())),
            None => output.verbose("no config file found, using defaults"),
        }

        let settings = &self.config.store;
        match settings.backend {
            StoreBackend::Memory => {
                output.verbose("memory store: data is discarded when the command exits");
                Ok(AppStore::Memory(MemoryStore::new()))
            }
            StoreBackend::Redis => {
                output.verbose(&format!("connecting to {} (prefix '{}')", settings.url, settings.prefix));
                let store = RedisStore::connect(&settings.url, &settings.prefix)
                    .await
                    .with_context(|| format!("Failed to connect to {}", settings.url))?;
                Ok(AppStore::Redis(store))
            }
        }
    }
}

/// The store selected by configuration.
pub enum AppStore {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl DataStore for AppStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        match self {
            AppStore::Memory(store) => store.select(query).await,
            AppStore::Redis(store) => store.select(query).await,
        }
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        match self {
            AppStore::Memory(store) => store.insert(table, row).await,
            AppStore::Redis(store) => store.insert(table, row).await,
        }
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, StoreError> {
        match self {
            AppStore::Memory(store) => store.update(query, patch).await,
            AppStore::Redis(store) => store.update(query, patch).await,
        }
    }

    async fn delete(&self, query: &Query) -> Result<u64, StoreError> {
        match self {
            AppStore::Memory(store) => store.delete(query).await,
            AppStore::Redis(store) => store.delete(query).await,
        }
    }
}

/// Credentials given with `--as` and `--password`.
#[derive(Clone, Debug, Default)]
pub struct Actor {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Actor {
    /// Sign in when `--as` was given. Returns the session user, if any.
    pub async fn sign_in<S: DataStore>(&self, auth: &Authenticator<'_, S>) -> Result<Option<SessionUser>> {
        let Some(email) = &self.email else {
            return Ok(None);
        };
        let password = self
            .password
            .as_deref()
            .context("--as needs a password: pass --password or set FAKEBOOK_PASSWORD")?;
        let user = auth
            .sign_in(email, password)
            .await
            .with_context(|| format!("Failed to sign in as {email}"))?;
        Ok(Some(user))
    }
}

/// The signed-in user, or an error telling the operator to pick one.
pub fn require_actor(user: Option<&SessionUser>) -> Result<&SessionUser> {
    user.context("This command acts as a user: pass --as <email> and --password")
}
