//! # Toolcrib Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     TOOLCRIB_DATA_DIR=/srv/toolcrib                                     │
//! │     TOOLCRIB_MAX_CONNECTIONS=8                                          │
//! │     TOOLCRIB_CAS_RETRIES=5                                              │
//! │     TOOLCRIB_ACTIVITY_LIMIT=50                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/toolcrib/toolcrib.toml (Linux)                            │
//! │     ~/Library/Application Support/org.toolcrib.toolcrib/... (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! data_dir = "./data"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//! busy_timeout_secs = 5
//! run_migrations = true
//!
//! [ledger]
//! cas_retries = 3
//! recent_activity_limit = 20
//! recent_consumptions_limit = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use toolcrib_db::DbConfig;

// =============================================================================
// Store Settings
// =============================================================================

/// Where the partition files live and how they are pooled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Directory holding workers.db, tools.db, consumables.db, lendings.db
    /// and trash.db.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum connections per partition pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Pool acquire timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long a writer waits for SQLite's lock (seconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            data_dir: default_data_dir(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            busy_timeout_secs: default_busy_timeout(),
            run_migrations: default_true(),
        }
    }
}

// =============================================================================
// Ledger Settings
// =============================================================================

/// Behavior of the ledger services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Attempts of a tool status compare-and-set before giving up with a
    /// storage conflict.
    #[serde(default = "default_cas_retries")]
    pub cas_retries: u32,

    /// Rows in the recent activity feed.
    #[serde(default = "default_activity_limit")]
    pub recent_activity_limit: i64,

    /// Rows in a worker's recent consumptions.
    #[serde(default = "default_consumptions_limit")]
    pub recent_consumptions_limit: i64,
}

fn default_cas_retries() -> u32 {
    3
}

fn default_activity_limit() -> i64 {
    20
}

fn default_consumptions_limit() -> i64 {
    5
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            cas_retries: default_cas_retries(),
            recent_activity_limit: default_activity_limit(),
            recent_consumptions_limit: default_consumptions_limit(),
        }
    }
}

// =============================================================================
// Toolcrib Config
// =============================================================================

/// Complete configuration, as read from `toolcrib.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolcribConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl ToolcribConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (toolcrib.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> LedgerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading toolcrib config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load toolcrib config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml(contents: &str) -> LedgerResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> LedgerResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| LedgerError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Toolcrib config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.store.data_dir.as_os_str().is_empty() {
            return Err(LedgerError::Config("store.data_dir must not be empty".into()));
        }

        if self.store.max_connections == 0 {
            return Err(LedgerError::Config(
                "store.max_connections must be greater than 0".into(),
            ));
        }

        if self.store.min_connections > self.store.max_connections {
            return Err(LedgerError::Config(format!(
                "store.min_connections ({}) exceeds store.max_connections ({})",
                self.store.min_connections, self.store.max_connections
            )));
        }

        if self.ledger.cas_retries == 0 {
            return Err(LedgerError::Config(
                "ledger.cas_retries must be greater than 0".into(),
            ));
        }

        if self.ledger.recent_activity_limit < 1 || self.ledger.recent_consumptions_limit < 1 {
            return Err(LedgerError::Config(
                "ledger report limits must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("TOOLCRIB_DATA_DIR") {
            debug!(data_dir = %dir, "Overriding data dir from environment");
            self.store.data_dir = PathBuf::from(dir);
        }

        if let Ok(max) = std::env::var("TOOLCRIB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.store.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid TOOLCRIB_MAX_CONNECTIONS"),
            }
        }

        if let Ok(retries) = std::env::var("TOOLCRIB_CAS_RETRIES") {
            match retries.parse::<u32>() {
                Ok(n) => self.ledger.cas_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring invalid TOOLCRIB_CAS_RETRIES"),
            }
        }

        if let Ok(limit) = std::env::var("TOOLCRIB_ACTIVITY_LIMIT") {
            match limit.parse::<i64>() {
                Ok(n) => self.ledger.recent_activity_limit = n,
                Err(_) => warn!(value = %limit, "Ignoring invalid TOOLCRIB_ACTIVITY_LIMIT"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "toolcrib", "toolcrib")
            .map(|dirs| dirs.config_dir().join("toolcrib.toml"))
    }

    /// Storage configuration for [`toolcrib_db::Database::new`].
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.store.data_dir)
            .max_connections(self.store.max_connections)
            .min_connections(self.store.min_connections)
            .connect_timeout(Duration::from_secs(self.store.connect_timeout_secs))
            .busy_timeout(Duration::from_secs(self.store.busy_timeout_secs))
            .run_migrations(self.store.run_migrations)
    }
}
