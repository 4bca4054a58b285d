use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::query::QueryDefaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub query: QueryConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root URL of the Clover service, without a trailing slash
    pub base_url: String,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Items requested per feed page
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// How long a cached response counts as fresh
    pub stale_time_ms: u64,

    /// How long an unused cache entry is kept
    pub gc_time_ms: u64,

    /// Retries for read queries that don't set their own
    pub retry: u32,

    /// Upper bound for the exponential retry delay
    pub max_retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Delay before a changed search keyword is acted on
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "clover_client=debug"
    pub filter: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            page_size: 10,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: 0,
            gc_time_ms: 5 * 60 * 1000,
            retry: 3,
            max_retry_delay_ms: 30_000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl QueryConfig {
    pub fn defaults(&self) -> QueryDefaults {
        QueryDefaults {
            stale_time: Duration::from_millis(self.stale_time_ms),
            gc_time: Duration::from_millis(self.gc_time_ms),
            retry: self.retry,
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
        }
    }
}

impl SearchConfig {
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            // Create default config if it doesn't exist
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config.with_env_overrides());
        }

        Ok(Self::load_from(&config_path)?.with_env_overrides())
    }

    /// Load config from an explicit file, without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// `CLOVER_API_URL` and `CLOVER_LOG` win over the file
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("CLOVER_API_URL") {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(filter) = std::env::var("CLOVER_LOG") {
            if !filter.trim().is_empty() {
                self.logging.filter = filter;
            }
        }
        self
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("clover-client").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# Clover client configuration
# Location: ~/.config/clover-client/config.toml (Linux)
#           ~/Library/Application Support/clover-client/config.toml (macOS)
#           %APPDATA%\clover-client\config.toml (Windows)

[api]
# Root URL of the Clover service (CLOVER_API_URL overrides this)
base_url = "http://localhost:8080"

# Per-request timeout in seconds
timeout_secs = 30

# Posts requested per feed page
page_size = 10

[query]
# How long a cached response is served without refetching (0 = always refetch)
stale_time_ms = 0

# How long an unused cache entry is kept in memory
gc_time_ms = 300000

# Retries for read queries that don't choose their own
retry = 3

# Cap for the exponential backoff between retries
max_retry_delay_ms = 30000

[search]
# Wait this long after the last keystroke before searching
debounce_ms = 500

[logging]
# tracing EnvFilter directive (CLOVER_LOG overrides this)
filter = "info"
"#
        .to_string()
    }
}
