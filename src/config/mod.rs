use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base address of the event backend, without a trailing path
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Directory holding the persisted session token slot
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// BCP 47 locale used for number formatting (e.g. "en-US", "de-DE")
    #[serde(default = "default_locale")]
    pub locale: String,
    /// ISO 4217 currency code prices are quoted in
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
    /// Tax rate already included in ticket prices, in percent (default: 20)
    #[serde(default = "default_tax_rate_percent")]
    pub tax_rate_percent: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            currency_code: default_currency_code(),
            tax_rate_percent: default_tax_rate_percent(),
        }
    }
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_currency_code() -> String {
    "USD".to_string()
}

fn default_tax_rate_percent() -> f64 {
    20.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Seconds after which a cached read is refetched. When unset, entries stay
    /// fresh until a mutation invalidates them.
    #[serde(default)]
    pub stale_after_secs: Option<u64>,
    /// Seconds an unobserved entry is retained before garbage collection (default: 300)
    #[serde(default = "default_gc_after_secs")]
    pub gc_after_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: None,
            gc_after_secs: default_gc_after_secs(),
        }
    }
}

impl CacheConfig {
    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after_secs.map(Duration::from_secs)
    }

    pub fn gc_after(&self) -> Duration {
        Duration::from_secs(self.gc_after_secs)
    }
}

fn default_gc_after_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            display: DisplayConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
