//! Configuration structures for the rolodex runtime.
//!
//! TOML-based configuration with a precedence system:
//! - Bundled defaults (include_str! from rolodex.toml)
//! - User overrides (~/.config/rolodex/rolodex.toml, then ./rolodex.toml)
//! - Automatic merging with later sources taking precedence

use crate::RetryPolicy;
use config::{Config, File, FileFormat};
use rolodex_error::{ConfigError, RolodexError, RolodexResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Admission and concurrency limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Sliding-window request limit per minute
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Rolling daily credit quota
    #[serde(default = "default_daily_credit_limit")]
    pub daily_credit_limit: u32,

    /// Bound on concurrent reveal calls within a batch chunk
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Bound on concurrent search calls, independent of reveal concurrency
    #[serde(default = "default_search_concurrency")]
    pub search_concurrency: u32,
}

fn default_requests_per_minute() -> u32 {
    60
}
fn default_daily_credit_limit() -> u32 {
    5000
}
fn default_max_concurrency() -> u32 {
    5
}
fn default_search_concurrency() -> u32 {
    3
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            daily_credit_limit: default_daily_credit_limit(),
            max_concurrency: default_max_concurrency(),
            search_concurrency: default_search_concurrency(),
        }
    }
}

/// Batch queue limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Items the queue will hand out per day
    #[serde(default = "default_queue_daily_limit")]
    pub daily_limit: u32,

    /// Per-item retry ceiling before an item is marked failed
    #[serde(default = "default_queue_max_retries")]
    pub max_retries: u32,
}

fn default_queue_daily_limit() -> u32 {
    5000
}
fn default_queue_max_retries() -> u32 {
    3
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_queue_daily_limit(),
            max_retries: default_queue_max_retries(),
        }
    }
}

/// Orchestrator-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the enrichment service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request transport timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// TTL of the cached credit check in seconds
    #[serde(default = "default_credit_cache_ttl_secs")]
    pub credit_cache_ttl_secs: u64,

    /// Hard per-call ceiling on batch size imposed by the API
    #[serde(default = "default_batch_ceiling")]
    pub batch_ceiling: usize,

    /// Pause between queue-drain batches in milliseconds
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
}

fn default_base_url() -> String {
    "https://api.example.com/v1".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_credit_cache_ttl_secs() -> u64 {
    300
}
fn default_batch_ceiling() -> usize {
    100
}
fn default_inter_batch_delay_ms() -> u64 {
    1000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            credit_cache_ttl_secs: default_credit_cache_ttl_secs(),
            batch_ceiling: default_batch_ceiling(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
        }
    }
}

/// Top-level rolodex configuration.
///
/// # Example
///
/// ```no_run
/// use rolodex_rate_limit::RolodexConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RolodexConfig::load()?;
/// println!("RPM limit: {}", config.limits.requests_per_minute);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RolodexConfig {
    /// Admission and concurrency limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Retry and circuit breaker parameters
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Batch queue limits
    #[serde(default)]
    pub queue: QueueConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub client: ClientConfig,
}

impl RolodexConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> RolodexResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                RolodexError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                RolodexError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override
    /// earlier):
    /// 1. Bundled defaults (rolodex.toml shipped with the library)
    /// 2. User config in home directory (~/.config/rolodex/rolodex.toml)
    /// 3. User config in current directory (./rolodex.toml)
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> RolodexResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../../../rolodex.toml");

        let mut builder = Config::builder()
            // Start with bundled defaults
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        // Add user config from home directory (optional)
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/rolodex/rolodex.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        // Add user config from current directory (optional, highest precedence)
        builder = builder.add_source(File::with_name("rolodex").required(false));

        builder
            .build()
            .map_err(|e| {
                RolodexError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                RolodexError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }
}
