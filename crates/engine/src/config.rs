//! Service configuration via `stockade.toml`
//!
//! A single file picks the issuance strategy and its bounds. On first open
//! a commented default file is written; edit it and restart to change the
//! strategy.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stockade_concurrency::{LeasePolicy, RetryPolicy, SpinPolicy};
use stockade_core::{IssuanceError, StrategyKind};
use thiserror::Error;

/// Config file name placed in the service directory.
pub const CONFIG_FILE_NAME: &str = "stockade.toml";

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading or saving a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file could not be written
    #[error("Failed to write config file '{}': {source}", .path.display())]
    Write {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("Failed to parse config file '{}': {message}", .path.display())]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The config could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    /// A value is out of range or unknown
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for IssuanceError {
    fn from(e: ConfigError) -> Self {
        IssuanceError::Config(e.to_string())
    }
}

// ============================================================================
// Sections
// ============================================================================

/// `[store]` section
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSection {
    /// Bound on waiting for a row's exclusive lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    10_000
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StoreSection {
    /// Row lock timeout as a `Duration`
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// `[optimistic]` section
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptimisticSection {
    /// Attempts before giving up
    #[serde(default = "default_optimistic_attempts")]
    pub max_attempts: u32,
    /// Pause after each conflict
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_optimistic_attempts() -> u32 {
    20
}

fn default_backoff_ms() -> u64 {
    50
}

impl Default for OptimisticSection {
    fn default() -> Self {
        Self {
            max_attempts: default_optimistic_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl OptimisticSection {
    /// Build the retry policy
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.max_attempts)
            .with_backoff(Duration::from_millis(self.backoff_ms))
    }
}

/// `[spin_lock]` section
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpinLockSection {
    /// Probes before giving up
    #[serde(default = "default_spin_attempts")]
    pub max_attempts: u32,
    /// Pause between probes
    #[serde(default = "default_backoff_ms")]
    pub retry_delay_ms: u64,
    /// Lease requested per grant
    #[serde(default = "default_lease_ms")]
    pub lease_ms: u64,
}

fn default_spin_attempts() -> u32 {
    100
}

fn default_lease_ms() -> u64 {
    3_000
}

impl Default for SpinLockSection {
    fn default() -> Self {
        Self {
            max_attempts: default_spin_attempts(),
            retry_delay_ms: default_backoff_ms(),
            lease_ms: default_lease_ms(),
        }
    }
}

impl SpinLockSection {
    /// Build the spin policy
    pub fn policy(&self) -> SpinPolicy {
        SpinPolicy::new()
            .with_max_attempts(self.max_attempts)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
            .with_lease(Duration::from_millis(self.lease_ms))
    }
}

/// `[lease_lock]` section
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaseLockSection {
    /// Longest wait for the lock
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
    /// Lease requested per grant
    #[serde(default = "default_lease_ms")]
    pub lease_ms: u64,
}

fn default_wait_timeout_ms() -> u64 {
    5_000
}

impl Default for LeaseLockSection {
    fn default() -> Self {
        Self {
            wait_timeout_ms: default_wait_timeout_ms(),
            lease_ms: default_lease_ms(),
        }
    }
}

impl LeaseLockSection {
    /// Build the lease policy
    pub fn policy(&self) -> LeasePolicy {
        LeasePolicy::new()
            .with_wait_timeout(Duration::from_millis(self.wait_timeout_ms))
            .with_lease(Duration::from_millis(self.lease_ms))
    }
}

// ============================================================================
// StockadeConfig
// ============================================================================

/// Service configuration loaded from `stockade.toml`.
///
/// # Example
///
/// ```toml
/// strategy = "lease-lock"
///
/// [lease_lock]
/// wait_timeout_ms = 2000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockadeConfig {
    /// One of `mutex`, `optimistic`, `pessimistic`, `spin-lock`, `lease-lock`.
    #[serde(default = "default_strategy_str")]
    pub strategy: String,
    /// Store settings.
    #[serde(default)]
    pub store: StoreSection,
    /// Optimistic retry bounds.
    #[serde(default)]
    pub optimistic: OptimisticSection,
    /// Spin lock bounds.
    #[serde(default)]
    pub spin_lock: SpinLockSection,
    /// Lease lock bounds.
    #[serde(default)]
    pub lease_lock: LeaseLockSection,
}

fn default_strategy_str() -> String {
    StrategyKind::Pessimistic.as_str().to_string()
}

impl Default for StockadeConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy_str(),
            store: StoreSection::default(),
            optimistic: OptimisticSection::default(),
            spin_lock: SpinLockSection::default(),
            lease_lock: LeaseLockSection::default(),
        }
    }
}

impl StockadeConfig {
    /// Config selecting `kind` with default bounds
    pub fn for_strategy(kind: StrategyKind) -> Self {
        Self {
            strategy: kind.as_str().to_string(),
            ..Self::default()
        }
    }

    /// Parse the strategy string.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` if the name is not a known strategy.
    pub fn strategy_kind(&self) -> Result<StrategyKind, ConfigError> {
        self.strategy.parse().map_err(ConfigError::Invalid)
    }

    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy_kind()?;
        if self.optimistic.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "optimistic.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.spin_lock.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "spin_lock.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.spin_lock.lease_ms == 0 || self.lease_lock.lease_ms == 0 {
            return Err(ConfigError::Invalid(
                "lease_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Stockade issuance configuration
#
# Strategy: "mutex", "optimistic", "pessimistic" (default), "spin-lock" or "lease-lock"
#   "mutex"       = one in-process lock per item; single process only
#   "optimistic"  = versioned write, retry on conflict
#   "pessimistic" = exclusive row lock for the transaction
#   "spin-lock"   = distributed lock, polled
#   "lease-lock"  = distributed lock, queued wait with a lease
strategy = "pessimistic"

[store]
# Longest wait for a row's exclusive lock before failing the request
lock_timeout_ms = 10000

[optimistic]
max_attempts = 20
backoff_ms = 50

[spin_lock]
max_attempts = 100
retry_delay_ms = 50
lease_ms = 3000

[lease_lock]
wait_timeout_ms = 5000
lease_ms = 3000
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: StockadeConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        // Validate eagerly so a bad file fails at startup
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Load `stockade.toml` from `dir`, creating the default first if missing.
    pub fn load_or_create(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        Self::write_default_if_missing(&path)?;
        Self::from_file(&path)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_pessimistic() {
        let config = StockadeConfig::default();
        assert_eq!(config.strategy_kind().unwrap(), StrategyKind::Pessimistic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_each_strategy() {
        for kind in StrategyKind::ALL {
            let src = format!("strategy = \"{}\"", kind);
            let config: StockadeConfig = toml::from_str(&src).unwrap();
            assert_eq!(config.strategy_kind().unwrap(), kind);
        }
    }

    #[test]
    fn parse_invalid_strategy_returns_error() {
        let config: StockadeConfig = toml::from_str("strategy = \"turbo\"").unwrap();
        assert!(matches!(
            config.strategy_kind(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn default_toml_matches_default() {
        let config: StockadeConfig = toml::from_str(StockadeConfig::default_toml()).unwrap();
        assert_eq!(config, StockadeConfig::default());
    }

    #[test]
    fn policies_carry_section_values() {
        let config: StockadeConfig = toml::from_str(
            r#"
strategy = "spin-lock"

[spin_lock]
max_attempts = 7
retry_delay_ms = 2

[lease_lock]
wait_timeout_ms = 250
"#,
        )
        .unwrap();

        let spin = config.spin_lock.policy();
        assert_eq!(spin.max_attempts, 7);
        assert_eq!(spin.retry_delay, Duration::from_millis(2));
        assert_eq!(spin.lease, Duration::from_millis(3_000));

        let lease = config.lease_lock.policy();
        assert_eq!(lease.wait_timeout, Duration::from_millis(250));

        let retry = config.optimistic.policy();
        assert_eq!(retry.max_attempts, 20);
        assert_eq!(retry.backoff, Duration::from_millis(50));
    }

    #[test]
    fn zero_attempts_rejected() {
        let config: StockadeConfig =
            toml::from_str("[optimistic]\nmax_attempts = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        StockadeConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());

        let config = StockadeConfig::from_file(&path).unwrap();
        assert_eq!(config.strategy, "pessimistic");
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(&path, "strategy = \"optimistic\"\n").unwrap();
        StockadeConfig::write_default_if_missing(&path).unwrap();

        let config = StockadeConfig::from_file(&path).unwrap();
        assert_eq!(config.strategy, "optimistic");
    }

    #[test]
    fn from_file_with_missing_fields_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "").unwrap();

        let config = StockadeConfig::from_file(&path).unwrap();
        assert_eq!(config, StockadeConfig::default());
    }

    #[test]
    fn from_file_rejects_bad_strategy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "strategy = \"turbo\"\n").unwrap();

        let err = StockadeConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("turbo"));
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = StockadeConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = StockadeConfig::for_strategy(StrategyKind::LeaseLock);
        config.lease_lock.wait_timeout_ms = 1_500;
        config.write_to_file(&path).unwrap();

        let loaded = StockadeConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_or_create_writes_default() {
        let dir = TempDir::new().unwrap();
        let config = StockadeConfig::load_or_create(dir.path()).unwrap();
        assert_eq!(config, StockadeConfig::default());
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn config_error_converts_to_issuance_error() {
        let err: IssuanceError = ConfigError::Invalid("bad".to_string()).into();
        assert!(matches!(err, IssuanceError::Config(_)));
    }
}
