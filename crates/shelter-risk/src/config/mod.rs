use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub scoring: ScoringSettings,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let risk_config_path = env::var("RISK_CONFIG_PATH")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        let batch_concurrency = env::var("RISK_BATCH_CONCURRENCY")
            .unwrap_or_else(|_| DEFAULT_BATCH_CONCURRENCY.to_string())
            .parse::<usize>()
            .ok()
            .filter(|value| (1..=MAX_BATCH_CONCURRENCY).contains(value))
            .ok_or(ConfigError::InvalidConcurrency)?;

        let item_timeout_ms = env::var("RISK_ITEM_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_ITEM_TIMEOUT_MS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            scoring: ScoringSettings {
                risk_config_path,
                batch_concurrency,
                item_timeout: Duration::from_millis(item_timeout_ms),
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

const DEFAULT_BATCH_CONCURRENCY: usize = 16;
/// Upper bound for concurrent batch items, shared with command-line overrides.
pub const MAX_BATCH_CONCURRENCY: usize = 64;
const DEFAULT_ITEM_TIMEOUT_MS: u64 = 5_000;

/// Settings controlling where the scoring config comes from and how batches run.
#[derive(Debug, Clone)]
pub struct ScoringSettings {
    /// JSON scoring config on disk; the built-in standard config is used when absent.
    pub risk_config_path: Option<PathBuf>,
    pub batch_concurrency: usize,
    pub item_timeout: Duration,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidConcurrency,
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidConcurrency => write!(
                f,
                "RISK_BATCH_CONCURRENCY must be an integer between 1 and {}",
                MAX_BATCH_CONCURRENCY
            ),
            ConfigError::InvalidTimeout => {
                write!(f, "RISK_ITEM_TIMEOUT_MS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("RISK_CONFIG_PATH");
        env::remove_var("RISK_BATCH_CONCURRENCY");
        env::remove_var("RISK_ITEM_TIMEOUT_MS");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.scoring.risk_config_path, None);
        assert_eq!(config.scoring.batch_concurrency, 16);
        assert_eq!(config.scoring.item_timeout, Duration::from_secs(5));
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn reads_scoring_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "ci");
        env::set_var("RISK_CONFIG_PATH", "/etc/shelter/risk.json");
        env::set_var("RISK_BATCH_CONCURRENCY", "8");
        env::set_var("RISK_ITEM_TIMEOUT_MS", "250");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(
            config.scoring.risk_config_path,
            Some(PathBuf::from("/etc/shelter/risk.json"))
        );
        assert_eq!(config.scoring.batch_concurrency, 8);
        assert_eq!(config.scoring.item_timeout, Duration::from_millis(250));
        reset_env();
    }

    #[test]
    fn rejects_out_of_range_concurrency() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RISK_BATCH_CONCURRENCY", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidConcurrency)
        ));
        env::set_var("RISK_BATCH_CONCURRENCY", "128");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidConcurrency)
        ));
        reset_env();
    }

    #[test]
    fn rejects_zero_item_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RISK_ITEM_TIMEOUT_MS", "0");
        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidTimeout)));
        reset_env();
    }
}
