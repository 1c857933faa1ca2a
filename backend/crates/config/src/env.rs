use serde::Deserialize;
use std::env;
use std::time::Duration;
use strata_common::error::{StrataError, StrataResult};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub db_max_connections: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> StrataResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            log_level: get_var_or("LOG_LEVEL", "info"),
            db_max_connections: parse_var_or("DB_MAX_CONNECTIONS", 10)?,
        })
    }
}

/// Timer settings for the scheduled sync triggers.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub bootstrap_delay_secs: u64,
    pub full_sync_interval_secs: u64,
    pub board_sync_interval_secs: u64,
    pub worker_threads: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            bootstrap_delay_secs: 30,
            full_sync_interval_secs: 3600,
            board_sync_interval_secs: 900,
            worker_threads: 2,
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> StrataResult<Self> {
        let defaults = Self::default();
        let config = Self {
            bootstrap_delay_secs: parse_var_or(
                "SYNC_BOOTSTRAP_DELAY_SECS",
                defaults.bootstrap_delay_secs,
            )?,
            full_sync_interval_secs: parse_var_or(
                "SYNC_FULL_INTERVAL_SECS",
                defaults.full_sync_interval_secs,
            )?,
            board_sync_interval_secs: parse_var_or(
                "SYNC_BOARD_INTERVAL_SECS",
                defaults.board_sync_interval_secs,
            )?,
            worker_threads: parse_var_or("SCHEDULER_THREADS", defaults.worker_threads)?,
        };

        if config.full_sync_interval_secs == 0 || config.board_sync_interval_secs == 0 {
            return Err(StrataError::Config(
                "sync intervals must be greater than zero".to_string(),
            ));
        }
        if config.worker_threads == 0 {
            return Err(StrataError::Config(
                "SCHEDULER_THREADS must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn bootstrap_delay(&self) -> Duration {
        Duration::from_secs(self.bootstrap_delay_secs)
    }

    pub fn full_sync_interval(&self) -> Duration {
        Duration::from_secs(self.full_sync_interval_secs)
    }

    pub fn board_sync_interval(&self) -> Duration {
        Duration::from_secs(self.board_sync_interval_secs)
    }
}

fn get_var(key: &str) -> StrataResult<String> {
    env::var(key).map_err(|_| StrataError::Config(format!("{key} is required but not set")))
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_var_or<T>(key: &str, default: T) -> StrataResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| StrataError::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn config_from_env_succeeds_with_required_vars() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("DATABASE_URL", "postgres://localhost/strata_test");
        env::remove_var("DB_MAX_CONNECTIONS");

        let cfg = AppConfig::from_env().expect("should parse config");
        assert_eq!(cfg.database_url, "postgres://localhost/strata_test");
        assert_eq!(cfg.db_max_connections, 10);

        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn config_from_env_fails_without_database_url() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::remove_var("DATABASE_URL");
        let result = AppConfig::from_env();
        assert!(result.is_err());
    }

    #[test]
    fn config_rejects_non_numeric_pool_size() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("DATABASE_URL", "postgres://localhost/strata_test");
        env::set_var("DB_MAX_CONNECTIONS", "lots");
        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"), "got: {err}");

        env::remove_var("DATABASE_URL");
        env::remove_var("DB_MAX_CONNECTIONS");
    }

    #[test]
    fn scheduler_defaults_apply_when_unset() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::remove_var("SYNC_BOOTSTRAP_DELAY_SECS");
        env::remove_var("SYNC_FULL_INTERVAL_SECS");
        env::remove_var("SYNC_BOARD_INTERVAL_SECS");
        env::remove_var("SCHEDULER_THREADS");

        let cfg = SchedulerConfig::from_env().expect("defaults");
        assert_eq!(cfg.bootstrap_delay(), Duration::from_secs(30));
        assert_eq!(cfg.full_sync_interval(), Duration::from_secs(3600));
        assert_eq!(cfg.board_sync_interval(), Duration::from_secs(900));
        assert_eq!(cfg.worker_threads, 2);
    }

    #[test]
    fn scheduler_rejects_zero_interval() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("SYNC_FULL_INTERVAL_SECS", "0");
        let err = SchedulerConfig::from_env().unwrap_err();
        assert!(matches!(err, StrataError::Config(_)));
        env::remove_var("SYNC_FULL_INTERVAL_SECS");
    }

    #[test]
    fn scheduler_reads_overrides() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("SYNC_BOOTSTRAP_DELAY_SECS", "5");
        env::set_var("SYNC_BOARD_INTERVAL_SECS", " 120 ");
        let cfg = SchedulerConfig::from_env().expect("overrides");
        assert_eq!(cfg.bootstrap_delay_secs, 5);
        assert_eq!(cfg.board_sync_interval_secs, 120);
        env::remove_var("SYNC_BOOTSTRAP_DELAY_SECS");
        env::remove_var("SYNC_BOARD_INTERVAL_SECS");
    }
}
