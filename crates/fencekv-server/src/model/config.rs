//! Configuration management for the fencekv server
//!
//! Values are layered, lowest precedence first: built-in defaults, the YAML or
//! TOML file, `FENCEKV_`-prefixed environment variables, then command-line flags.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use config::{Config, Environment, File};

use fencekv_lock::{
    DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_LOCK_TTL, DEFAULT_RELEASE_TIMEOUT, LockManagerConfig,
};
use fencekv_storage::StorageType;

use crate::startup::LoggingConfig;

pub const DEFAULT_CONFIG_FILE: &str = "conf/application";
pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_REDIS_ADDR: &str = "localhost:6379";
pub const ENV_PREFIX: &str = "FENCEKV";

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(name = "fencekv-server", version, about)]
pub struct Cli {
    /// Configuration file (YAML or TOML); defaults to conf/application.*
    #[arg(short = 'c', long = "config", env = "FENCEKV_CONFIG")]
    pub config: Option<PathBuf>,
    /// HTTP port
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
    /// Storage backend: memory or redis
    #[arg(short = 's', long = "storage")]
    pub storage: Option<StorageType>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Parse the process command line and environment
    pub fn load() -> anyhow::Result<Self> {
        Self::from_sources(Cli::parse(), None)
    }

    /// Build from explicit sources. `env` replaces the process environment when given.
    pub fn from_sources(cli: Cli, env: Option<HashMap<String, String>>) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => File::from(path.as_path()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut builder = Config::builder().add_source(file).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(storage) = cli.storage {
            builder = builder.set_override("storage.type", storage.as_str())?;
        }

        let config = builder
            .build()
            .context("Failed to build configuration")?;

        Ok(Configuration { config })
    }

    // ========================================================================
    // Server Configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string("server.address")
            .unwrap_or(DEFAULT_SERVER_ADDRESS.to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int("server.port")
            .ok()
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    // ========================================================================
    // Storage Configuration
    // ========================================================================

    pub fn storage_type(&self) -> anyhow::Result<StorageType> {
        match self.config.get_string("storage.type") {
            Ok(value) => value.parse().map_err(anyhow::Error::msg),
            Err(_) => Ok(StorageType::default()),
        }
    }

    pub fn redis_addr(&self) -> String {
        self.config
            .get_string("redis.addr")
            .unwrap_or(DEFAULT_REDIS_ADDR.to_string())
    }

    pub fn redis_password(&self) -> String {
        self.config.get_string("redis.password").unwrap_or_default()
    }

    pub fn redis_db(&self) -> i64 {
        self.config.get_int("redis.db").unwrap_or(0)
    }

    pub fn redis_url(&self) -> String {
        let password = self.redis_password();
        if password.is_empty() {
            format!("redis://{}/{}", self.redis_addr(), self.redis_db())
        } else {
            format!(
                "redis://:{}@{}/{}",
                password,
                self.redis_addr(),
                self.redis_db()
            )
        }
    }

    // ========================================================================
    // Lock Configuration
    // ========================================================================

    fn duration_ms(&self, key: &str, default: Duration) -> Duration {
        self.config
            .get_int(key)
            .ok()
            .and_then(|ms| u64::try_from(ms).ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(default)
    }

    pub fn lock_ttl(&self) -> Duration {
        self.duration_ms("lock.ttl_ms", DEFAULT_LOCK_TTL)
    }

    pub fn lock_acquire_timeout(&self) -> Duration {
        self.duration_ms("lock.acquire_timeout_ms", DEFAULT_ACQUIRE_TIMEOUT)
    }

    pub fn lock_release_timeout(&self) -> Duration {
        self.duration_ms("lock.release_timeout_ms", DEFAULT_RELEASE_TIMEOUT)
    }

    pub fn lock_verify_ownership(&self) -> bool {
        self.config
            .get_bool("lock.verify_ownership")
            .unwrap_or(false)
    }

    pub fn lock_manager_config(&self) -> LockManagerConfig {
        LockManagerConfig {
            lock_ttl: self.lock_ttl(),
            acquire_timeout: self.lock_acquire_timeout(),
            release_timeout: self.lock_release_timeout(),
        }
    }

    // ========================================================================
    // Logging Configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string("log.dir").ok(),
            self.config.get_bool("log.console").unwrap_or(true),
            self.config.get_bool("log.file").unwrap_or(false),
            self.config
                .get_string("log.level")
                .unwrap_or("info".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn test_defaults_without_sources() {
        let configuration = Configuration::default();

        assert_eq!(configuration.server_address(), "0.0.0.0");
        assert_eq!(configuration.server_port(), 8080);
        assert_eq!(configuration.storage_type().unwrap(), StorageType::Redis);
        assert_eq!(configuration.redis_url(), "redis://localhost:6379/0");
        assert_eq!(configuration.lock_manager_config(), LockManagerConfig::default());
        assert!(!configuration.lock_verify_ownership());
    }

    #[test]
    fn test_redis_url_with_password() {
        let env = HashMap::from([
            ("FENCEKV_REDIS__ADDR".to_string(), "cache:6380".to_string()),
            ("FENCEKV_REDIS__PASSWORD".to_string(), "secret".to_string()),
            ("FENCEKV_REDIS__DB".to_string(), "2".to_string()),
        ]);
        let configuration = Configuration::from_sources(Cli::default(), Some(env)).unwrap();

        assert_eq!(configuration.redis_url(), "redis://:secret@cache:6380/2");
    }

    #[test]
    fn test_lock_settings_from_env() {
        let env = HashMap::from([
            ("FENCEKV_LOCK__TTL_MS".to_string(), "250".to_string()),
            ("FENCEKV_LOCK__ACQUIRE_TIMEOUT_MS".to_string(), "1000".to_string()),
            ("FENCEKV_LOCK__RELEASE_TIMEOUT_MS".to_string(), "0".to_string()),
            ("FENCEKV_LOCK__VERIFY_OWNERSHIP".to_string(), "true".to_string()),
        ]);
        let configuration = Configuration::from_sources(Cli::default(), Some(env)).unwrap();

        let lock = configuration.lock_manager_config();
        assert_eq!(lock.lock_ttl, Duration::from_millis(250));
        assert_eq!(lock.acquire_timeout, Duration::from_secs(1));
        // Zero falls back to the default
        assert_eq!(lock.release_timeout, DEFAULT_RELEASE_TIMEOUT);
        assert!(configuration.lock_verify_ownership());
    }

    #[test]
    fn test_cli_overrides_env() {
        let env = HashMap::from([
            ("FENCEKV_SERVER__PORT".to_string(), "9000".to_string()),
            ("FENCEKV_STORAGE__TYPE".to_string(), "redis".to_string()),
        ]);
        let cli = Cli::try_parse_from(["fencekv-server", "--port", "9100", "--storage", "memory"])
            .unwrap();
        let configuration = Configuration::from_sources(cli, Some(env)).unwrap();

        assert_eq!(configuration.server_port(), 9100);
        assert_eq!(configuration.storage_type().unwrap(), StorageType::Memory);
    }

    #[test]
    fn test_invalid_storage_type_is_error() {
        let env = HashMap::from([("FENCEKV_STORAGE__TYPE".to_string(), "etcd".to_string())]);
        let configuration = Configuration::from_sources(Cli::default(), Some(env)).unwrap();

        assert!(configuration.storage_type().is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_storage() {
        assert!(Cli::try_parse_from(["fencekv-server", "--storage", "etcd"]).is_err());
    }

    #[test]
    fn test_missing_explicit_config_file_is_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/fencekv.yml")),
            ..Default::default()
        };
        assert!(Configuration::from_sources(cli, empty_env()).is_err());
    }

    #[test]
    fn test_logging_config_from_settings() {
        let env = HashMap::from([
            ("FENCEKV_LOG__LEVEL".to_string(), "debug".to_string()),
            ("FENCEKV_LOG__FILE".to_string(), "true".to_string()),
            ("FENCEKV_LOG__DIR".to_string(), "/tmp/fencekv-test-logs".to_string()),
        ]);
        let configuration = Configuration::from_sources(Cli::default(), Some(env)).unwrap();

        let logging = configuration.logging_config();
        assert!(logging.file_logging);
        assert!(logging.console_output);
        assert_eq!(logging.log_dir, PathBuf::from("/tmp/fencekv-test-logs"));
        assert_eq!(logging.file_level, tracing::Level::DEBUG);
    }
}
