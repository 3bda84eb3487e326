//! Configuration management for the sluice service.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use sluice_worker::WorkerConfig;

use crate::server::HttpLimits;

const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "SLUICE_";

/// Service configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables prefixed with `SLUICE_` (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// # Example
///
/// ```no_run
/// use sluice_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Queue holds at most {} events", config.queue_capacity);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `SLUICE_HOST`
    #[serde(default = "default_host")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `SLUICE_PORT`
    #[serde(default = "default_port")]
    pub port: u16,

    // Queue
    /// Maximum number of events waiting for the worker.
    ///
    /// Environment variable: `SLUICE_QUEUE_CAPACITY`
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    // Worker
    /// Nominal cost of processing one event in milliseconds.
    ///
    /// Environment variable: `SLUICE_PROCESSING_COST_MS`
    #[serde(default = "default_processing_cost_ms")]
    pub processing_cost_ms: u64,

    // HTTP
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `SLUICE_REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Largest accepted request body in bytes.
    ///
    /// Environment variable: `SLUICE_MAX_PAYLOAD_BYTES`
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    // Shutdown
    /// Seconds to wait for the worker after the queue closes.
    ///
    /// Environment variable: `SLUICE_SHUTDOWN_TIMEOUT`
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,

    // Logging
    /// Log filter used when `RUST_LOG` is unset.
    ///
    /// Environment variable: `SLUICE_RUST_LOG`
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment
    /// variable overrides.
    pub fn load() -> Result<Self> {
        let config: Self = Self::figment().extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the layered configuration sources.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Convert to the worker crate's configuration.
    pub fn to_worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            processing_cost: Duration::from_millis(self.processing_cost_ms),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout),
        }
    }

    /// Convert to HTTP transport limits.
    pub fn to_http_limits(&self) -> HttpLimits {
        HttpLimits {
            request_timeout: Duration::from_secs(self.request_timeout),
            max_payload_bytes: self.max_payload_bytes,
        }
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.queue_capacity == 0 {
            anyhow::bail!("queue_capacity must be greater than 0");
        }

        if self.max_payload_bytes == 0 {
            anyhow::bail!("max_payload_bytes must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            queue_capacity: default_queue_capacity(),
            processing_cost_ms: default_processing_cost_ms(),
            request_timeout: default_request_timeout(),
            max_payload_bytes: default_max_payload_bytes(),
            shutdown_timeout: default_shutdown_timeout(),
            rust_log: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_queue_capacity() -> usize {
    sluice_core::DEFAULT_QUEUE_CAPACITY
}

fn default_processing_cost_ms() -> u64 {
    sluice_worker::DEFAULT_PROCESSING_COST_MS
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_payload_bytes() -> usize {
    1024 * 1024
}

fn default_shutdown_timeout() -> u64 {
    sluice_worker::DEFAULT_SHUTDOWN_TIMEOUT_SECONDS
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn default_config_snapshot() {
        let config = Config::default();

        assert!(config.validate().is_ok());

        insta::assert_json_snapshot!(config, @r#"
        {
          "host": "127.0.0.1",
          "port": 8081,
          "queue_capacity": 100,
          "processing_cost_ms": 50,
          "request_timeout": 30,
          "max_payload_bytes": 1048576,
          "shutdown_timeout": 10,
          "rust_log": "info"
        }
        "#);
    }

    #[test]
    fn env_overrides_file_and_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                port = 9000
                queue_capacity = 10
                processing_cost_ms = 5
                "#,
            )?;
            jail.set_env("SLUICE_QUEUE_CAPACITY", "250");
            jail.set_env("SLUICE_HOST", "0.0.0.0");

            let config = Config::load().map_err(|e| e.to_string())?;

            assert_eq!(config.host, "0.0.0.0");
            assert_eq!(config.port, 9000);
            assert_eq!(config.queue_capacity, 250);
            assert_eq!(config.processing_cost_ms, 5);
            assert_eq!(config.request_timeout, 30);
            Ok(())
        });
    }

    #[test]
    fn zero_capacity_from_env_fails_validation() {
        Jail::expect_with(|jail| {
            jail.set_env("SLUICE_QUEUE_CAPACITY", "0");

            let error = Config::load().expect_err("zero capacity must be rejected");

            assert!(error.to_string().contains("queue_capacity"));
            Ok(())
        });
    }

    #[test]
    fn unprefixed_env_is_ignored() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "1234");

            let config = Config::load().map_err(|e| e.to_string())?;

            assert_eq!(config.port, 8081);
            Ok(())
        });
    }

    #[test]
    fn invalid_config_validation_fails() {
        let mut config = Config::default();
        config.port = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.queue_capacity = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.max_payload_bytes = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.request_timeout = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn conversions_carry_durations() {
        let config = Config { processing_cost_ms: 75, shutdown_timeout: 3, ..Config::default() };

        let worker = config.to_worker_config();
        let limits = config.to_http_limits();

        assert_eq!(worker.processing_cost, Duration::from_millis(75));
        assert_eq!(worker.shutdown_timeout, Duration::from_secs(3));
        assert_eq!(limits.request_timeout, Duration::from_secs(30));
        assert_eq!(limits.max_payload_bytes, 1024 * 1024);
    }

    #[test]
    fn socket_address_parsing() {
        let config = Config { host: "127.0.0.1".to_string(), port: 9000, ..Config::default() };

        let addr = config.parse_server_addr().expect("Should parse socket address");

        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 9000);
    }
}
