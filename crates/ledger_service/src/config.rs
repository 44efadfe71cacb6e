//! Service configuration
//!
//! Values come from `LEDGER_*` environment variables layered over the
//! defaults below. `DATABASE_URL` is honoured when `LEDGER_DATABASE_URL`
//! is not set.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use core_kernel::{Amount, TemporalError, Timezone};
use domain_ledger::{ConsumerConfig, WithdrawalLimits, DEFAULT_DAILY_WITHDRAWAL_CEILING};
use infra_db::{DatabaseConfig, QueueConfig};

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid timezone: {0}")]
    Timezone(#[from] TemporalError),

    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Ledger service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
    /// IANA name of the timezone that defines the business day
    pub timezone: String,
    /// Default daily withdrawal ceiling in cents
    pub daily_withdrawal_ceiling: u64,
    pub consumer_retry_backoff_ms: u64,
    pub consumer_max_backoff_ms: u64,
    pub queue_poll_interval_ms: u64,
    pub queue_visibility_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let consumer = ConsumerConfig::default();
        let queue = QueueConfig::default();

        Self {
            database_url: "postgres://localhost/ledger".to_string(),
            max_connections: 10,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            timezone: "America/Sao_Paulo".to_string(),
            daily_withdrawal_ceiling: DEFAULT_DAILY_WITHDRAWAL_CEILING.cents(),
            consumer_retry_backoff_ms: consumer.retry_backoff.as_millis() as u64,
            consumer_max_backoff_ms: consumer.max_backoff.as_millis() as u64,
            queue_poll_interval_ms: queue.poll_interval.as_millis() as u64,
            queue_visibility_timeout_secs: queue.visibility_timeout.as_secs(),
        }
    }
}

impl LedgerConfig {
    /// Loads configuration from the environment and validates it
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config: LedgerConfig = config::Config::builder()
            .add_source(config::Environment::with_prefix("LEDGER").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if std::env::var_os("LEDGER_DATABASE_URL").is_none() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                config.database_url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects unknown timezones and zero sizes or intervals
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;

        let positive = [
            ("max_connections", u64::from(self.max_connections)),
            ("consumer_retry_backoff_ms", self.consumer_retry_backoff_ms),
            ("consumer_max_backoff_ms", self.consumer_max_backoff_ms),
            ("queue_poll_interval_ms", self.queue_poll_interval_ms),
            ("queue_visibility_timeout_secs", self.queue_visibility_timeout_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.consumer_max_backoff_ms < self.consumer_retry_backoff_ms {
            return Err(ConfigError::Invalid {
                field: "consumer_max_backoff_ms",
                reason: format!(
                    "{} is below consumer_retry_backoff_ms {}",
                    self.consumer_max_backoff_ms, self.consumer_retry_backoff_ms
                ),
            });
        }

        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database_url",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn timezone(&self) -> Result<Timezone, ConfigError> {
        Ok(self.timezone.parse()?)
    }

    pub fn withdrawal_limits(&self) -> WithdrawalLimits {
        WithdrawalLimits::new(Amount::from_cents(self.daily_withdrawal_ceiling))
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            retry_backoff: Duration::from_millis(self.consumer_retry_backoff_ms),
            max_backoff: Duration::from_millis(self.consumer_max_backoff_ms),
        }
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::default()
            .with_poll_interval(Duration::from_millis(self.queue_poll_interval_ms))
            .with_visibility_timeout(Duration::from_secs(self.queue_visibility_timeout_secs))
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone())
            .max_connections(self.max_connections)
            .min_connections(self.max_connections.min(2))
    }
}
