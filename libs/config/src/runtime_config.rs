//! Runtime Configuration Module
//!
//! Provides configuration loading for the actors runtime. Supports loading
//! from TOML files with `ACTORS_`-prefixed environment overrides, e.g.
//! `ACTORS_DISPATCHER__WORKER_THREADS=8`.

use crate::defaults;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Main runtime configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ActorsConfig {
    /// Worker pool settings
    pub dispatcher: DispatcherConfig,

    /// Mailbox provider settings
    pub mailbox: MailboxConfig,

    /// Stage shutdown settings
    pub stage: StageConfig,

    /// Settings for the default (public root) supervisor
    pub supervision: SupervisionConfig,

    /// Logger settings
    pub logging: LoggingConfig,

    /// Completion settings
    pub completes: CompletesConfig,
}

/// Worker pool configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DispatcherConfig {
    pub worker_threads: usize,
    pub throughput: usize,
    pub thread_name: String,
}

/// Mailbox configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MailboxConfig {
    /// Provider used when a definition names none, or names an unknown one
    pub default: String,
    pub ring_capacity: usize,
}

/// Stage shutdown configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StageConfig {
    pub shutdown_retries: u32,
    pub shutdown_interval_ms: u64,
}

/// Restart limits applied by the default supervisor
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SupervisionConfig {
    pub intensity: u32,
    pub period_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub default_logger: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CompletesConfig {
    pub default_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_threads: defaults::dispatcher::WORKER_THREADS,
            throughput: defaults::dispatcher::THROUGHPUT,
            thread_name: defaults::dispatcher::THREAD_NAME.to_string(),
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            default: defaults::mailbox::QUEUE_MAILBOX.to_string(),
            ring_capacity: defaults::mailbox::RING_CAPACITY,
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            shutdown_retries: defaults::stage::SHUTDOWN_RETRIES,
            shutdown_interval_ms: defaults::stage::SHUTDOWN_INTERVAL_MS,
        }
    }
}

impl StageConfig {
    pub fn shutdown_interval(&self) -> Duration {
        Duration::from_millis(self.shutdown_interval_ms)
    }
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            intensity: defaults::supervision::INTENSITY,
            period_ms: defaults::supervision::PERIOD_MS,
        }
    }
}

impl SupervisionConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_logger: defaults::logging::DEFAULT_LOGGER.to_string(),
        }
    }
}

impl Default for CompletesConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: defaults::completes::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl CompletesConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

/// A configuration value that cannot drive a runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidConfig {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.message)
    }
}

impl std::error::Error for InvalidConfig {}

impl ActorsConfig {
    /// Load configuration from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading runtime config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (ACTORS_ prefix)
        builder = builder.add_source(
            Environment::with_prefix("ACTORS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(?config, "Runtime configuration loaded");
        Ok(config)
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> std::result::Result<(), InvalidConfig> {
        if self.dispatcher.worker_threads == 0 {
            return Err(InvalidConfig {
                field: "dispatcher.worker_threads",
                message: "must be at least 1".to_string(),
            });
        }
        if self.dispatcher.throughput == 0 {
            return Err(InvalidConfig {
                field: "dispatcher.throughput",
                message: "must be at least 1".to_string(),
            });
        }
        if self.mailbox.default.is_empty() {
            return Err(InvalidConfig {
                field: "mailbox.default",
                message: "must name a mailbox provider".to_string(),
            });
        }
        if self.mailbox.ring_capacity == 0 {
            return Err(InvalidConfig {
                field: "mailbox.ring_capacity",
                message: "must be at least 1".to_string(),
            });
        }
        if self.logging.default_logger.is_empty() {
            return Err(InvalidConfig {
                field: "logging.default_logger",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
