//! Named Loggers
//!
//! A [`Logger`] is a cheap named handle over `tracing`; every event it emits
//! carries a `logger` field. Worlds keep a [`LoggerRegistry`] with one
//! default logger that actors receive unless their definition names another.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt::Display;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Logger {
    name: Arc<str>,
}

impl Logger {
    pub fn named(name: &str) -> Self {
        Self {
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trace(&self, message: impl Display) {
        tracing::trace!(logger = %self.name, "{}", message);
    }

    pub fn debug(&self, message: impl Display) {
        tracing::debug!(logger = %self.name, "{}", message);
    }

    pub fn info(&self, message: impl Display) {
        tracing::info!(logger = %self.name, "{}", message);
    }

    pub fn warn(&self, message: impl Display) {
        tracing::warn!(logger = %self.name, "{}", message);
    }

    pub fn error(&self, message: impl Display) {
        tracing::error!(logger = %self.name, "{}", message);
    }
}

#[derive(Debug)]
pub struct LoggerRegistry {
    loggers: DashMap<String, Logger>,
    default: RwLock<Logger>,
}

impl LoggerRegistry {
    pub fn new(default_name: &str) -> Self {
        let default = Logger::named(default_name);
        let loggers = DashMap::new();
        loggers.insert(default_name.to_string(), default.clone());
        Self {
            loggers,
            default: RwLock::new(default),
        }
    }

    pub fn register(&self, name: &str, is_default: bool) -> Logger {
        let logger = self
            .loggers
            .entry(name.to_string())
            .or_insert_with(|| Logger::named(name))
            .clone();
        if is_default {
            *self.default.write() = logger.clone();
        }
        logger
    }

    pub fn logger(&self, name: &str) -> Option<Logger> {
        self.loggers.get(name).map(|entry| entry.value().clone())
    }

    pub fn default_logger(&self) -> Logger {
        self.default.read().clone()
    }
}
