//! # Actors Runtime Configuration
//!
//! Configuration management and defaults for the actors runtime.
//!
//! ## Features
//!
//! - **Defaults**: worker pool sizing, mailbox names, shutdown and restart limits
//! - **Loading**: TOML files plus `ACTORS_` environment overrides
//! - **Validation**: rejects values a runtime cannot start with
//!
//! ## Usage
//!
//! ```rust
//! use actors_config::ActorsConfig;
//!
//! let config = ActorsConfig::from_toml_str("[dispatcher]\nworker_threads = 2\n").unwrap();
//! assert_eq!(config.dispatcher.worker_threads, 2);
//! assert_eq!(config.mailbox.default, actors_config::defaults::mailbox::QUEUE_MAILBOX);
//! ```

pub mod defaults;
pub mod runtime_config;

// Re-export commonly used types
pub use runtime_config::{
    ActorsConfig, CompletesConfig, DispatcherConfig, InvalidConfig, LoggingConfig, MailboxConfig,
    StageConfig, SupervisionConfig,
};
