//! Runtime Error Types
//!
//! Errors surfaced by actor creation, completion awaits and world lifecycle.
//! Failures raised inside message bodies never appear here synchronously:
//! they are contained by supervision and only reach a caller as a failed
//! [`Completes`](crate::Completes).

use crate::address::Address;
use std::sync::Arc;
use thiserror::Error;

/// Shareable error cause, cloned into every observer of a failed completion
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Main runtime error type
#[derive(Error, Debug, Clone)]
pub enum ActorError {
    /// An actor is already registered under this address
    #[error("Duplicate address: {address}")]
    DuplicateAddress { address: Address },

    /// Every ordinary address id below the reserved range is taken
    #[error("Address ids exhausted at {next}")]
    AddressesExhausted { next: u64 },

    /// Creation attempted on a stage that has been stopped
    #[error("Stage stopped: {stage}")]
    StageStopped { stage: String },

    /// The definition's instantiator returned an error
    #[error("Actor instantiation failed: {address}: {source}")]
    ActorInstantiationFailed { address: Address, source: SharedError },

    /// A message targeted an actor that is stopping or stopped
    #[error("Delivery to stopped actor: {address}: {representation}")]
    DeliveryToStoppedActor {
        address: Address,
        representation: &'static str,
    },

    /// The message body failed and the actor was handed to its supervisor
    #[error("Supervision failure: {address}: {representation}: {message}")]
    SupervisionFailure {
        address: Address,
        representation: &'static str,
        message: String,
    },

    /// A message was dropped before it could execute
    #[error("Abandoned message: {address}: {representation}")]
    Abandoned {
        address: Address,
        representation: &'static str,
    },

    /// Blocking await exceeded its timeout
    #[error("Timeout error: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The world has been terminated
    #[error("World terminated: {world}")]
    WorldTerminated { world: String },

    /// The scheduler no longer accepts tasks
    #[error("Scheduler closed: {scheduler}")]
    SchedulerClosed { scheduler: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// The worker runtime could not be built
    #[error("Runtime error: {message}")]
    Runtime { message: String, source: SharedError },
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, ActorError>;

/// Result type returned by actor message bodies and lifecycle hooks
pub type ActorResult<T> = anyhow::Result<T>;

impl ActorError {
    pub fn duplicate_address(address: &Address) -> Self {
        Self::DuplicateAddress {
            address: address.clone(),
        }
    }

    pub fn addresses_exhausted(next: u64) -> Self {
        Self::AddressesExhausted { next }
    }

    pub fn stage_stopped(stage: impl Into<String>) -> Self {
        Self::StageStopped {
            stage: stage.into(),
        }
    }

    pub fn instantiation_failed(address: &Address, cause: anyhow::Error) -> Self {
        let source: Box<dyn std::error::Error + Send + Sync> = cause.into();
        Self::ActorInstantiationFailed {
            address: address.clone(),
            source: Arc::from(source),
        }
    }

    pub fn delivery_to_stopped(address: &Address, representation: &'static str) -> Self {
        Self::DeliveryToStoppedActor {
            address: address.clone(),
            representation,
        }
    }

    pub fn supervision_failure(
        address: &Address,
        representation: &'static str,
        cause: &anyhow::Error,
    ) -> Self {
        Self::SupervisionFailure {
            address: address.clone(),
            representation,
            message: format!("{:#}", cause),
        }
    }

    pub fn abandoned(address: &Address, representation: &'static str) -> Self {
        Self::Abandoned {
            address: address.clone(),
            representation,
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn world_terminated(world: impl Into<String>) -> Self {
        Self::WorldTerminated {
            world: world.into(),
        }
    }

    pub fn scheduler_closed(scheduler: impl Into<String>) -> Self {
        Self::SchedulerClosed {
            scheduler: scheduler.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field: field.map(|s| s.to_string()),
        }
    }

    pub fn runtime_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Runtime {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Short category label for structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::DuplicateAddress { .. } => "duplicate_address",
            Self::AddressesExhausted { .. } => "addresses_exhausted",
            Self::StageStopped { .. } => "stage_stopped",
            Self::ActorInstantiationFailed { .. } => "instantiation",
            Self::DeliveryToStoppedActor { .. } => "dead_letter",
            Self::SupervisionFailure { .. } => "supervision",
            Self::Abandoned { .. } => "abandoned",
            Self::Timeout { .. } => "timeout",
            Self::WorldTerminated { .. } => "world_terminated",
            Self::SchedulerClosed { .. } => "scheduler_closed",
            Self::Configuration { .. } => "configuration",
            Self::Runtime { .. } => "runtime",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instantiation_failure_keeps_cause() {
        let address = Address::new(7, Some("worker"));
        let err = ActorError::instantiation_failed(&address, anyhow::anyhow!("no database"));

        assert_eq!(err.category(), "instantiation");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "no database");
        assert!(err.to_string().contains("worker#7"));
    }

    #[test]
    fn test_configuration_error_field() {
        match ActorError::configuration("bad", Some("mailbox.default")) {
            ActorError::Configuration { field, .. } => {
                assert_eq!(field.as_deref(), Some("mailbox.default"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
