//! Dead Letters
//!
//! Every message that cannot be delivered (target stopped, or queued when
//! its actor stopped) is recorded once as a [`DeadLetter`] with the target
//! address and the `name(argTypes)` of the operation. The dead-letters actor
//! logs each record and forwards it to registered listeners.

use crate::actor::{Actor, ActorContext};
use crate::address::Address;
use crate::error::ActorResult;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    address: Address,
    representation: &'static str,
}

impl DeadLetter {
    pub fn new(address: Address, representation: &'static str) -> Self {
        Self {
            address,
            representation,
        }
    }

    /// The actor the message was sent to
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn representation(&self) -> &'static str {
        self.representation
    }
}

impl fmt::Display for DeadLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeadLetter[{}.{}]", self.address, self.representation)
    }
}

/// Observer of dead letters; closures taking `&DeadLetter` qualify
pub trait DeadLettersListener: Send + Sync {
    fn handle(&self, dead_letter: &DeadLetter);
}

impl<F> DeadLettersListener for F
where
    F: Fn(&DeadLetter) + Send + Sync,
{
    fn handle(&self, dead_letter: &DeadLetter) {
        self(dead_letter)
    }
}

crate::protocol! {
    /// Sink for undeliverable messages
    pub trait DeadLetters {
        fn failed_delivery(&mut self, ctx: &mut ActorContext, dead_letter: DeadLetter) -> ActorResult<()>;
        fn register_listener(&mut self, ctx: &mut ActorContext, listener: Arc<dyn DeadLettersListener>) -> ActorResult<()>;
    }
}

#[derive(Default)]
pub(crate) struct DeadLettersActor {
    listeners: Vec<Arc<dyn DeadLettersListener>>,
    recorded: u64,
}

impl Actor for DeadLettersActor {
    fn after_stop(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        debug!(recorded = self.recorded, listeners = self.listeners.len(), "Dead letters stopped");
        self.listeners.clear();
        Ok(())
    }
}

impl DeadLetters for DeadLettersActor {
    fn failed_delivery(&mut self, _ctx: &mut ActorContext, dead_letter: DeadLetter) -> ActorResult<()> {
        self.recorded += 1;
        info!(
            actor = %dead_letter.address(),
            representation = dead_letter.representation(),
            "Dead letter"
        );
        for listener in &self.listeners {
            // a faulty listener must not take the sink down with it
            if catch_unwind(AssertUnwindSafe(|| listener.handle(&dead_letter))).is_err() {
                warn!(%dead_letter, "Dead letters listener panicked");
            }
        }
        Ok(())
    }

    fn register_listener(
        &mut self,
        _ctx: &mut ActorContext,
        listener: Arc<dyn DeadLettersListener>,
    ) -> ActorResult<()> {
        self.listeners.push(listener);
        Ok(())
    }
}
