//! Queued Messages
//!
//! A message is one deferred operation bound to the concrete actor type,
//! plus the optional completion it resolves and the `name(argTypes)`
//! representation used in diagnostics and dead letters.

use crate::actor::ActorContext;
use crate::address::Address;
use crate::completes::PendingCompletion;
use crate::error::{ActorError, ActorResult};
use std::fmt;

/// Deferred operation executed against the actor's behavior
pub type Operation<A> = Box<dyn FnOnce(&mut A, &mut ActorContext) -> ActorResult<()> + Send>;

pub struct Message<A> {
    target: Address,
    representation: &'static str,
    operation: Option<Operation<A>>,
    completion: Option<Box<dyn PendingCompletion>>,
}

impl<A> Message<A> {
    pub fn new(
        target: Address,
        representation: &'static str,
        operation: Operation<A>,
        completion: Option<Box<dyn PendingCompletion>>,
    ) -> Self {
        Self {
            target,
            representation,
            operation: Some(operation),
            completion,
        }
    }

    pub fn target(&self) -> &Address {
        &self.target
    }

    pub fn representation(&self) -> &'static str {
        self.representation
    }

    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }

    /// Fail the pending completion, if any, and consume the message unexecuted
    pub fn reject(mut self, error: ActorError) {
        if let Some(completion) = self.completion.take() {
            completion.fail(error);
        }
    }

    pub(crate) fn into_parts(mut self) -> (Option<Operation<A>>, Option<Box<dyn PendingCompletion>>) {
        (self.operation.take(), self.completion.take())
    }
}

// A message dropped without running (mailbox torn down with the runtime)
// must not leave its caller waiting forever.
impl<A> Drop for Message<A> {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            completion.fail(ActorError::abandoned(&self.target, self.representation));
        }
    }
}

impl<A> fmt::Debug for Message<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("target", &self.target)
            .field("representation", &self.representation)
            .field("completion", &self.completion.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressFactory;
    use crate::completes::Completes;

    #[test]
    fn test_dropped_message_abandons_completion() {
        let completes: Completes<u32> = Completes::new();
        let message: Message<()> = Message::new(
            AddressFactory::new().unique().unwrap(),
            "total()",
            Box::new(|_, _| Ok(())),
            Some(Box::new(completes.clone())),
        );
        drop(message);
        assert!(matches!(
            completes.outcome(),
            Some(Err(ActorError::Abandoned { representation: "total()", .. }))
        ));
    }

    #[test]
    fn test_reject_uses_given_error() {
        let address = AddressFactory::new().unique().unwrap();
        let completes: Completes<u32> = Completes::new();
        let message: Message<()> = Message::new(
            address.clone(),
            "total()",
            Box::new(|_, _| Ok(())),
            Some(Box::new(completes.clone())),
        );
        message.reject(ActorError::delivery_to_stopped(&address, "total()"));
        assert!(matches!(
            completes.outcome(),
            Some(Err(ActorError::DeliveryToStoppedActor { .. }))
        ));
    }
}
