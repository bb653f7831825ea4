//! Proxy Handles
//!
//! Every generated protocol proxy wraps a [`Handle`]: the protocol-typed
//! entry point that turns a method call into a queued operation. `tell`
//! returns immediately; `ask` returns a [`Completes`] resolved by the
//! operation once the actor runs it.
//!
//! Sends to a stopped actor go to dead letters, and an `ask` made after the
//! stop fails through its completion.

use crate::actor::{Actor, ActorContext, ActorRef};
use crate::address::Address;
use crate::cell::{ActorCell, ActorNode};
use crate::completes::{Completes, PendingCompletion};
use crate::error::{ActorError, ActorResult};
use crate::message::Operation;
use crate::protocol::Implements;
use crate::scheduler::Scheduler;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Operation typed against the protocol view rather than the concrete actor
pub(crate) type ProtocolOperation<P> =
    Box<dyn FnOnce(&mut P, &mut ActorContext) -> ActorResult<()> + Send>;

pub(crate) trait Target<P: ?Sized>: Send + Sync {
    fn actor(&self) -> ActorRef;

    fn address(&self) -> &Address;

    fn is_stopped(&self) -> bool;

    fn scheduler(&self) -> &Scheduler;

    fn deliver(
        &self,
        representation: &'static str,
        operation: ProtocolOperation<P>,
        completion: Option<Box<dyn PendingCompletion>>,
    );

    fn dead_letter(&self, representation: &'static str);
}

pub struct Handle<P: ?Sized + 'static> {
    target: Arc<dyn Target<P>>,
}

impl<P: ?Sized + 'static> Clone for Handle<P> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
        }
    }
}

impl<P: ?Sized + 'static> Handle<P> {
    pub(crate) fn new(target: Arc<dyn Target<P>>) -> Self {
        Self { target }
    }

    pub fn address(&self) -> &Address {
        self.target.address()
    }

    /// Protocol-independent reference to the same actor
    pub fn actor(&self) -> ActorRef {
        self.target.actor()
    }

    pub fn is_stopped(&self) -> bool {
        self.target.is_stopped()
    }

    /// Enqueue an operation with no result
    pub fn tell<F>(&self, representation: &'static str, operation: F)
    where
        F: FnOnce(&mut P, &mut ActorContext) -> ActorResult<()> + Send + 'static,
    {
        if self.target.is_stopped() {
            self.target.dead_letter(representation);
            return;
        }
        self.target
            .deliver(representation, Box::new(operation), None);
    }

    /// Enqueue an operation whose value resolves the returned completion
    pub fn ask<T, F>(&self, representation: &'static str, operation: F) -> Completes<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&mut P, &mut ActorContext) -> ActorResult<T> + Send + 'static,
    {
        if self.target.is_stopped() {
            self.target.dead_letter(representation);
            let completes = Completes::using(self.target.scheduler().clone());
            completes.fail(ActorError::delivery_to_stopped(
                self.target.address(),
                representation,
            ));
            return completes;
        }

        let completes = Completes::using(self.target.scheduler().clone());
        let resolver = completes.clone();
        let operation: ProtocolOperation<P> =
            Box::new(move |protocol: &mut P, ctx: &mut ActorContext| {
                ctx.offer_answer(Box::new(resolver.clone()));
                let outcome = operation(protocol, ctx);
                let attached = ctx.withdraw_answer();
                let value = outcome?;
                if attached {
                    resolver.with(value);
                }
                Ok(())
            });
        self.target
            .deliver(representation, operation, Some(Box::new(completes.clone())));
        completes
    }
}

impl<P: ?Sized + 'static> fmt::Debug for Handle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("address", self.target.address())
            .field("stopped", &self.target.is_stopped())
            .finish()
    }
}

/// Binds a protocol view `P` to a cell whose behavior is `A`
pub(crate) struct Binding<A: Actor, P: ?Sized> {
    cell: Arc<ActorCell<A>>,
    protocol: PhantomData<fn(&mut P)>,
}

impl<A: Actor, P: ?Sized> Binding<A, P> {
    pub(crate) fn new(cell: Arc<ActorCell<A>>) -> Self {
        Self {
            cell,
            protocol: PhantomData,
        }
    }
}

impl<A, P> Target<P> for Binding<A, P>
where
    A: Actor,
    P: ?Sized + Implements<A>,
{
    fn actor(&self) -> ActorRef {
        ActorRef::new(Arc::clone(&self.cell) as Arc<dyn ActorNode>)
    }

    fn address(&self) -> &Address {
        self.cell.address()
    }

    fn is_stopped(&self) -> bool {
        self.cell.lifecycle().is_stopped()
    }

    fn scheduler(&self) -> &Scheduler {
        self.cell.stage().scheduler()
    }

    fn deliver(
        &self,
        representation: &'static str,
        operation: ProtocolOperation<P>,
        completion: Option<Box<dyn PendingCompletion>>,
    ) {
        let bound: Operation<A> = Box::new(move |actor: &mut A, ctx: &mut ActorContext| {
            operation(P::view(actor), ctx)
        });
        self.cell.enqueue(representation, bound, completion);
    }

    fn dead_letter(&self, representation: &'static str) {
        self.cell.dead_letter(representation);
    }
}
