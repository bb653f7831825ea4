//! Actor Behavior and Context
//!
//! An actor is a user behavior value implementing [`Actor`] plus one or more
//! protocol traits. The runtime owns an [`ActorContext`] per actor and passes
//! it into every hook and operation body: addressing, the owning stage,
//! parent, supervisor, logger and scheduler all come from the context.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──► Started ──► Active ⇄ Suspended ──► Stopping ──► Stopped
//! ```
//!
//! Suspension (after a failure, until the supervisor decides) keeps queued
//! messages. Stopping removes the actor from its directory and stops its
//! children before `after_stop` runs.

use crate::address::Address;
use crate::cell::{self, ActorNode};
use crate::completes::Completes;
use crate::dead_letters::DeadLettersProxy;
use crate::definition::Definition;
use crate::error::{ActorError, ActorResult, Result};
use crate::logging::Logger;
use crate::protocol::{Implements, ProtocolProxy};
use crate::scheduler::Scheduler;
use crate::stage::Stage;
use crate::supervision::{Failure, SupervisorProxy};
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Lifecycle hooks shared by every actor behavior
pub trait Actor: Send + 'static {
    /// Runs after directory registration and before any message
    fn before_start(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        Ok(())
    }

    /// Runs once the actor is out of the directory and its children are stopping
    fn after_stop(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        Ok(())
    }

    /// Runs on the failed behavior before it is replaced
    fn before_restart(&mut self, ctx: &mut ActorContext, _failure: &Failure) -> ActorResult<()> {
        self.after_stop(ctx)
    }

    /// Runs on the fresh behavior after a restart
    fn after_restart(&mut self, ctx: &mut ActorContext, _failure: &Failure) -> ActorResult<()> {
        self.before_start(ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LifeCycleState {
    Created = 0,
    Started = 1,
    Active = 2,
    Suspended = 3,
    Stopping = 4,
    Stopped = 5,
}

impl LifeCycleState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => LifeCycleState::Created,
            1 => LifeCycleState::Started,
            2 => LifeCycleState::Active,
            3 => LifeCycleState::Suspended,
            4 => LifeCycleState::Stopping,
            _ => LifeCycleState::Stopped,
        }
    }

    /// Stopping or stopped: no further messages will execute
    pub fn is_stopped(self) -> bool {
        self >= LifeCycleState::Stopping
    }

    /// Messages may execute in this state
    pub fn is_deliverable(self) -> bool {
        matches!(self, LifeCycleState::Started | LifeCycleState::Active)
    }
}

/// Protocol-independent reference to an actor
#[derive(Clone)]
pub struct ActorRef {
    node: Arc<dyn ActorNode>,
}

impl ActorRef {
    pub(crate) fn new(node: Arc<dyn ActorNode>) -> Self {
        Self { node }
    }

    pub(crate) fn node(&self) -> &Arc<dyn ActorNode> {
        &self.node
    }

    pub fn address(&self) -> &Address {
        self.node.address()
    }

    pub fn lifecycle(&self) -> LifeCycleState {
        self.node.lifecycle()
    }

    pub fn is_stopped(&self) -> bool {
        self.node.lifecycle().is_stopped()
    }

    /// Stop the actor and, depth first, all of its children
    pub fn stop(&self) {
        self.node.stop();
    }

    pub fn pending_messages(&self) -> usize {
        self.node.pending_messages()
    }

    pub fn parent(&self) -> Option<ActorRef> {
        self.node.parent().map(ActorRef::new)
    }

    pub fn children(&self) -> Vec<ActorRef> {
        self.node.children().into_iter().map(ActorRef::new).collect()
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("address", self.address())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

/// Runtime services handed to every hook and operation body
pub struct ActorContext {
    address: Address,
    stage: Stage,
    parent: Option<Weak<dyn ActorNode>>,
    supervisor: Option<SupervisorProxy>,
    logger: Logger,
    node: Weak<dyn ActorNode>,
    // completion of the ask being executed, until detached
    answer: Option<Box<dyn Any + Send>>,
}

impl ActorContext {
    pub(crate) fn new(
        address: Address,
        stage: Stage,
        parent: Option<Weak<dyn ActorNode>>,
        supervisor: Option<SupervisorProxy>,
        logger: Logger,
        node: Weak<dyn ActorNode>,
    ) -> Self {
        Self {
            address,
            stage,
            parent,
            supervisor,
            logger,
            node,
            answer: None,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn scheduler(&self) -> &Scheduler {
        self.stage.scheduler()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn parent(&self) -> Option<ActorRef> {
        self.parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(ActorRef::new)
    }

    /// The supervisor this actor's failures are reported to
    pub fn supervisor(&self) -> Option<&SupervisorProxy> {
        self.supervisor.as_ref()
    }

    pub fn world(&self) -> Option<World> {
        self.stage.world()
    }

    pub fn dead_letters(&self) -> Option<DeadLettersProxy> {
        self.world().map(|world| world.dead_letters())
    }

    /// Reference to this actor
    pub fn actor(&self) -> Option<ActorRef> {
        self.node.upgrade().map(ActorRef::new)
    }

    pub fn is_stopped(&self) -> bool {
        self.node
            .upgrade()
            .map_or(true, |node| node.lifecycle().is_stopped())
    }

    /// Stop this actor once the current message completes
    pub fn stop(&self) {
        if let Some(node) = self.node.upgrade() {
            node.stop();
        }
    }

    /// Take over the completion of the ask being executed so that it can be
    /// resolved later, typically from another message or from a continuation
    /// on a different actor's answer. The value the body returns is then
    /// discarded.
    ///
    /// Returns `None` inside a tell, once the completion was already taken,
    /// or when `T` is not the ask's value type.
    pub fn completes_eventually<T: Clone + Send + 'static>(&mut self) -> Option<Completes<T>> {
        let answer = self.answer.take()?;
        match answer.downcast::<Completes<T>>() {
            Ok(completes) => Some(*completes),
            Err(answer) => {
                self.answer = Some(answer);
                None
            }
        }
    }

    pub(crate) fn offer_answer(&mut self, answer: Box<dyn Any + Send>) {
        self.answer = Some(answer);
    }

    /// True when the offered completion was not taken by the body
    pub(crate) fn withdraw_answer(&mut self) -> bool {
        self.answer.take().is_some()
    }

    /// Create an actor on this actor's stage with this actor as its parent
    pub fn child_actor_for<X, A>(&self, definition: Definition<A>) -> Result<X>
    where
        A: Actor,
        X: ProtocolProxy,
        X::Protocol: Implements<A>,
    {
        let parent = self.actor().ok_or_else(|| {
            ActorError::delivery_to_stopped(&self.address, "child_actor_for")
        })?;
        self.stage.actor_for(definition.with_parent(parent))
    }

    /// Proxy for another protocol implemented by this same actor.
    /// `A` must be the actor's concrete behavior type.
    pub fn self_as<X, A>(&self) -> Option<X>
    where
        A: Actor,
        X: ProtocolProxy,
        X::Protocol: Implements<A>,
    {
        cell::proxy_from_node::<X, A>(self.node.upgrade()?)
    }
}

impl fmt::Debug for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorContext")
            .field("address", &self.address)
            .field("stage", &self.stage.name())
            .field("logger", &self.logger.name())
            .finish()
    }
}
