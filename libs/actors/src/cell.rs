//! Actor Cells
//!
//! The runtime half of an actor: the behavior slot, mailbox, lifecycle
//! state, child list and restart window. Cells are shared as
//! `Arc<dyn ActorNode>` by directories, parents and supervision handles.
//!
//! At most one drain runs per cell at a time (the `delivering` flag), so a
//! behavior is never entered concurrently. Each drain delivers up to the
//! configured throughput before yielding its worker.

use crate::actor::{Actor, ActorContext, ActorRef, LifeCycleState};
use crate::address::Address;
use crate::completes::PendingCompletion;
use crate::dead_letters::DeadLetter;
use crate::definition::Instantiator;
use crate::dispatcher::Dispatcher;
use crate::error::{ActorError, ActorResult};
use crate::handle::{Binding, Handle};
use crate::logging::Logger;
use crate::mailbox::Mailbox;
use crate::message::{Message, Operation};
use crate::protocol::{Implements, ProtocolProxy};
use crate::stage::Stage;
use crate::supervision::{Failure, RestartWindow, Supervised, SupervisorProxy};
use anyhow::anyhow;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{fence, AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, debug_span, error, info, warn};

const BEFORE_START: &str = "before_start()";

/// Object-safe view of a cell used wherever the behavior type is unknown
pub(crate) trait ActorNode: Send + Sync + 'static {
    fn address(&self) -> &Address;

    fn lifecycle(&self) -> LifeCycleState;

    fn stop(&self);

    /// Leave suspension and continue with the queued messages
    fn resume(&self);

    /// Replace the behavior with a fresh instance from the definition
    fn restart(&self, failure: &Failure);

    /// Count a restart against the window; false once the intensity is spent
    fn permit_restart(&self, intensity: u32, period: Duration) -> bool;

    fn pending_messages(&self) -> usize;

    fn parent(&self) -> Option<Arc<dyn ActorNode>>;

    fn children(&self) -> Vec<Arc<dyn ActorNode>>;

    fn add_child(&self, child: Arc<dyn ActorNode>);

    fn remove_child(&self, address: &Address);

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

struct Slot<A> {
    actor: Option<A>,
    context: ActorContext,
}

/// Everything a cell is built from, resolved by the stage
pub(crate) struct CellSpec<A: Actor> {
    pub address: Address,
    pub stage: Stage,
    pub mailbox: Box<dyn Mailbox<A>>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub throughput: usize,
    pub parent: Option<ActorRef>,
    pub supervisor: Option<SupervisorProxy>,
    pub logger: Logger,
    pub instantiator: Instantiator<A>,
}

pub(crate) struct ActorCell<A: Actor> {
    address: Address,
    stage: Stage,
    slot: Mutex<Slot<A>>,
    mailbox: Box<dyn Mailbox<A>>,
    dispatcher: Arc<dyn Dispatcher>,
    throughput: usize,
    state: AtomicU8,
    delivering: AtomicBool,
    finalized: AtomicBool,
    registered: AtomicBool,
    parent: Option<Weak<dyn ActorNode>>,
    children: Mutex<Vec<Arc<dyn ActorNode>>>,
    supervisor: Option<SupervisorProxy>,
    instantiator: Instantiator<A>,
    restarts: Mutex<RestartWindow>,
    me: Weak<ActorCell<A>>,
}

/// Run a hook or operation, converting a panic into an ordinary failure
fn guarded<T>(f: impl FnOnce() -> ActorResult<T>) -> ActorResult<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            Err(anyhow!("panicked: {}", message))
        }
    }
}

impl<A: Actor> ActorCell<A> {
    pub(crate) fn new(spec: CellSpec<A>) -> Arc<Self> {
        let parent = spec.parent.as_ref().map(|parent| Arc::downgrade(parent.node()));
        Arc::new_cyclic(|me: &Weak<Self>| {
            let node: Weak<dyn ActorNode> = me.clone();
            let context = ActorContext::new(
                spec.address.clone(),
                spec.stage.clone(),
                parent.clone(),
                spec.supervisor.clone(),
                spec.logger,
                node,
            );
            Self {
                address: spec.address,
                stage: spec.stage,
                slot: Mutex::new(Slot {
                    actor: None,
                    context,
                }),
                mailbox: spec.mailbox,
                dispatcher: spec.dispatcher,
                throughput: spec.throughput.max(1),
                state: AtomicU8::new(LifeCycleState::Created as u8),
                delivering: AtomicBool::new(false),
                finalized: AtomicBool::new(false),
                registered: AtomicBool::new(false),
                parent,
                children: Mutex::new(Vec::new()),
                supervisor: spec.supervisor,
                instantiator: spec.instantiator,
                restarts: Mutex::new(RestartWindow::default()),
                me: me.clone(),
            }
        })
    }

    /// Build the behavior. Runs on the creating thread, outside any drain.
    pub(crate) fn instantiate(&self) -> ActorResult<()> {
        let mut slot = self.slot.lock();
        let instantiator = Arc::clone(&self.instantiator);
        let actor = guarded(|| instantiator(&mut slot.context))?;
        slot.actor = Some(actor);
        Ok(())
    }

    /// Tear down a cell that never made it into the directory
    pub(crate) fn discard(&self) {
        self.state.store(LifeCycleState::Stopped as u8, Ordering::SeqCst);
        self.finalized.store(true, Ordering::SeqCst);
        self.mailbox.close();
        let children = std::mem::take(&mut *self.children.lock());
        for child in children {
            child.stop();
        }
        while let Some(message) = self.mailbox.receive() {
            self.reject_to_dead_letters(message);
        }
        self.slot.lock().actor = None;
    }

    pub(crate) fn mark_registered(&self) {
        self.registered.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Run `before_start` and open the mailbox for delivery
    pub(crate) fn start(self: &Arc<Self>) {
        let outcome = {
            let mut slot = self.slot.lock();
            let Slot { actor, context } = &mut *slot;
            match actor.as_mut() {
                Some(actor) => guarded(|| actor.before_start(context)),
                None => Ok(()),
            }
        };
        let _ = self.state.compare_exchange(
            LifeCycleState::Created as u8,
            LifeCycleState::Started as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        debug!(actor = %self.address, stage = %self.stage.name(), "Actor started");

        match outcome {
            Ok(()) => {
                if self.mailbox.pending_messages() > 0 {
                    self.schedule();
                }
            }
            Err(cause) => self.fail(Failure::new(self.address.clone(), BEFORE_START, cause), None),
        }
    }

    /// Append an operation to the mailbox and make sure a drain is pending
    pub(crate) fn enqueue(
        self: &Arc<Self>,
        representation: &'static str,
        operation: Operation<A>,
        completion: Option<Box<dyn PendingCompletion>>,
    ) {
        let sent = if self.mailbox.is_preallocated() {
            self.mailbox
                .send_with(&self.address, representation, operation, completion)
        } else {
            self.mailbox.send(Message::new(
                self.address.clone(),
                representation,
                operation,
                completion,
            ))
        };
        match sent {
            Ok(()) => {
                fence(Ordering::SeqCst);
                self.schedule();
            }
            Err(message) => self.reject_to_dead_letters(message),
        }
    }

    pub(crate) fn dead_letter(&self, representation: &'static str) {
        self.stage
            .dead_letter(DeadLetter::new(self.address.clone(), representation));
    }

    fn reject_to_dead_letters(&self, message: Message<A>) {
        let representation = message.representation();
        message.reject(ActorError::delivery_to_stopped(&self.address, representation));
        self.dead_letter(representation);
    }

    fn schedule(self: &Arc<Self>) {
        let cell = Arc::clone(self);
        // a closed dispatcher hands the drain back; run it here so stopping
        // actors still finalize
        if let Err(task) = self.dispatcher.execute(Box::new(move || cell.drain())) {
            task();
        }
    }

    fn needs_drain(&self) -> bool {
        let state = self.lifecycle();
        if state.is_stopped() {
            return !self.finalized.load(Ordering::SeqCst);
        }
        state.is_deliverable() && self.mailbox.pending_messages() > 0
    }

    fn drain(self: &Arc<Self>) {
        if self
            .delivering
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        for _ in 0..self.throughput {
            let state = self.lifecycle();
            if state.is_stopped() {
                self.finalize();
                break;
            }
            if !state.is_deliverable() {
                break;
            }
            match self.mailbox.receive() {
                Some(message) => self.run(message),
                None => break,
            }
        }

        self.delivering.store(false, Ordering::SeqCst);
        fence(Ordering::SeqCst);
        if self.needs_drain() {
            self.schedule();
        }
    }

    fn run(self: &Arc<Self>, message: Message<A>) {
        let representation = message.representation();
        let (operation, completion) = message.into_parts();
        let Some(operation) = operation else {
            return;
        };

        let outcome = {
            let mut slot = self.slot.lock();
            let Slot { actor, context } = &mut *slot;
            match actor.as_mut() {
                Some(actor) => {
                    let span = debug_span!(
                        "deliver",
                        actor = %self.address,
                        logger = %context.logger().name(),
                        representation
                    );
                    let _entered = span.enter();
                    let outcome = guarded(|| operation(actor, context));
                    // a panicking ask leaves its completion behind
                    context.withdraw_answer();
                    Some(outcome)
                }
                None => None,
            }
        };

        match outcome {
            Some(Ok(())) => {
                let _ = self.state.compare_exchange(
                    LifeCycleState::Started as u8,
                    LifeCycleState::Active as u8,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                );
            }
            Some(Err(cause)) => {
                self.fail(
                    Failure::new(self.address.clone(), representation, cause),
                    completion,
                );
            }
            None => {
                if let Some(completion) = completion {
                    completion.fail(ActorError::delivery_to_stopped(&self.address, representation));
                }
                self.dead_letter(representation);
            }
        }
    }

    /// Suspend and report to the supervisor; without one the actor stops
    fn fail(self: &Arc<Self>, failure: Failure, completion: Option<Box<dyn PendingCompletion>>) {
        warn!(
            actor = %self.address,
            representation = failure.representation(),
            error = %failure.cause(),
            "Actor failed"
        );
        if let Some(completion) = completion {
            completion.fail(ActorError::supervision_failure(
                &self.address,
                failure.representation(),
                failure.cause(),
            ));
        }

        let suspended = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                LifeCycleState::from_u8(state)
                    .is_deliverable()
                    .then_some(LifeCycleState::Suspended as u8)
            })
            .is_ok();
        if !suspended {
            return;
        }

        let node: Arc<dyn ActorNode> = Arc::clone(self) as Arc<dyn ActorNode>;
        match &self.supervisor {
            Some(supervisor) if !supervisor.handle().is_stopped() => {
                let handler = Some(supervisor.address().clone());
                supervisor.inform(failure.clone(), Supervised::new(node, failure, handler));
            }
            _ => {
                warn!(actor = %self.address, "No supervisor available; stopping failed actor");
                self.stop();
            }
        }
    }

    fn finalize(&self) {
        if self.finalized.swap(true, Ordering::SeqCst) {
            return;
        }

        let hook = {
            let mut slot = self.slot.lock();
            let Slot { actor, context } = &mut *slot;
            actor
                .take()
                .map(|mut actor| guarded(|| actor.after_stop(context)))
        };
        if let Some(Err(cause)) = hook {
            warn!(actor = %self.address, error = %cause, "after_stop failed");
        }

        let mut undelivered = 0usize;
        while let Some(message) = self.mailbox.receive() {
            self.reject_to_dead_letters(message);
            undelivered += 1;
        }

        self.state.store(LifeCycleState::Stopped as u8, Ordering::SeqCst);
        self.children.lock().clear();
        if self.registered.load(Ordering::SeqCst) {
            self.stage.actor_finalized();
        }
        debug!(actor = %self.address, undelivered, "Actor stopped");
    }

    fn reschedule(&self) {
        if let Some(me) = self.me.upgrade() {
            me.schedule();
        }
    }
}

impl<A: Actor> ActorNode for ActorCell<A> {
    fn address(&self) -> &Address {
        &self.address
    }

    fn lifecycle(&self) -> LifeCycleState {
        LifeCycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn stop(&self) {
        let stopping = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                (state < LifeCycleState::Stopping as u8).then_some(LifeCycleState::Stopping as u8)
            })
            .is_ok();
        if !stopping {
            return;
        }

        if self.registered.load(Ordering::SeqCst) {
            self.stage.directory().remove(&self.address);
        }
        self.mailbox.close();

        let children = std::mem::take(&mut *self.children.lock());
        for child in children {
            child.stop();
        }
        if let Some(parent) = ActorNode::parent(self) {
            parent.remove_child(&self.address);
        }

        debug!(actor = %self.address, "Actor stopping");
        self.reschedule();
    }

    fn resume(&self) {
        let resumed = self
            .state
            .compare_exchange(
                LifeCycleState::Suspended as u8,
                LifeCycleState::Active as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if resumed {
            debug!(actor = %self.address, "Actor resumed");
            self.reschedule();
        }
    }

    fn restart(&self, failure: &Failure) {
        if self.lifecycle().is_stopped() {
            return;
        }

        let restarted = {
            let mut slot = self.slot.lock();
            let Slot { actor, context } = &mut *slot;

            if let Some(failed) = actor.as_mut() {
                if let Err(cause) = guarded(|| failed.before_restart(context, failure)) {
                    warn!(actor = %self.address, error = %cause, "before_restart failed");
                }
            }
            *actor = None;

            let children = std::mem::take(&mut *self.children.lock());
            for child in children {
                child.stop();
            }

            let instantiator = Arc::clone(&self.instantiator);
            match guarded(|| instantiator(context)) {
                Ok(mut fresh) => {
                    if let Err(cause) = guarded(|| fresh.after_restart(context, failure)) {
                        warn!(actor = %self.address, error = %cause, "after_restart failed");
                    }
                    *actor = Some(fresh);
                    true
                }
                Err(cause) => {
                    error!(actor = %self.address, error = %cause, "Restart failed to instantiate actor");
                    false
                }
            }
        };

        if restarted {
            info!(actor = %self.address, cause = %failure, "Actor restarted");
            self.resume();
        } else {
            self.stop();
        }
    }

    fn permit_restart(&self, intensity: u32, period: Duration) -> bool {
        self.restarts.lock().permit(intensity, period)
    }

    fn pending_messages(&self) -> usize {
        self.mailbox.pending_messages()
    }

    fn parent(&self) -> Option<Arc<dyn ActorNode>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    fn children(&self) -> Vec<Arc<dyn ActorNode>> {
        self.children.lock().clone()
    }

    fn add_child(&self, child: Arc<dyn ActorNode>) {
        if self.lifecycle().is_stopped() {
            child.stop();
            return;
        }
        self.children.lock().push(child);
    }

    fn remove_child(&self, address: &Address) {
        self.children
            .lock()
            .retain(|child| child.address() != address);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Typed proxy over a cell for one of the protocols its behavior implements
pub(crate) fn proxy_for<X, A>(cell: &Arc<ActorCell<A>>) -> X
where
    A: Actor,
    X: ProtocolProxy,
    X::Protocol: Implements<A>,
{
    X::from_handle(Handle::new(Arc::new(
        Binding::<A, X::Protocol>::new(Arc::clone(cell)),
    )))
}

/// Like [`proxy_for`], starting from a type-erased node. `None` when the
/// node's behavior is not `A`.
pub(crate) fn proxy_from_node<X, A>(node: Arc<dyn ActorNode>) -> Option<X>
where
    A: Actor,
    X: ProtocolProxy,
    X::Protocol: Implements<A>,
{
    let cell = node.into_any().downcast::<ActorCell<A>>().ok()?;
    Some(proxy_for::<X, A>(&cell))
}
