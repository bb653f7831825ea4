//! Stages
//!
//! A stage is a named actor factory owning one [`Directory`] and one
//! [`Scheduler`]. Creation resolves the definition against world defaults
//! (mailbox provider, parent, supervisor, logger), instantiates the
//! behavior, registers the actor and runs `before_start`.
//!
//! Stopping a stage stops every actor it owns, waits a bounded time for
//! their `after_stop` hooks to finish, then closes the scheduler.

use crate::actor::{Actor, ActorRef};
use crate::address::{Address, AddressFactory};
use crate::cell::{self, ActorCell, ActorNode, CellSpec};
use crate::dead_letters::DeadLetter;
use crate::definition::Definition;
use crate::directory::Directory;
use crate::dispatcher::Dispatcher;
use crate::error::{ActorError, Result};
use crate::protocol::{Binder, Implements, Protocol, ProtocolProxy, ProtocolSet};
use crate::scheduler::Scheduler;
use crate::supervision::SupervisorProxy;
use crate::world::{World, WorldInner};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct Stage {
    inner: Arc<StageInner>,
}

struct StageInner {
    name: String,
    world: Weak<WorldInner>,
    directory: Directory<Arc<dyn ActorNode>>,
    scheduler: Scheduler,
    common_supervisors: DashMap<TypeId, SupervisorProxy>,
    stopped: AtomicBool,
    /// Registered actors not yet finalized
    live: AtomicUsize,
    throughput: usize,
    shutdown_retries: u32,
    shutdown_interval: Duration,
}

impl Stage {
    pub(crate) fn new(name: &str, world: &Arc<WorldInner>) -> Self {
        let config = world.config();
        debug!(stage = name, "Stage created");
        Self {
            inner: Arc::new(StageInner {
                name: name.to_string(),
                world: Arc::downgrade(world),
                directory: Directory::new(),
                scheduler: Scheduler::configured(name, world.dispatcher().handle(), &config.completes),
                common_supervisors: DashMap::new(),
                stopped: AtomicBool::new(false),
                live: AtomicUsize::new(0),
                throughput: config.dispatcher.throughput,
                shutdown_retries: config.stage.shutdown_retries,
                shutdown_interval: config.stage.shutdown_interval(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn world(&self) -> Option<World> {
        World::from_inner(self.inner.world.upgrade()?)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Registered actors of this stage
    pub fn count(&self) -> usize {
        self.inner.directory.count()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.inner.directory.addresses()
    }

    /// Log every registered actor at debug level
    pub fn dump(&self) {
        debug!(stage = %self.inner.name, actors = self.count(), "Stage directory");
        for actor in self.inner.directory.actors() {
            debug!(
                stage = %self.inner.name,
                actor = %actor.address(),
                lifecycle = ?actor.lifecycle(),
                pending = actor.pending_messages(),
                "  actor"
            );
        }
    }

    pub fn actor_for<X, A>(&self, definition: Definition<A>) -> Result<X>
    where
        A: Actor,
        X: ProtocolProxy,
        X::Protocol: Implements<A>,
    {
        let cell = self.create(definition, None, TypeId::of::<X>())?;
        Ok(cell::proxy_for::<X, A>(&cell))
    }

    /// One actor, several protocol proxies: `S` is a tuple of 2 to 5 proxies
    pub fn actor_for_protocols<S, A>(&self, definition: Definition<A>) -> Result<S>
    where
        A: Actor,
        S: ProtocolSet<A>,
    {
        let cell = self.create(definition, None, S::primary())?;
        Ok(S::bind(&Binder::new(cell)))
    }

    /// Create at a caller-chosen address
    pub fn actor_for_at<X, A>(&self, definition: Definition<A>, address: Address) -> Result<X>
    where
        A: Actor,
        X: ProtocolProxy,
        X::Protocol: Implements<A>,
    {
        let cell = self.create(definition, Some(address), TypeId::of::<X>())?;
        Ok(cell::proxy_for::<X, A>(&cell))
    }

    /// Typed lookup; `None` when nothing live is registered at `address` or
    /// its behavior is not `A`
    pub fn actor_of<X, A>(&self, address: &Address) -> Option<X>
    where
        A: Actor,
        X: ProtocolProxy,
        X::Protocol: Implements<A>,
    {
        let node = self.inner.directory.lookup(address)?;
        cell::proxy_from_node::<X, A>(node)
    }

    /// Supervisor for actors created on this stage whose primary protocol is `X`
    pub fn register_common_supervisor<X: ProtocolProxy>(&self, supervisor: SupervisorProxy) {
        debug!(
            stage = %self.inner.name,
            protocol = <X::Protocol as Protocol>::NAME,
            supervisor = %supervisor.address(),
            "Common supervisor registered"
        );
        self.inner
            .common_supervisors
            .insert(TypeId::of::<X>(), supervisor);
    }

    /// Stop every actor on this stage, then close its scheduler. Idempotent.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(stage = %self.inner.name, actors = self.count(), "Stopping stage");

        // the private root takes the public root, dead letters and every
        // default-parented actor down depth first
        if let Some(root) = self.inner.directory.lookup(&AddressFactory::private_root()) {
            root.stop();
        }
        for actor in self.inner.directory.actors() {
            actor.stop();
        }

        let mut retries = 0;
        while self.inner.live.load(Ordering::SeqCst) > 0 && retries < self.inner.shutdown_retries {
            thread::sleep(self.inner.shutdown_interval);
            retries += 1;
        }
        let remaining = self.inner.live.load(Ordering::SeqCst);
        if remaining > 0 {
            warn!(stage = %self.inner.name, remaining, "Stage stopped before all actors finalized");
        }

        self.inner.scheduler.close();
        info!(stage = %self.inner.name, "Stage stopped");
    }

    pub(crate) fn directory(&self) -> &Directory<Arc<dyn ActorNode>> {
        &self.inner.directory
    }

    pub(crate) fn actor_finalized(&self) {
        let _ = self
            .inner
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| live.checked_sub(1));
    }

    /// Route an undeliverable message to the world's dead letters
    pub(crate) fn dead_letter(&self, dead_letter: DeadLetter) {
        let sink = self
            .inner
            .world
            .upgrade()
            .and_then(|world| world.roots().map(|roots| roots.dead_letters.clone()));
        match sink {
            Some(sink)
                if !sink.handle().is_stopped() && sink.address() != dead_letter.address() =>
            {
                sink.failed_delivery(dead_letter);
            }
            _ => debug!(
                actor = %dead_letter.address(),
                representation = dead_letter.representation(),
                "Dead letter dropped; dead letters unavailable"
            ),
        }
    }

    pub(crate) fn create<A: Actor>(
        &self,
        definition: Definition<A>,
        address: Option<Address>,
        primary: TypeId,
    ) -> Result<Arc<ActorCell<A>>> {
        if self.is_stopped() {
            return Err(ActorError::stage_stopped(self.inner.name.clone()));
        }
        let world = self
            .inner
            .world
            .upgrade()
            .ok_or_else(|| ActorError::stage_stopped(self.inner.name.clone()))?;
        if world.is_terminated() {
            return Err(ActorError::world_terminated(world.name().to_string()));
        }

        let address = match address {
            Some(address) => address,
            None => world.address_factory().unique_with(definition.actor_name())?,
        };
        if self.inner.directory.is_registered(&address) {
            return Err(ActorError::duplicate_address(&address));
        }

        let (mailbox_name, mailbox_kind) = world.mailboxes().resolve(definition.mailbox_name());
        let roots = world.roots();
        let parent: Option<ActorRef> = definition
            .parent()
            .cloned()
            .or_else(|| roots.map(|roots| roots.public_root.handle().actor()));
        let supervisor = definition
            .supervisor()
            .cloned()
            .or_else(|| {
                self.inner
                    .common_supervisors
                    .get(&primary)
                    .map(|entry| entry.value().clone())
            })
            .or_else(|| world.default_supervisor());
        let logger = definition
            .logger()
            .cloned()
            .unwrap_or_else(|| world.loggers().default_logger());
        let dispatcher: Arc<dyn Dispatcher> = world.dispatcher().clone();

        let cell = ActorCell::new(CellSpec {
            address: address.clone(),
            stage: self.clone(),
            mailbox: mailbox_kind.create::<A>(),
            dispatcher,
            throughput: self.inner.throughput,
            parent: parent.clone(),
            supervisor,
            logger,
            instantiator: Arc::clone(definition.instantiator()),
        });

        if let Err(cause) = cell.instantiate() {
            cell.discard();
            let failure = ActorError::instantiation_failed(&address, cause);
            error!(actor = %address, stage = %self.inner.name, error = %failure, "Actor instantiation failed");
            return Err(failure);
        }

        let node: Arc<dyn ActorNode> = Arc::clone(&cell) as Arc<dyn ActorNode>;
        if let Err(duplicate) = self.inner.directory.register(address.clone(), Arc::clone(&node)) {
            cell.discard();
            return Err(duplicate);
        }
        cell.mark_registered();
        self.inner.live.fetch_add(1, Ordering::SeqCst);
        if let Some(parent) = parent {
            parent.node().add_child(node);
        }
        // a stop that began after the entry check has already swept the directory
        if self.is_stopped() {
            ActorNode::stop(&*cell);
            return Err(ActorError::stage_stopped(self.inner.name.clone()));
        }

        debug!(
            actor = %address,
            stage = %self.inner.name,
            mailbox = %mailbox_name,
            "Actor created"
        );
        cell.start();
        Ok(cell)
    }
}

impl PartialEq for Stage {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Stage {}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.inner.name)
            .field("actors", &self.count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
