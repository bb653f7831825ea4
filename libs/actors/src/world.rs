//! World
//!
//! The root context of a runtime instance. Starting a world builds, in
//! order: the worker dispatcher, the address factory, logger and mailbox
//! registries, the default stage, and the three reserved actors (private
//! root, public root, dead letters).
//!
//! `World` handles are cheap clones over shared state. [`World::terminate`]
//! stops every stage and shuts the workers down; it is idempotent, and a
//! world whose last handle drops without it is terminated implicitly.

use crate::actor::Actor;
use crate::address::{
    AddressFactory, DEAD_LETTERS_NAME, PRIVATE_ROOT_NAME, PUBLIC_ROOT_NAME,
};
use crate::dead_letters::{DeadLettersActor, DeadLettersProxy};
use crate::definition::Definition;
use crate::dispatcher::{Dispatcher, RuntimeDispatcher};
use crate::error::{ActorError, Result};
use crate::logging::{Logger, LoggerRegistry};
use crate::mailbox::{MailboxKind, MailboxRegistry};
use crate::protocol::{Implements, ProtocolProxy, ProtocolSet};
use crate::roots::{PrivateRootActor, PublicRootActor};
use crate::stage::Stage;
use crate::supervision::{SupervisionStrategy, Supervisor, SupervisorProxy};
use actors_config::{defaults, ActorsConfig};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Reserved actors every world bootstraps
pub(crate) struct Roots {
    pub(crate) private_root: SupervisorProxy,
    pub(crate) public_root: SupervisorProxy,
    pub(crate) dead_letters: DeadLettersProxy,
}

pub(crate) struct WorldInner {
    id: Uuid,
    name: String,
    config: ActorsConfig,
    address_factory: AddressFactory,
    dispatcher: Arc<RuntimeDispatcher>,
    loggers: LoggerRegistry,
    mailboxes: MailboxRegistry,
    stages: DashMap<String, Stage>,
    dynamic: DashMap<String, Arc<dyn Any + Send + Sync>>,
    roots: OnceCell<Arc<Roots>>,
    default_supervisor: RwLock<Option<SupervisorProxy>>,
    terminated: AtomicBool,
}

impl WorldInner {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn config(&self) -> &ActorsConfig {
        &self.config
    }

    pub(crate) fn address_factory(&self) -> &AddressFactory {
        &self.address_factory
    }

    pub(crate) fn dispatcher(&self) -> &Arc<RuntimeDispatcher> {
        &self.dispatcher
    }

    pub(crate) fn loggers(&self) -> &LoggerRegistry {
        &self.loggers
    }

    pub(crate) fn mailboxes(&self) -> &MailboxRegistry {
        &self.mailboxes
    }

    pub(crate) fn roots(&self) -> Option<&Arc<Roots>> {
        self.roots.get()
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Registered override, else the public root
    pub(crate) fn default_supervisor(&self) -> Option<SupervisorProxy> {
        self.default_supervisor
            .read()
            .clone()
            .or_else(|| self.roots().map(|roots| roots.public_root.clone()))
    }

    fn stage_named(inner: &Arc<WorldInner>, name: &str) -> Stage {
        inner
            .stages
            .entry(name.to_string())
            .or_insert_with(|| Stage::new(name, inner))
            .clone()
    }

    fn shutdown(&self) {
        let stages: Vec<Stage> = self.stages.iter().map(|entry| entry.value().clone()).collect();
        for stage in stages.iter().filter(|s| s.name() != defaults::stage::DEFAULT_STAGE) {
            stage.stop();
        }
        for stage in stages.iter().filter(|s| s.name() == defaults::stage::DEFAULT_STAGE) {
            stage.stop();
        }
        self.dispatcher.close();
    }
}

impl Drop for WorldInner {
    fn drop(&mut self) {
        if !self.terminated.swap(true, Ordering::SeqCst) {
            debug!(world = %self.name, "World dropped without terminate; shutting down");
            self.shutdown();
        }
    }
}

#[derive(Clone)]
pub struct World {
    inner: Arc<WorldInner>,
    roots: Arc<Roots>,
}

impl World {
    pub fn start(name: &str, config: ActorsConfig) -> Result<World> {
        config
            .validate()
            .map_err(|invalid| ActorError::configuration(invalid.message.clone(), Some(invalid.field)))?;

        let dispatcher = Arc::new(RuntimeDispatcher::new(&config.dispatcher)?);
        let loggers = LoggerRegistry::new(&config.logging.default_logger);
        let mailboxes = MailboxRegistry::from_config(&config.mailbox);
        let inner = Arc::new(WorldInner {
            id: Uuid::new_v4(),
            name: name.to_string(),
            address_factory: AddressFactory::new(),
            dispatcher,
            loggers,
            mailboxes,
            stages: DashMap::new(),
            dynamic: DashMap::new(),
            roots: OnceCell::new(),
            default_supervisor: RwLock::new(None),
            terminated: AtomicBool::new(false),
            config,
        });

        let stage = WorldInner::stage_named(&inner, defaults::stage::DEFAULT_STAGE);
        let roots = Self::bootstrap(&inner, &stage)?;
        let _ = inner.roots.set(Arc::clone(&roots));

        info!(
            world = name,
            id = %inner.id,
            workers = inner.config.dispatcher.worker_threads,
            "World started"
        );
        Ok(World { inner, roots })
    }

    pub fn start_with_defaults(name: &str) -> Result<World> {
        Self::start(name, ActorsConfig::default())
    }

    fn bootstrap(inner: &Arc<WorldInner>, stage: &Stage) -> Result<Arc<Roots>> {
        let private_root: SupervisorProxy = stage.actor_for_at(
            Definition::has(|_| Ok(PrivateRootActor)).named(PRIVATE_ROOT_NAME),
            AddressFactory::private_root(),
        )?;
        let root = private_root.handle().actor();

        let strategy = SupervisionStrategy::from_config(&inner.config.supervision);
        let public_root: SupervisorProxy = stage.actor_for_at(
            Definition::has(move |_| Ok(PublicRootActor::new(strategy)))
                .named(PUBLIC_ROOT_NAME)
                .with_parent(root.clone())
                .with_supervisor(private_root.clone()),
            AddressFactory::public_root(),
        )?;

        let dead_letters: DeadLettersProxy = stage.actor_for_at(
            Definition::has(|_| Ok(DeadLettersActor::default()))
                .named(DEAD_LETTERS_NAME)
                .with_parent(root)
                .with_supervisor(private_root.clone()),
            AddressFactory::dead_letters(),
        )?;

        Ok(Arc::new(Roots {
            private_root,
            public_root,
            dead_letters,
        }))
    }

    pub(crate) fn from_inner(inner: Arc<WorldInner>) -> Option<World> {
        let roots = Arc::clone(inner.roots()?);
        Some(World { inner, roots })
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_terminated() {
            return Err(ActorError::world_terminated(self.inner.name.clone()));
        }
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &ActorsConfig {
        &self.inner.config
    }

    pub fn address_factory(&self) -> &AddressFactory {
        &self.inner.address_factory
    }

    /// Create an actor on the default stage
    pub fn actor_for<X, A>(&self, definition: Definition<A>) -> Result<X>
    where
        A: Actor,
        X: ProtocolProxy,
        X::Protocol: Implements<A>,
    {
        self.ensure_running()?;
        self.stage().actor_for(definition)
    }

    pub fn actor_for_protocols<S, A>(&self, definition: Definition<A>) -> Result<S>
    where
        A: Actor,
        S: ProtocolSet<A>,
    {
        self.ensure_running()?;
        self.stage().actor_for_protocols(definition)
    }

    pub fn dead_letters(&self) -> DeadLettersProxy {
        self.roots.dead_letters.clone()
    }

    pub fn stage(&self) -> Stage {
        WorldInner::stage_named(&self.inner, defaults::stage::DEFAULT_STAGE)
    }

    /// The stage called `name`, created on first use
    pub fn stage_named(&self, name: &str) -> Stage {
        WorldInner::stage_named(&self.inner, name)
    }

    pub fn default_logger(&self) -> Logger {
        self.inner.loggers.default_logger()
    }

    pub fn logger(&self, name: &str) -> Option<Logger> {
        self.inner.loggers.logger(name)
    }

    pub fn register_logger(&self, name: &str, is_default: bool) -> Logger {
        self.inner.loggers.register(name, is_default)
    }

    pub fn register_mailbox_provider(&self, name: &str, kind: MailboxKind, is_default: bool) {
        self.inner.mailboxes.register(name, kind, is_default);
    }

    /// Create supervisor `S` on `stage_name` and make it the common
    /// supervisor there for actors whose primary protocol is `X`
    pub fn register_common_supervisor<X, S>(
        &self,
        stage_name: &str,
        name: &str,
        definition: Definition<S>,
    ) -> Result<()>
    where
        X: ProtocolProxy,
        S: Supervisor + Actor,
    {
        self.ensure_running()?;
        let stage = self.stage_named(stage_name);
        let supervisor: SupervisorProxy = stage.actor_for(definition.named(name))?;
        stage.register_common_supervisor::<X>(supervisor);
        Ok(())
    }

    /// Create supervisor `S` on `stage_name` and use it in place of the
    /// public root for actors with no other supervisor
    pub fn register_default_supervisor<S>(
        &self,
        stage_name: &str,
        name: &str,
        definition: Definition<S>,
    ) -> Result<()>
    where
        S: Supervisor + Actor,
    {
        self.ensure_running()?;
        let supervisor: SupervisorProxy = self
            .stage_named(stage_name)
            .actor_for(definition.named(name))?;
        info!(world = %self.inner.name, supervisor = %supervisor.address(), "Default supervisor registered");
        *self.inner.default_supervisor.write() = Some(supervisor);
        Ok(())
    }

    pub fn default_supervisor(&self) -> SupervisorProxy {
        self.inner
            .default_supervisor()
            .unwrap_or_else(|| self.roots.public_root.clone())
    }

    /// Share a value by name with every actor of this world
    pub fn register_dynamic<T: Any + Send + Sync>(&self, name: &str, value: Arc<T>) {
        self.inner.dynamic.insert(name.to_string(), value);
    }

    /// `None` when nothing is registered under `name` or it is not a `T`
    pub fn resolve_dynamic<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let value = self.inner.dynamic.get(name)?.value().clone();
        value.downcast::<T>().ok()
    }

    /// Stop all stages (the default stage last) and shut the workers down
    pub fn terminate(&self) {
        if self.inner.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(world = %self.inner.name, "Terminating world");
        self.inner.shutdown();
        info!(world = %self.inner.name, "World terminated");
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated() || self.inner.dispatcher.is_closed()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("stages", &self.inner.stages.len())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
