//! In-Process Actor Runtime
//!
//! Isolated actors communicate only through asynchronous messages queued on
//! per-actor mailboxes. Typed protocol proxies turn method calls into
//! deferred operations; supervisors decide what happens when one fails.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── World ─────────────────────────────┐
//! │  dispatcher (tokio workers) · address factory · registries     │
//! │                                                                │
//! │  ┌──────────── Stage ────────────┐   ┌───── Stage ─────┐       │
//! │  │ Directory        Scheduler    │   │       ...       │       │
//! │  │                               │   └─────────────────┘       │
//! │  │ #private ─┬─ #public ─┬─ user actors                        │
//! │  │           └─ #deadLetters                                   │
//! │  └───────────────────────────────┘                             │
//! └────────────────────────────────────────────────────────────────┘
//!
//!  proxy.op(args) ──► Message ──► Mailbox ──► drain on a worker ──► behavior
//!                                   │                                │
//!                      stopped? ──► DeadLetters        Err/panic ──► Supervisor
//! ```
//!
//! # Guarantees
//!
//! - Messages from one sender to one actor execute in send order
//! - One actor never executes two messages at once, whatever the worker count
//! - Sends to stopped actors never raise: they are dead-lettered once, and an
//!   `ask` hands back an already failed [`Completes`]
//! - Failures stay inside the actor and are resolved by its supervisor
//!
//! # Example
//!
//! ```ignore
//! use actors::{protocol, Actor, ActorContext, ActorResult, Definition, World};
//!
//! protocol! {
//!     pub trait Counter {
//!         fn increment(&mut self, ctx: &mut ActorContext) -> ActorResult<()>;
//!         fn total(&mut self, ctx: &mut ActorContext) -> ActorResult<u64>;
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Tally(u64);
//!
//! impl Actor for Tally {}
//!
//! impl Counter for Tally {
//!     fn increment(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//!
//!     fn total(&mut self, _ctx: &mut ActorContext) -> ActorResult<u64> {
//!         Ok(self.0)
//!     }
//! }
//!
//! let world = World::start_with_defaults("counting")?;
//! let counter: CounterProxy = world.actor_for(Definition::has(|_| Ok(Tally::default())))?;
//! counter.increment();
//! assert_eq!(counter.total().await_timeout(Duration::from_secs(1))?, 1);
//! world.terminate();
//! ```

pub mod actor;
pub mod address;
mod cell;
pub mod completes;
pub mod dead_letters;
pub mod definition;
pub mod directory;
pub mod dispatcher;
pub mod error;
mod handle;
pub mod logging;
pub mod mailbox;
pub mod message;
pub mod protocol;
mod roots;
pub mod routing;
pub mod scheduler;
pub mod stage;
pub mod supervision;
pub mod world;

pub use actor::{Actor, ActorContext, ActorRef, LifeCycleState};
pub use address::{Address, AddressFactory};
pub use completes::Completes;
pub use dead_letters::{DeadLetter, DeadLetters, DeadLettersListener, DeadLettersProxy};
pub use definition::Definition;
pub use directory::Directory;
pub use error::{ActorError, ActorResult, Result};
pub use handle::Handle;
pub use logging::Logger;
pub use mailbox::{Mailbox, MailboxKind};
pub use protocol::{Binder, Implements, Protocol, ProtocolProxy, ProtocolSet};
pub use routing::{
    BroadcastRoutingStrategy, RandomRoutingStrategy, RoundRobinRoutingStrategy, Routee,
    RouteeStatus, Router, RouterSpecification, Routing, RoutingStrategy,
    SmallestMailboxRoutingStrategy,
};
pub use scheduler::{Cancellable, Scheduler};
pub use stage::Stage;
pub use supervision::{
    Directive, DirectiveSupervisor, Failure, SupervisionScope, SupervisionStrategy, Supervised,
    Supervisor, SupervisorProxy,
};
pub use world::World;

pub use actors_config::ActorsConfig;

#[doc(hidden)]
pub use paste;
