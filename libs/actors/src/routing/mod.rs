//! Routers
//!
//! A [`Router`] lives inside a routing actor's state. It is built in that
//! actor's instantiator from a [`RouterSpecification`], which creates a
//! fixed pool of identical worker actors as children. Each incoming message
//! is handed to [`Router::compute_routing`], whose [`RoutingStrategy`]
//! selects the routees that receive it.
//!
//! ```ignore
//! impl Work for Dispatch {
//!     fn submit(&mut self, _ctx: &mut ActorContext, job: u64) -> ActorResult<()> {
//!         for worker in self.router.compute_routing(&job).routees() {
//!             worker.submit(job);
//!         }
//!         Ok(())
//!     }
//! }
//! ```

pub mod strategy;

pub use strategy::{
    BroadcastRoutingStrategy, RandomRoutingStrategy, RoundRobinRoutingStrategy, RouteeStatus,
    RoutingStrategy, SmallestMailboxRoutingStrategy,
};

use crate::actor::{Actor, ActorContext, ActorRef};
use crate::address::Address;
use crate::definition::Definition;
use crate::error::{ActorError, Result};
use crate::protocol::{Implements, ProtocolProxy};
use std::any::Any;
use tracing::debug;

/// Pool size and worker definition for a router
pub struct RouterSpecification<A: Actor> {
    pool_size: usize,
    definition: Definition<A>,
}

impl<A: Actor> RouterSpecification<A> {
    pub fn new(pool_size: usize, definition: Definition<A>) -> Self {
        Self {
            pool_size,
            definition,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }
}

/// One pooled worker
pub struct Routee<X> {
    proxy: X,
    actor: ActorRef,
}

impl<X: ProtocolProxy> Routee<X> {
    pub fn proxy(&self) -> &X {
        &self.proxy
    }

    pub fn address(&self) -> &Address {
        self.actor.address()
    }

    pub fn pending_messages(&self) -> usize {
        self.actor.pending_messages()
    }

    pub fn is_stopped(&self) -> bool {
        self.actor.is_stopped()
    }
}

/// Routees selected for one message
pub struct Routing<'a, X> {
    selected: Vec<&'a Routee<X>>,
}

impl<'a, X: ProtocolProxy> Routing<'a, X> {
    pub fn routees(&self) -> impl Iterator<Item = &'a X> + '_ {
        self.selected.iter().copied().map(|routee| &routee.proxy)
    }

    pub fn first(&self) -> Option<&'a X> {
        self.selected.first().copied().map(|routee| &routee.proxy)
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.selected
            .iter()
            .map(|routee| routee.address().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

pub struct Router<X: ProtocolProxy> {
    routees: Vec<Routee<X>>,
    strategy: Box<dyn RoutingStrategy>,
}

impl<X: ProtocolProxy> Router<X> {
    /// Create the pool as children of the routing actor owning `ctx`
    pub fn new<A, S>(ctx: &ActorContext, specification: RouterSpecification<A>, strategy: S) -> Result<Self>
    where
        A: Actor,
        X::Protocol: Implements<A>,
        S: RoutingStrategy + 'static,
    {
        if specification.pool_size == 0 {
            return Err(ActorError::configuration(
                "router pool must hold at least one routee",
                Some("pool_size"),
            ));
        }

        let mut routees = Vec::with_capacity(specification.pool_size);
        for _ in 0..specification.pool_size {
            let proxy: X = ctx.child_actor_for(specification.definition.clone())?;
            let actor = proxy.handle().actor();
            routees.push(Routee { proxy, actor });
        }
        debug!(
            router = %ctx.address(),
            pool = routees.len(),
            strategy = strategy.name(),
            "Router pool created"
        );

        Ok(Self {
            routees,
            strategy: Box::new(strategy),
        })
    }

    /// Select routees for `message`; stopped routees are never chosen
    pub fn compute_routing<M: Any>(&mut self, message: &M) -> Routing<'_, X> {
        let statuses: Vec<RouteeStatus> = self
            .routees
            .iter()
            .enumerate()
            .filter(|(_, routee)| !routee.is_stopped())
            .map(|(index, routee)| RouteeStatus {
                index,
                address: routee.address().clone(),
                pending_messages: routee.pending_messages(),
            })
            .collect();
        let chosen = self.strategy.choose(message, &statuses);
        Routing {
            selected: chosen
                .into_iter()
                .filter_map(|index| self.routees.get(index))
                .collect(),
        }
    }

    pub fn routees(&self) -> &[Routee<X>] {
        &self.routees
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}
