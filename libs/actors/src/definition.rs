//! Actor Definitions
//!
//! A [`Definition`] says how to build an actor: the instantiator closure
//! (re-run on restart) plus optional name, mailbox provider, parent,
//! supervisor and logger overrides. Anything left unset resolves to the
//! stage and world defaults at creation.

use crate::actor::{Actor, ActorContext, ActorRef};
use crate::error::ActorResult;
use crate::logging::Logger;
use crate::supervision::SupervisorProxy;
use std::fmt;
use std::sync::Arc;

/// Builds a fresh behavior; called once at creation and again on restart
pub type Instantiator<A> = Arc<dyn Fn(&mut ActorContext) -> ActorResult<A> + Send + Sync>;

pub struct Definition<A> {
    instantiator: Instantiator<A>,
    actor_name: Option<String>,
    mailbox_name: Option<String>,
    parent: Option<ActorRef>,
    supervisor: Option<SupervisorProxy>,
    logger: Option<Logger>,
}

impl<A: Actor> Definition<A> {
    pub fn has<F>(instantiator: F) -> Self
    where
        F: Fn(&mut ActorContext) -> ActorResult<A> + Send + Sync + 'static,
    {
        Self {
            instantiator: Arc::new(instantiator),
            actor_name: None,
            mailbox_name: None,
            parent: None,
            supervisor: None,
            logger: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.actor_name = Some(name.into());
        self
    }

    /// Registered mailbox provider name; unknown names fall back to the default
    pub fn with_mailbox(mut self, name: impl Into<String>) -> Self {
        self.mailbox_name = Some(name.into());
        self
    }

    pub fn with_parent(mut self, parent: ActorRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_supervisor(mut self, supervisor: SupervisorProxy) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn actor_name(&self) -> Option<&str> {
        self.actor_name.as_deref()
    }

    pub fn mailbox_name(&self) -> Option<&str> {
        self.mailbox_name.as_deref()
    }

    pub fn parent(&self) -> Option<&ActorRef> {
        self.parent.as_ref()
    }

    pub fn supervisor(&self) -> Option<&SupervisorProxy> {
        self.supervisor.as_ref()
    }

    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }

    pub(crate) fn instantiator(&self) -> &Instantiator<A> {
        &self.instantiator
    }
}

impl<A> Clone for Definition<A> {
    fn clone(&self) -> Self {
        Self {
            instantiator: Arc::clone(&self.instantiator),
            actor_name: self.actor_name.clone(),
            mailbox_name: self.mailbox_name.clone(),
            parent: self.parent.clone(),
            supervisor: self.supervisor.clone(),
            logger: self.logger.clone(),
        }
    }
}

impl<A> fmt::Debug for Definition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("actor_name", &self.actor_name)
            .field("mailbox_name", &self.mailbox_name)
            .field("parent", &self.parent.as_ref().map(|p| p.address().clone()))
            .field("logger", &self.logger.as_ref().map(|l| l.name().to_string()))
            .finish()
    }
}
