//! Supervision
//!
//! A failing operation suspends its actor and informs the actor's
//! supervisor with the [`Failure`] and a [`Supervised`] handle. The
//! supervisor answers with a [`Directive`]:
//!
//! - `Resume`: continue with the next queued message, state kept
//! - `Restart`: rebuild the behavior from its definition, then resume
//! - `Stop`: stop the actor and its children
//! - `Escalate`: hand the same failure to the supervisor's own supervisor
//!
//! Restarts are bounded by [`SupervisionStrategy`]: more than `intensity`
//! restarts within `period` stops the actor instead.

use crate::actor::{Actor, ActorContext, ActorRef};
use crate::address::Address;
use crate::cell::ActorNode;
use crate::error::ActorResult;
use crate::protocol::ProtocolProxy;
use actors_config::SupervisionConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Directive {
    Resume,
    Restart,
    Stop,
    Escalate,
}

/// Whether a directive applies to the failed actor alone or to all of its siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupervisionScope {
    One,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisionStrategy {
    pub intensity: u32,
    pub period: Duration,
    pub scope: SupervisionScope,
}

impl Default for SupervisionStrategy {
    fn default() -> Self {
        Self::from_config(&SupervisionConfig::default())
    }
}

impl SupervisionStrategy {
    pub fn from_config(config: &SupervisionConfig) -> Self {
        Self {
            intensity: config.intensity,
            period: config.period(),
            scope: SupervisionScope::One,
        }
    }

    pub fn with_scope(mut self, scope: SupervisionScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Error raised by one operation of one actor
#[derive(Clone)]
pub struct Failure {
    address: Address,
    representation: &'static str,
    cause: Arc<anyhow::Error>,
}

impl Failure {
    pub(crate) fn new(address: Address, representation: &'static str, cause: anyhow::Error) -> Self {
        Self {
            address,
            representation,
            cause: Arc::new(cause),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// `name(argTypes)` of the operation that failed
    pub fn representation(&self) -> &'static str {
        self.representation
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {:#}", self.address, self.representation, self.cause)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("address", &self.address)
            .field("representation", &self.representation)
            .field("cause", &format_args!("{:#}", self.cause))
            .finish()
    }
}

/// The failed actor, as seen by its supervisor
#[derive(Clone)]
pub struct Supervised {
    node: Arc<dyn ActorNode>,
    failure: Failure,
    // the supervisor currently handling the failure; never one of its own targets
    handler: Option<Address>,
}

impl Supervised {
    pub(crate) fn new(node: Arc<dyn ActorNode>, failure: Failure, handler: Option<Address>) -> Self {
        Self {
            node,
            failure,
            handler,
        }
    }

    pub fn address(&self) -> &Address {
        self.node.address()
    }

    pub fn actor(&self) -> ActorRef {
        ActorRef::new(Arc::clone(&self.node))
    }

    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    fn targets(&self, scope: SupervisionScope) -> Vec<Arc<dyn ActorNode>> {
        match (scope, self.node.parent()) {
            (SupervisionScope::All, Some(parent)) => {
                let mut siblings = parent.children();
                // the handler runs this directive holding its own cell
                siblings.retain(|s| Some(s.address()) != self.handler.as_ref());
                if !siblings.iter().any(|s| s.address() == self.node.address()) {
                    siblings.push(Arc::clone(&self.node));
                }
                siblings
            }
            _ => vec![Arc::clone(&self.node)],
        }
    }

    pub fn resume(&self, scope: SupervisionScope) {
        for target in self.targets(scope) {
            target.resume();
        }
    }

    /// Restart without counting against any window
    pub fn restart(&self, scope: SupervisionScope) {
        for target in self.targets(scope) {
            target.restart(&self.failure);
        }
    }

    /// Restart while fewer than `intensity` restarts fell within `period`;
    /// past the limit the actor is stopped
    pub fn restart_within(&self, intensity: u32, period: Duration, scope: SupervisionScope) {
        for target in self.targets(scope) {
            if target.permit_restart(intensity, period) {
                target.restart(&self.failure);
            } else {
                warn!(
                    actor = %target.address(),
                    intensity,
                    period_ms = period.as_millis() as u64,
                    "Restart intensity exceeded; stopping actor"
                );
                target.stop();
            }
        }
    }

    pub fn stop(&self, scope: SupervisionScope) {
        for target in self.targets(scope) {
            target.stop();
        }
    }

    /// Forward the failure to the supervisor of the supervisor handling it.
    /// `ctx` is that handling supervisor's context.
    pub fn escalate(&self, ctx: &ActorContext) {
        match ctx.supervisor() {
            Some(next) if !next.handle().is_stopped() => {
                debug!(actor = %self.address(), via = %ctx.address(), "Escalating failure");
                let escalated = Self {
                    handler: Some(next.address().clone()),
                    ..self.clone()
                };
                next.inform(self.failure.clone(), escalated);
            }
            _ => {
                warn!(actor = %self.address(), via = %ctx.address(), "Nowhere to escalate; stopping actor");
                self.node.stop();
            }
        }
    }

    /// Carry out a directive under `strategy`
    pub fn apply(&self, ctx: &ActorContext, directive: Directive, strategy: &SupervisionStrategy) {
        match directive {
            Directive::Resume => self.resume(strategy.scope),
            Directive::Restart => {
                self.restart_within(strategy.intensity, strategy.period, strategy.scope)
            }
            Directive::Stop => self.stop(strategy.scope),
            Directive::Escalate => self.escalate(ctx),
        }
    }
}

impl fmt::Debug for Supervised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervised")
            .field("address", self.node.address())
            .field("failure", &self.failure)
            .finish()
    }
}

crate::protocol! {
    /// Receives the failures of the actors it supervises
    pub trait Supervisor {
        fn inform(&mut self, ctx: &mut ActorContext, failure: Failure, supervised: Supervised) -> ActorResult<()>;
    }
}

/// Restarts counted within a sliding period
#[derive(Debug, Default)]
pub(crate) struct RestartWindow {
    count: u32,
    started: Option<Instant>,
}

impl RestartWindow {
    pub(crate) fn permit(&mut self, intensity: u32, period: Duration) -> bool {
        let now = Instant::now();
        match self.started {
            Some(start) if now.duration_since(start) <= period => {
                self.count += 1;
            }
            _ => {
                self.started = Some(now);
                self.count = 1;
            }
        }
        self.count <= intensity
    }
}

type Decider = Arc<dyn Fn(&Failure) -> Directive + Send + Sync>;

/// Supervisor actor that maps each failure to a directive with a closure
pub struct DirectiveSupervisor {
    strategy: SupervisionStrategy,
    decide: Decider,
}

impl DirectiveSupervisor {
    pub fn new<F>(strategy: SupervisionStrategy, decide: F) -> Self
    where
        F: Fn(&Failure) -> Directive + Send + Sync + 'static,
    {
        Self {
            strategy,
            decide: Arc::new(decide),
        }
    }

    /// Answer every failure with the same directive
    pub fn always(strategy: SupervisionStrategy, directive: Directive) -> Self {
        Self::new(strategy, move |_| directive)
    }
}

impl Actor for DirectiveSupervisor {}

impl Supervisor for DirectiveSupervisor {
    fn inform(
        &mut self,
        ctx: &mut ActorContext,
        failure: Failure,
        supervised: Supervised,
    ) -> ActorResult<()> {
        let directive = (self.decide)(&failure);
        ctx.logger().debug(format!("{} -> {:?}", failure, directive));
        supervised.apply(ctx, directive, &self.strategy);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_window_limits_within_period() {
        let mut window = RestartWindow::default();
        let period = Duration::from_secs(60);
        assert!(window.permit(2, period));
        assert!(window.permit(2, period));
        assert!(!window.permit(2, period));
    }

    #[test]
    fn test_restart_window_resets_after_period() {
        let mut window = RestartWindow::default();
        let period = Duration::from_millis(20);
        assert!(window.permit(1, period));
        assert!(!window.permit(1, period));
        std::thread::sleep(Duration::from_millis(40));
        assert!(window.permit(1, period));
    }

    #[test]
    fn test_default_strategy_follows_config() {
        let strategy = SupervisionStrategy::default();
        assert_eq!(strategy.intensity, 5);
        assert_eq!(strategy.period, Duration::from_secs(60));
        assert_eq!(strategy.scope, SupervisionScope::One);
        assert_eq!(
            strategy.with_scope(SupervisionScope::All).scope,
            SupervisionScope::All
        );
    }
}
