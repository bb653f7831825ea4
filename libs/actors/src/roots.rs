//! Root Supervisors
//!
//! Every world bootstraps two roots on its default stage. The private root
//! parents the public root and dead letters; failures reaching it stop the
//! failed actor. The public root is the default parent and supervisor of
//! user actors and restarts them within the configured strategy.

use crate::actor::{Actor, ActorContext};
use crate::error::ActorResult;
use crate::supervision::{
    Directive, Failure, SupervisionScope, SupervisionStrategy, Supervised, Supervisor,
};

pub(crate) struct PrivateRootActor;

impl Actor for PrivateRootActor {
    fn before_start(&mut self, ctx: &mut ActorContext) -> ActorResult<()> {
        ctx.logger().debug("Private root started");
        Ok(())
    }

    fn after_stop(&mut self, ctx: &mut ActorContext) -> ActorResult<()> {
        ctx.logger().debug("Private root stopped");
        Ok(())
    }
}

impl Supervisor for PrivateRootActor {
    fn inform(
        &mut self,
        ctx: &mut ActorContext,
        failure: Failure,
        supervised: Supervised,
    ) -> ActorResult<()> {
        ctx.logger()
            .error(format!("Failure reached the private root, stopping: {}", failure));
        supervised.stop(SupervisionScope::One);
        Ok(())
    }
}

pub(crate) struct PublicRootActor {
    strategy: SupervisionStrategy,
}

impl PublicRootActor {
    pub(crate) fn new(strategy: SupervisionStrategy) -> Self {
        Self { strategy }
    }
}

impl Actor for PublicRootActor {}

impl Supervisor for PublicRootActor {
    fn inform(
        &mut self,
        ctx: &mut ActorContext,
        failure: Failure,
        supervised: Supervised,
    ) -> ActorResult<()> {
        ctx.logger().warn(format!("Restarting after failure: {}", failure));
        supervised.apply(ctx, Directive::Restart, &self.strategy);
        Ok(())
    }
}
