//! Multi-protocol actors
//!
//! One actor can be reached through several proxies that share its mailbox
//! and address.

mod common;

use actors::{protocol, Actor, ActorContext, ActorResult, Definition, Protocol, ProtocolProxy};
use common::{eventually, TIMEOUT};

protocol! {
    pub trait Alpha {
        fn alpha(&mut self, ctx: &mut ActorContext) -> ActorResult<()>;
        fn alphas(&mut self, ctx: &mut ActorContext) -> ActorResult<u32>;
        /// Reach the same actor again through its `Beta` face
        fn relay(&mut self, ctx: &mut ActorContext) -> ActorResult<()>;
    }
}

protocol! {
    pub trait Beta {
        fn beta(&mut self, ctx: &mut ActorContext) -> ActorResult<()>;
        fn betas(&mut self, ctx: &mut ActorContext) -> ActorResult<u32>;
    }
}

protocol! {
    pub trait Gamma {
        fn gamma(&mut self, ctx: &mut ActorContext, by: u32) -> ActorResult<u32>;
    }
}

protocol! {
    pub trait Delta {
        fn delta(&mut self, ctx: &mut ActorContext) -> ActorResult<String>;
    }
}

protocol! {
    pub trait Epsilon {
        fn epsilon(&mut self, ctx: &mut ActorContext) -> ActorResult<u32>;
    }
}

#[derive(Default)]
struct Multi {
    alphas: u32,
    betas: u32,
    gammas: u32,
}

impl Actor for Multi {}

impl Alpha for Multi {
    fn alpha(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        self.alphas += 1;
        Ok(())
    }

    fn alphas(&mut self, _ctx: &mut ActorContext) -> ActorResult<u32> {
        Ok(self.alphas)
    }

    fn relay(&mut self, ctx: &mut ActorContext) -> ActorResult<()> {
        let beta = ctx
            .self_as::<BetaProxy, Multi>()
            .ok_or_else(|| anyhow::anyhow!("actor is gone"))?;
        beta.beta();
        Ok(())
    }
}

impl Beta for Multi {
    fn beta(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        self.betas += 1;
        Ok(())
    }

    fn betas(&mut self, _ctx: &mut ActorContext) -> ActorResult<u32> {
        Ok(self.betas)
    }
}

impl Gamma for Multi {
    fn gamma(&mut self, _ctx: &mut ActorContext, by: u32) -> ActorResult<u32> {
        self.gammas += by;
        Ok(self.gammas)
    }
}

impl Delta for Multi {
    fn delta(&mut self, ctx: &mut ActorContext) -> ActorResult<String> {
        Ok(ctx.address().to_string())
    }
}

impl Epsilon for Multi {
    fn epsilon(&mut self, _ctx: &mut ActorContext) -> ActorResult<u32> {
        Ok(self.alphas + self.betas + self.gammas)
    }
}

fn multi() -> Definition<Multi> {
    Definition::has(|_| Ok(Multi::default()))
}

#[test]
fn test_two_proxies_share_one_actor() {
    let world = common::world("protocols-pair");
    let (alpha, beta): (AlphaProxy, BetaProxy) = world.actor_for_protocols(multi()).unwrap();

    alpha.alpha();
    beta.beta();
    beta.beta();

    assert_eq!(alpha.address(), beta.address());
    assert_eq!(alpha.alphas().await_timeout(TIMEOUT).unwrap(), 1);
    assert_eq!(beta.betas().await_timeout(TIMEOUT).unwrap(), 2);
    world.terminate();
}

#[test]
fn test_three_and_four_protocol_bundles() {
    let world = common::world("protocols-mid");
    let (alpha, beta, gamma): (AlphaProxy, BetaProxy, GammaProxy) =
        world.actor_for_protocols(multi()).unwrap();
    alpha.alpha();
    beta.beta();
    assert_eq!(gamma.gamma(5).await_timeout(TIMEOUT).unwrap(), 5);

    let (alpha, _, gamma, delta): (AlphaProxy, BetaProxy, GammaProxy, DeltaProxy) =
        world.actor_for_protocols(multi()).unwrap();
    alpha.alpha();
    assert_eq!(gamma.gamma(2).await_timeout(TIMEOUT).unwrap(), 2);
    assert_eq!(
        delta.delta().await_timeout(TIMEOUT).unwrap(),
        alpha.address().to_string()
    );
    world.terminate();
}

#[test]
fn test_five_protocol_bundle_interleaves_in_order() {
    let world = common::world("protocols-five");
    let (alpha, beta, gamma, delta, epsilon): (
        AlphaProxy,
        BetaProxy,
        GammaProxy,
        DeltaProxy,
        EpsilonProxy,
    ) = world.actor_for_protocols(multi()).unwrap();

    alpha.alpha();
    beta.beta();
    let _ = gamma.gamma(10);
    let _ = delta.delta();

    assert_eq!(epsilon.epsilon().await_timeout(TIMEOUT).unwrap(), 12);
    world.terminate();
}

#[test]
fn test_self_as_reaches_another_face() {
    let world = common::world("protocols-self");
    let (alpha, beta): (AlphaProxy, BetaProxy) = world.actor_for_protocols(multi()).unwrap();

    alpha.relay();

    assert!(eventually(TIMEOUT, || {
        beta.betas().await_timeout(TIMEOUT).unwrap() == 1
    }));
    world.terminate();
}

#[test]
fn test_protocol_names_and_representations() {
    assert_eq!(<dyn Alpha as Protocol>::NAME, "Alpha");
    assert_eq!(<<GammaProxy as ProtocolProxy>::Protocol as Protocol>::NAME, "Gamma");

    let world = common::world("protocols-names");
    let gamma: GammaProxy = world.actor_for(multi()).unwrap();
    assert_eq!(format!("{:?}", gamma), format!("GammaProxy {{ address: {:?} }}", gamma.address()));
    world.terminate();
}
