//! Shared fixtures for runtime integration tests
//!
//! A small counter protocol used by most suites, world constructors with
//! tracing wired to the test writer, and a polling helper for state that
//! settles asynchronously.

#![allow(dead_code)]

use actors::{protocol, Actor, ActorContext, ActorResult, ActorsConfig, World};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

pub const TIMEOUT: Duration = Duration::from_secs(5);

protocol! {
    pub trait Counter {
        fn increment(&mut self, ctx: &mut ActorContext) -> ActorResult<()>;
        fn add(&mut self, ctx: &mut ActorContext, amount: u64) -> ActorResult<()>;
        fn total(&mut self, ctx: &mut ActorContext) -> ActorResult<u64>;
    }
}

#[derive(Default)]
pub struct CounterActor {
    pub count: u64,
}

impl Actor for CounterActor {}

impl Counter for CounterActor {
    fn increment(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        self.count += 1;
        Ok(())
    }

    fn add(&mut self, _ctx: &mut ActorContext, amount: u64) -> ActorResult<()> {
        self.count += amount;
        Ok(())
    }

    fn total(&mut self, _ctx: &mut ActorContext) -> ActorResult<u64> {
        Ok(self.count)
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn world(name: &str) -> World {
    init_tracing();
    World::start_with_defaults(name).expect("world should start")
}

pub fn world_with(name: &str, configure: impl FnOnce(&mut ActorsConfig)) -> World {
    init_tracing();
    let mut config = ActorsConfig::default();
    configure(&mut config);
    World::start(name, config).expect("world should start")
}

/// Poll `condition` until it holds or `timeout` passes
pub fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
