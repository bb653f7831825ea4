//! World and stage behavior
//!
//! Startup and termination, stage registry, actor creation edge cases,
//! registries for mailboxes, loggers and dynamic values, and lifecycle hooks.

mod common;

use actors::{
    protocol, Actor, ActorContext, ActorError, ActorResult, ActorsConfig, Definition,
    LifeCycleState, MailboxKind, ProtocolProxy, World,
};
use common::{eventually, CounterActor, CounterProxy, TIMEOUT};
use crossbeam_channel::Sender;
use futures::future::join_all;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn counter() -> Definition<CounterActor> {
    Definition::has(|_| Ok(CounterActor::default()))
}

#[test]
fn test_world_boots_reserved_actors() {
    let world = common::world("world-boot");

    let addresses = world.stage().addresses();
    assert!(addresses.iter().any(|a| a.name() == Some("#private")));
    assert!(addresses.iter().any(|a| a.name() == Some("#public")));
    assert!(addresses.iter().any(|a| a.name() == Some("#deadLetters")));
    assert!(addresses.iter().all(|a| a.is_reserved()));
    assert_eq!(world.stage().count(), 3);
    assert!(!world.dead_letters().handle().is_stopped());
    world.terminate();
}

#[test]
fn test_terminate_is_idempotent_and_final() {
    let world = common::world("world-terminate");
    let counter: CounterProxy = world.actor_for(counter()).unwrap();

    world.terminate();
    world.terminate();

    assert!(world.is_terminated());
    assert!(counter.handle().is_stopped());
    assert!(world.stage().is_stopped());
    assert!(matches!(
        world.actor_for::<CounterProxy, CounterActor>(self::counter()),
        Err(ActorError::WorldTerminated { .. })
    ));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let mut config = ActorsConfig::default();
    config.dispatcher.worker_threads = 0;

    assert!(matches!(
        World::start("world-invalid", config),
        Err(ActorError::Configuration { .. })
    ));
}

#[test]
fn test_concurrent_stage_lookups_agree() {
    let world = common::world("world-stages");
    let barrier = Arc::new(Barrier::new(8));

    let stages: Vec<_> = (0..8)
        .map(|_| {
            let world = world.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                world.stage_named("shared")
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert!(stages.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(stages[0].name(), "shared");
    assert_ne!(stages[0], world.stage());
    world.terminate();
}

#[test]
fn test_duplicate_address_has_one_winner() {
    let world = common::world("world-duplicate");
    let address = world.address_factory().from_id(4_242, Some("contested")).unwrap();
    let barrier = Arc::new(Barrier::new(6));

    let results: Vec<_> = (0..6)
        .map(|_| {
            let stage = world.stage();
            let address = address.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                stage
                    .actor_for_at::<CounterProxy, CounterActor>(counter(), address)
                    .map(|proxy| proxy.address().clone())
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ActorError::DuplicateAddress { .. })));
    assert!(world
        .stage()
        .actor_of::<CounterProxy, CounterActor>(&address)
        .is_some());
    world.terminate();
}

#[test]
fn test_reserved_ids_cannot_be_claimed() {
    let world = common::world("world-reserved");
    assert!(world.address_factory().from_id(u64::MAX, None).is_err());
    world.terminate();
}

#[test]
fn test_stopped_stage_refuses_new_actors() {
    let world = common::world("world-stage-stop");
    let side = world.stage_named("side");
    let resident: CounterProxy = side.actor_for(counter()).unwrap();

    side.stop();
    side.stop();

    assert!(resident.handle().is_stopped());
    assert!(matches!(
        side.actor_for::<CounterProxy, CounterActor>(counter()),
        Err(ActorError::StageStopped { .. })
    ));
    let fine: CounterProxy = world.actor_for(counter()).unwrap();
    fine.increment();
    assert_eq!(fine.total().await_timeout(TIMEOUT).unwrap(), 1);
    world.terminate();
}

#[test]
fn test_actors_created_during_stop_do_not_outlive_the_stage() {
    let world = common::world("world-stage-race");
    let racing = world.stage_named("racing");
    let barrier = Arc::new(Barrier::new(5));

    let creators: Vec<_> = (0..4)
        .map(|_| {
            let stage = racing.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut created = Vec::new();
                loop {
                    match stage.actor_for::<CounterProxy, CounterActor>(counter()) {
                        Ok(proxy) => created.push(proxy),
                        Err(error) => break (created, error),
                    }
                }
            })
        })
        .collect();

    barrier.wait();
    thread::sleep(Duration::from_millis(5));
    racing.stop();

    let mut created = Vec::new();
    for creator in creators {
        let (proxies, error) = creator.join().unwrap();
        assert!(matches!(error, ActorError::StageStopped { .. }));
        created.extend(proxies);
    }
    assert!(eventually(TIMEOUT, || created.iter().all(|proxy| proxy.handle().is_stopped())));
    assert_eq!(racing.count(), 0);
    world.terminate();
}

#[test]
fn test_instantiation_failure_leaves_nothing_registered() {
    let world = common::world("world-instantiate");
    let before = world.stage().count();

    let result = world.actor_for::<CounterProxy, CounterActor>(Definition::has(|_| {
        Err(anyhow::anyhow!("no resources"))
    }));

    match result {
        Err(ActorError::ActorInstantiationFailed { source, .. }) => {
            assert!(source.to_string().contains("no resources"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(world.stage().count(), before);
    world.terminate();
}

#[test]
fn test_actor_of_finds_typed_actors_only() {
    let world = common::world("world-actor-of");
    let counter: CounterProxy = world.actor_for(counter().named("lookup")).unwrap();
    let address = counter.address().clone();
    assert_eq!(address.name(), Some("lookup"));

    let found = world
        .stage()
        .actor_of::<CounterProxy, CounterActor>(&address)
        .unwrap();
    found.increment();
    assert_eq!(counter.total().await_timeout(TIMEOUT).unwrap(), 1);

    assert!(world
        .stage()
        .actor_of::<GreeterProxy, GreeterActor>(&address)
        .is_none());

    counter.handle().actor().stop();
    assert!(world
        .stage()
        .actor_of::<CounterProxy, CounterActor>(&address)
        .is_none());
    world.terminate();
}

#[test]
fn test_unknown_mailbox_falls_back_to_default() {
    let world = common::world("world-mailbox-fallback");
    let counter: CounterProxy = world
        .actor_for(counter().with_mailbox("noSuchMailbox"))
        .unwrap();

    for _ in 0..10 {
        counter.increment();
    }
    assert_eq!(counter.total().await_timeout(TIMEOUT).unwrap(), 10);
    world.terminate();
}

#[test]
fn test_registered_mailbox_provider_is_used() {
    let world = common::world("world-mailbox-provider");
    world.register_mailbox_provider("tinyRing", MailboxKind::Ring { capacity: 2 }, false);
    let counter: CounterProxy = world.actor_for(counter().with_mailbox("tinyRing")).unwrap();

    for amount in 1..=50 {
        counter.add(amount);
    }
    assert_eq!(counter.total().await_timeout(TIMEOUT).unwrap(), 1_275);
    world.terminate();
}

protocol! {
    pub trait Greeter {
        fn greet(&mut self, ctx: &mut ActorContext, name: String) -> ActorResult<String>;
        fn logger_name(&mut self, ctx: &mut ActorContext) -> ActorResult<String>;
        fn spawn(&mut self, ctx: &mut ActorContext) -> ActorResult<CounterProxy>;
        fn arm(&mut self, ctx: &mut ActorContext, delay_ms: u64) -> ActorResult<()>;
        fn ring(&mut self, ctx: &mut ActorContext) -> ActorResult<()>;
        fn rings(&mut self, ctx: &mut ActorContext) -> ActorResult<u32>;
    }
}

#[derive(Default)]
struct GreeterActor {
    events: Option<Sender<&'static str>>,
    rings: u32,
}

impl GreeterActor {
    fn note(&self, event: &'static str) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

impl Actor for GreeterActor {
    fn before_start(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        self.note("before_start");
        Ok(())
    }

    fn after_stop(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        self.note("after_stop");
        Ok(())
    }
}

impl Greeter for GreeterActor {
    fn greet(&mut self, _ctx: &mut ActorContext, name: String) -> ActorResult<String> {
        self.note("greet");
        Ok(format!("hello {name}"))
    }

    fn logger_name(&mut self, ctx: &mut ActorContext) -> ActorResult<String> {
        Ok(ctx.logger().name().to_string())
    }

    fn spawn(&mut self, ctx: &mut ActorContext) -> ActorResult<CounterProxy> {
        Ok(ctx.child_actor_for(Definition::has(|_| Ok(CounterActor::default())))?)
    }

    fn arm(&mut self, ctx: &mut ActorContext, delay_ms: u64) -> ActorResult<()> {
        let me = ctx
            .self_as::<GreeterProxy, GreeterActor>()
            .ok_or_else(|| anyhow::anyhow!("actor is gone"))?;
        ctx.scheduler()
            .schedule_once(Duration::from_millis(delay_ms), move || me.ring())?;
        Ok(())
    }

    fn ring(&mut self, _ctx: &mut ActorContext) -> ActorResult<()> {
        self.rings += 1;
        Ok(())
    }

    fn rings(&mut self, _ctx: &mut ActorContext) -> ActorResult<u32> {
        Ok(self.rings)
    }
}

#[test]
fn test_lifecycle_hooks_bracket_messages() {
    let world = common::world("world-lifecycle");
    let (tx, events) = crossbeam_channel::unbounded();
    let greeter: GreeterProxy = world
        .actor_for(Definition::has(move |_| {
            Ok(GreeterActor {
                events: Some(tx.clone()),
                rings: 0,
            })
        }))
        .unwrap();

    assert_eq!(
        greeter.greet("ada".to_string()).await_timeout(TIMEOUT).unwrap(),
        "hello ada"
    );
    let actor = greeter.handle().actor();
    actor.stop();
    assert!(eventually(TIMEOUT, || actor.lifecycle() == LifeCycleState::Stopped));

    let seen: Vec<_> = events.try_iter().collect();
    assert_eq!(seen, vec!["before_start", "greet", "after_stop"]);
    world.terminate();
}

#[test]
fn test_children_stop_with_their_parent() {
    let world = common::world("world-children");
    let greeter: GreeterProxy = world
        .actor_for(Definition::has(|_| Ok(GreeterActor::default())))
        .unwrap();

    let child = greeter.spawn().await_timeout(TIMEOUT).unwrap();
    child.increment();
    assert_eq!(child.total().await_timeout(TIMEOUT).unwrap(), 1);
    let parent = child.handle().actor().parent().unwrap();
    assert_eq!(parent.address(), greeter.address());
    assert_eq!(greeter.handle().actor().children().len(), 1);

    greeter.handle().actor().stop();

    assert!(child.handle().is_stopped());
    assert!(world
        .stage()
        .actor_of::<CounterProxy, CounterActor>(child.address())
        .is_none());
    world.terminate();
}

#[test]
fn test_scheduler_delivers_to_self() {
    let world = common::world("world-scheduler");
    let greeter: GreeterProxy = world
        .actor_for(Definition::has(|_| Ok(GreeterActor::default())))
        .unwrap();

    greeter.arm(20);

    assert!(eventually(TIMEOUT, || {
        greeter.rings().await_timeout(TIMEOUT).unwrap() == 1
    }));
    world.terminate();
}

#[test]
fn test_named_logger_reaches_the_actor() {
    let world = common::world("world-logger");
    let audit = world.register_logger("audit", false);
    assert_eq!(world.logger("audit").map(|l| l.name().to_string()), Some("audit".to_string()));
    assert_ne!(world.default_logger().name(), "audit");

    let greeter: GreeterProxy = world
        .actor_for(Definition::has(|_| Ok(GreeterActor::default())).with_logger(audit))
        .unwrap();
    assert_eq!(greeter.logger_name().await_timeout(TIMEOUT).unwrap(), "audit");

    let plain: GreeterProxy = world
        .actor_for(Definition::has(|_| Ok(GreeterActor::default())))
        .unwrap();
    assert_eq!(
        plain.logger_name().await_timeout(TIMEOUT).unwrap(),
        world.default_logger().name()
    );
    world.terminate();
}

#[test]
fn test_dynamic_values_resolve_by_type() {
    let world = common::world("world-dynamic");
    world.register_dynamic("limit", Arc::new(42u32));

    assert_eq!(world.resolve_dynamic::<u32>("limit").as_deref(), Some(&42));
    assert!(world.resolve_dynamic::<String>("limit").is_none());
    assert!(world.resolve_dynamic::<u32>("missing").is_none());
    world.terminate();
}

#[test]
fn test_stage_reaches_back_to_its_world() {
    let world = common::world("world-backref");
    let stage = world.stage_named("aux");
    assert_eq!(stage.world().map(|w| w.id()), Some(world.id()));
    world.terminate();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_completes_can_be_awaited() {
    let world = common::world("world-async");
    let counter: CounterProxy = world.actor_for(counter()).unwrap();

    counter.add(5);
    let total = tokio::time::timeout(TIMEOUT, counter.total().wait())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(total, 5);

    let asks: Vec<_> = (1..=3)
        .map(|n| {
            counter.add(n);
            counter.total()
        })
        .collect();
    let totals = tokio::time::timeout(TIMEOUT, join_all(asks.iter().map(|ask| ask.wait())))
        .await
        .unwrap();
    let totals: Vec<u64> = totals.into_iter().map(Result::unwrap).collect();

    assert_eq!(totals, vec![6, 8, 11]);
    world.terminate();
}

#[test]
fn test_await_default_follows_completes_config() {
    let world = common::world_with("world-await-default", |config| {
        config.completes.default_timeout_ms = 50;
    });
    assert_eq!(world.stage().scheduler().await_timeout(), Duration::from_millis(50));

    let counter: CounterProxy = world.actor_for(counter()).unwrap();
    counter.increment();
    assert_eq!(counter.total().await_default().unwrap(), 1);
    world.terminate();
}
