//! Dead letters
//!
//! Sends to stopped actors never raise. Each one is recorded once with the
//! target address and operation representation, and asks come back failed.

mod common;

use actors::{
    protocol, Actor, ActorContext, ActorError, ActorResult, DeadLetter, DeadLettersListener,
    Definition, ProtocolProxy,
};
use common::{CounterActor, CounterProxy, TIMEOUT};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn listen(world: &actors::World) -> Receiver<DeadLetter> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let listener: Arc<dyn DeadLettersListener> = Arc::new(move |letter: &DeadLetter| {
        let _ = tx.send(letter.clone());
    });
    world.dead_letters().register_listener(listener);
    rx
}

#[test]
fn test_send_to_stopped_actor_records_one_dead_letter() {
    let world = common::world("dead-letters-tell");
    let letters = listen(&world);
    let counter: CounterProxy = world
        .actor_for(Definition::has(|_| Ok(CounterActor::default())))
        .unwrap();
    let address = counter.address().clone();

    counter.handle().actor().stop();
    assert!(counter.handle().is_stopped());
    counter.add(3);

    let letter = letters.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(letter.address(), &address);
    assert_eq!(letter.representation(), "add(u64)");
    assert!(letters.recv_timeout(Duration::from_millis(200)).is_err());
    world.terminate();
}

#[test]
fn test_ask_to_stopped_actor_fails_immediately() {
    let world = common::world("dead-letters-ask");
    let letters = listen(&world);
    let counter: CounterProxy = world
        .actor_for(Definition::has(|_| Ok(CounterActor::default())))
        .unwrap();

    counter.handle().actor().stop();
    let total = counter.total();

    assert!(total.is_completed());
    assert!(matches!(
        total.await_timeout(TIMEOUT),
        Err(ActorError::DeliveryToStoppedActor { .. })
    ));
    assert_eq!(letters.recv_timeout(TIMEOUT).unwrap().representation(), "total()");
    world.terminate();
}

#[test]
fn test_failed_ask_continuations_are_scheduled() {
    let world = common::world("dead-letters-continuation");
    let counter: CounterProxy = world
        .actor_for(Definition::has(|_| Ok(CounterActor::default())))
        .unwrap();
    counter.handle().actor().stop();

    let caller = thread::current().id();
    let (tx, rx) = crossbeam_channel::unbounded();
    counter.total().on_outcome(move |outcome| {
        let _ = tx.send((thread::current().id(), outcome.is_err()));
    });

    let (ran_on, failed) = rx.recv_timeout(TIMEOUT).unwrap();
    assert!(failed);
    assert_ne!(ran_on, caller);
    world.terminate();
}

protocol! {
    pub trait Gate {
        fn hold(&mut self, ctx: &mut ActorContext, entered: Sender<()>, release: Receiver<()>) -> ActorResult<()>;
        fn value(&mut self, ctx: &mut ActorContext) -> ActorResult<u32>;
    }
}

struct GateActor;

impl Actor for GateActor {}

impl Gate for GateActor {
    fn hold(
        &mut self,
        _ctx: &mut ActorContext,
        entered: Sender<()>,
        release: Receiver<()>,
    ) -> ActorResult<()> {
        let _ = entered.send(());
        let _ = release.recv_timeout(TIMEOUT);
        Ok(())
    }

    fn value(&mut self, _ctx: &mut ActorContext) -> ActorResult<u32> {
        Ok(1)
    }
}

#[test]
fn test_queued_messages_are_dead_lettered_on_stop() {
    let world = common::world("dead-letters-queued");
    let letters = listen(&world);
    let gate: GateProxy = world.actor_for(Definition::has(|_| Ok(GateActor))).unwrap();

    let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
    let (release_tx, release_rx) = crossbeam_channel::bounded(1);
    gate.hold(entered_tx, release_rx);
    entered_rx.recv_timeout(TIMEOUT).unwrap();

    let queued = gate.value();
    gate.handle().actor().stop();
    release_tx.send(()).unwrap();

    assert!(matches!(
        queued.await_timeout(TIMEOUT),
        Err(ActorError::DeliveryToStoppedActor { .. })
    ));
    let letter = letters.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(letter.address(), gate.address());
    assert_eq!(letter.representation(), "value()");
    world.terminate();
}

#[test]
fn test_panicking_listener_does_not_silence_others() {
    let world = common::world("dead-letters-panic");
    let faulty: Arc<dyn DeadLettersListener> =
        Arc::new(|_: &DeadLetter| panic!("listener failure"));
    world.dead_letters().register_listener(faulty);
    let letters = listen(&world);

    let counter: CounterProxy = world
        .actor_for(Definition::has(|_| Ok(CounterActor::default())))
        .unwrap();
    counter.handle().actor().stop();
    counter.increment();
    counter.increment();

    assert_eq!(letters.recv_timeout(TIMEOUT).unwrap().representation(), "increment()");
    assert_eq!(letters.recv_timeout(TIMEOUT).unwrap().representation(), "increment()");
    assert!(!world.dead_letters().handle().is_stopped());
    world.terminate();
}
