//! Eventual Completion
//!
//! [`Completes<T>`] is the single-assignment result handed back by proxy
//! operations that declare a result. The first [`with`](Completes::with) or
//! [`fail`](Completes::fail) wins; later attempts are ignored.
//!
//! Observers can:
//! - block with [`await_timeout`](Completes::await_timeout), or with
//!   [`await_default`](Completes::await_default) using the configured timeout
//! - `.await` [`wait`](Completes::wait) from async code
//! - register continuations with [`and_then`](Completes::and_then) and
//!   [`on_outcome`](Completes::on_outcome), which are dispatched through the
//!   bound [`Scheduler`] rather than run on the resolving thread

use crate::error::{ActorError, Result};
use crate::scheduler::Scheduler;
use actors_config::defaults;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

type Continuation<T> = Box<dyn FnOnce(Result<T>) + Send>;

pub struct Completes<T> {
    inner: Arc<CompletesInner<T>>,
}

struct CompletesInner<T> {
    state: Mutex<State<T>>,
    resolved: Condvar,
    notify: Notify,
    scheduler: Option<Scheduler>,
}

struct State<T> {
    outcome: Option<Result<T>>,
    continuations: Vec<Continuation<T>>,
}

impl<T> Clone for Completes<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Completes<T> {
    fn build(scheduler: Option<Scheduler>, outcome: Option<Result<T>>) -> Self {
        Self {
            inner: Arc::new(CompletesInner {
                state: Mutex::new(State {
                    outcome,
                    continuations: Vec::new(),
                }),
                resolved: Condvar::new(),
                notify: Notify::new(),
                scheduler,
            }),
        }
    }

    /// Unresolved completion whose continuations run on the caller's thread
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// Unresolved completion whose continuations are dispatched by `scheduler`
    pub fn using(scheduler: Scheduler) -> Self {
        Self::build(Some(scheduler), None)
    }

    pub fn with_value(value: T) -> Self {
        Self::build(None, Some(Ok(value)))
    }

    pub fn failed(error: ActorError) -> Self {
        Self::build(None, Some(Err(error)))
    }

    /// Resolve with a value. Returns false if already resolved.
    pub fn with(&self, value: T) -> bool {
        self.resolve(Ok(value))
    }

    /// Resolve with a failure. Returns false if already resolved.
    pub fn fail(&self, error: ActorError) -> bool {
        self.resolve(Err(error))
    }

    pub fn is_completed(&self) -> bool {
        self.inner.state.lock().outcome.is_some()
    }

    /// Current outcome without waiting
    pub fn outcome(&self) -> Option<Result<T>> {
        self.inner.state.lock().outcome.clone()
    }

    /// Block the calling thread until resolved or `timeout` elapses. A timeout
    /// leaves the completion untouched; it may still resolve later.
    pub fn await_timeout(&self, timeout: Duration) -> Result<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return outcome.clone();
            }
            if self.inner.resolved.wait_until(&mut state, deadline).timed_out() {
                return match &state.outcome {
                    Some(outcome) => outcome.clone(),
                    None => Err(ActorError::timeout(
                        "Completes::await_timeout",
                        timeout.as_millis() as u64,
                    )),
                };
            }
        }
    }

    /// [`await_timeout`](Self::await_timeout) with the bound scheduler's
    /// `completes.default_timeout_ms`
    pub fn await_default(&self) -> Result<T> {
        let timeout = self.inner.scheduler.as_ref().map_or(
            Duration::from_millis(defaults::completes::DEFAULT_TIMEOUT_MS),
            Scheduler::await_timeout,
        );
        self.await_timeout(timeout)
    }

    /// Wait asynchronously for the outcome
    pub async fn wait(&self) -> Result<T> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Register a continuation for the outcome, dispatched once it resolves
    pub fn on_outcome<F>(&self, continuation: F)
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let outcome = {
            let mut state = self.inner.state.lock();
            match state.outcome.clone() {
                Some(outcome) => outcome,
                None => {
                    state.continuations.push(Box::new(continuation));
                    return;
                }
            }
        };
        self.dispatch(Box::new(continuation), outcome);
    }

    /// Map a successful value into a new completion; failures pass through
    pub fn and_then<U, F>(&self, function: F) -> Completes<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let next = Completes::build(self.inner.scheduler.clone(), None);
        let target = next.clone();
        self.on_outcome(move |outcome| match outcome {
            Ok(value) => {
                target.with(function(value));
            }
            Err(error) => {
                target.fail(error);
            }
        });
        next
    }

    fn resolve(&self, outcome: Result<T>) -> bool {
        let continuations = {
            let mut state = self.inner.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome.clone());
            std::mem::take(&mut state.continuations)
        };
        self.inner.resolved.notify_all();
        self.inner.notify.notify_waiters();
        for continuation in continuations {
            self.dispatch(continuation, outcome.clone());
        }
        true
    }

    fn dispatch(&self, continuation: Continuation<T>, outcome: Result<T>) {
        match &self.inner.scheduler {
            Some(scheduler) => scheduler.dispatch(move || continuation(outcome)),
            None => continuation(outcome),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Completes<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Completes<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let completed = self.inner.state.lock().outcome.is_some();
        f.debug_struct("Completes").field("completed", &completed).finish()
    }
}

/// Type-erased view of a completion carried by a queued message, so the
/// runtime can fail it without knowing `T`
pub trait PendingCompletion: Send {
    fn fail(&self, error: ActorError) -> bool;
}

impl<T: Clone + Send + 'static> PendingCompletion for Completes<T> {
    fn fail(&self, error: ActorError) -> bool {
        Completes::fail(self, error)
    }
}
