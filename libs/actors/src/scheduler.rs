//! Stage Scheduler
//!
//! Timer-driven triggers for one stage, running on the world's worker
//! runtime. Every task is tracked so that closing the scheduler cancels all
//! of them; later requests fail with [`ActorError::SchedulerClosed`].

use crate::error::{ActorError, Result};
use actors_config::CompletesConfig;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    name: String,
    runtime: Handle,
    await_timeout: Duration,
    tasks: DashMap<u64, AbortHandle>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// Handle to a scheduled task
#[derive(Clone, Debug)]
pub struct Cancellable {
    id: u64,
    scheduler: Scheduler,
}

impl Cancellable {
    /// Cancel the task. Returns false if it already ran (once) or was cancelled.
    pub fn cancel(&self) -> bool {
        match self.scheduler.inner.tasks.remove(&self.id) {
            Some((_, abort)) => {
                abort.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduler.inner.tasks.contains_key(&self.id)
    }
}

impl Scheduler {
    pub fn new(name: impl Into<String>, runtime: Handle) -> Self {
        Self::configured(name, runtime, &CompletesConfig::default())
    }

    /// Scheduler whose completions wait `completes.default_timeout_ms` when
    /// no timeout is given
    pub fn configured(name: impl Into<String>, runtime: Handle, completes: &CompletesConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                name: name.into(),
                runtime,
                await_timeout: completes.default_timeout(),
                tasks: DashMap::new(),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Default wait for completions bound to this scheduler
    pub fn await_timeout(&self) -> Duration {
        self.inner.await_timeout
    }

    /// Run `action` once after `delay`
    pub fn schedule_once<F>(&self, delay: Duration, action: F) -> Result<Cancellable>
    where
        F: FnOnce() + Send + 'static,
    {
        self.ensure_open()?;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let (tracked, on_tracked) = oneshot::channel::<()>();

        let join = self.inner.runtime.spawn(async move {
            // the entry must exist before the task can remove it
            let _ = on_tracked.await;
            tokio::time::sleep(delay).await;
            if !inner.closed.load(Ordering::Acquire) {
                action();
            }
            inner.tasks.remove(&id);
        });
        let task = self.track(id, join);
        let _ = tracked.send(());
        Ok(task)
    }

    /// Run `action` after `delay` and then every `interval` until cancelled
    pub fn schedule<F>(&self, delay: Duration, interval: Duration, action: F) -> Result<Cancellable>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.ensure_open()?;
        if interval.is_zero() {
            return Err(ActorError::configuration(
                "Periodic interval must be positive",
                Some("interval"),
            ));
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);

        let join = self.inner.runtime.spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + delay, interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if inner.closed.load(Ordering::Acquire) {
                    break;
                }
                action();
            }
        });
        Ok(self.track(id, join))
    }

    /// Run `task` on a worker as soon as possible. Once the scheduler is
    /// closed the task runs on the calling thread instead.
    pub fn dispatch<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_closed() {
            task();
            return;
        }
        drop(self.inner.runtime.spawn(async move { task() }));
    }

    /// Cancel every outstanding task; idempotent
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let cancelled = self.inner.tasks.len();
        self.inner.tasks.retain(|_, abort| {
            abort.abort();
            false
        });
        info!(scheduler = %self.inner.name, cancelled, "Scheduler closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Tasks scheduled and not yet finished or cancelled
    pub fn scheduled(&self) -> usize {
        self.inner.tasks.len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(ActorError::scheduler_closed(&self.inner.name))
        } else {
            Ok(())
        }
    }

    fn track(&self, id: u64, join: tokio::task::JoinHandle<()>) -> Cancellable {
        self.inner.tasks.insert(id, join.abort_handle());
        debug!(scheduler = %self.inner.name, task = id, "Task scheduled");
        Cancellable {
            id,
            scheduler: self.clone(),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.inner.name)
            .field("scheduled", &self.inner.tasks.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
