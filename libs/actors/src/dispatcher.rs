//! Worker Pool
//!
//! Mailbox drains are submitted as tasks to a [`Dispatcher`]. The world's
//! dispatcher owns a multi-thread tokio runtime sized from
//! `[dispatcher] worker_threads`; any worker may drain any actor.

use crate::error::{ActorError, Result};
use actors_config::DispatcherConfig;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::info;

/// Unit of work submitted to a dispatcher
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Dispatcher: Send + Sync {
    /// Submit a task. A closed dispatcher hands the task back.
    fn execute(&self, task: Task) -> std::result::Result<(), Task>;

    fn close(&self);

    fn is_closed(&self) -> bool;
}

pub struct RuntimeDispatcher {
    name: String,
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    closed: AtomicBool,
}

impl RuntimeDispatcher {
    pub fn new(config: &DispatcherConfig) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()
            .map_err(|e| ActorError::runtime_with_source("Failed to build worker runtime", e))?;

        info!(
            workers = config.worker_threads,
            thread_name = %config.thread_name,
            "Worker runtime started"
        );

        Ok(Self {
            name: config.thread_name.clone(),
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            closed: AtomicBool::new(false),
        })
    }

    /// Handle used by stage schedulers for timers and continuations
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }
}

impl Dispatcher for RuntimeDispatcher {
    fn execute(&self, task: Task) -> std::result::Result<(), Task> {
        if self.is_closed() {
            return Err(task);
        }
        drop(self.handle.spawn(async move { task() }));
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // shutdown_background never blocks, so closing from a worker or an
        // async context is allowed
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
        info!(dispatcher = %self.name, "Worker runtime shut down");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for RuntimeDispatcher {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}
