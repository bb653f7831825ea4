//! Runtime defaults
//!
//! Default values and well-known names shared by the runtime and its
//! configuration files.

/// Dispatcher defaults
pub mod dispatcher {
    /// Worker threads draining mailboxes
    pub const WORKER_THREADS: usize = 4;

    /// Messages one actor may process before yielding its worker
    pub const THROUGHPUT: usize = 50;

    /// Prefix for worker thread names
    pub const THREAD_NAME: &str = "actors-worker";
}

/// Mailbox defaults
pub mod mailbox {
    /// Unbounded lock-free queue mailbox
    pub const QUEUE_MAILBOX: &str = "queueMailbox";

    /// Preallocated ring mailbox
    pub const RING_MAILBOX: &str = "ringMailbox";

    /// Slots preallocated by the ring mailbox
    pub const RING_CAPACITY: usize = 1024;
}

/// Stage defaults
pub mod stage {
    /// Name of the stage every world creates at start
    pub const DEFAULT_STAGE: &str = "__defaultStage";

    /// Quiescence polls performed while a stage stops
    pub const SHUTDOWN_RETRIES: u32 = 10;

    /// Sleep between quiescence polls (milliseconds)
    pub const SHUTDOWN_INTERVAL_MS: u64 = 10;
}

/// Supervision defaults
pub mod supervision {
    /// Restarts permitted inside one period
    pub const INTENSITY: u32 = 5;

    /// Restart counting window (milliseconds)
    pub const PERIOD_MS: u64 = 60_000;
}

/// Logging defaults
pub mod logging {
    /// Logger handed to actors that do not name one
    pub const DEFAULT_LOGGER: &str = "actors";
}

/// Completion defaults
pub mod completes {
    /// Timeout used by callers that do not pick one (milliseconds)
    pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
}
