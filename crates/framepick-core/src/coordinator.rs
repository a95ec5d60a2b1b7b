//! Single-flight coordination of background decodes.
//!
//! At most one decode runs at a time. The busy flag is an [`AtomicBool`]
//! claimed with a compare-exchange, so a second submission is rejected
//! immediately instead of queueing. The claim is held by a [`Slot`] guard
//! that releases the flag when the job finishes, when it panics, or when
//! the executor refuses the job.
//!
//! The flag is released *before* the completion callback runs, so the
//! callback may submit the next request (for example a rotation).

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use thiserror::Error;

use crate::config::DEFAULT_WORKER_NAME;

/// Unit of work handed to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks off the foreground context.
pub trait Executor: Send + Sync {
    /// Start `task`. On error the task is dropped without running.
    fn execute(&self, task: Task) -> io::Result<()>;
}

/// Spawns a named OS thread per task.
#[derive(Debug, Clone)]
pub struct ThreadExecutor {
    name: String,
}

impl ThreadExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_NAME)
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, task: Task) -> io::Result<()> {
        thread::Builder::new()
            .name(self.name.clone())
            .spawn(task)
            .map(|_| ())
    }
}

/// Runs tasks on a tokio runtime's blocking pool.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "tokio")]
impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Executor for the runtime the caller is running on, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

#[cfg(feature = "tokio")]
impl Executor for TokioExecutor {
    fn execute(&self, task: Task) -> io::Result<()> {
        // Detached: completion is reported through the job's own callback
        drop(self.handle.spawn_blocking(task));
        Ok(())
    }
}

/// Synchronous rejection of a submission. Never delivered through the
/// result callback.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("A decode is already running")]
    Busy,

    #[error("No image has been picked")]
    NoSource,

    #[error("Failed to start decode worker: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

/// Guards the single in-flight decode.
#[derive(Clone)]
pub struct Coordinator {
    busy: Arc<AtomicBool>,
    executor: Arc<dyn Executor>,
}

impl Coordinator {
    pub fn new(executor: impl Executor + 'static) -> Self {
        Self::with_executor(Arc::new(executor))
    }

    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            executor,
        }
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn state(&self) -> RunState {
        if self.is_running() {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    /// Claim the slot without dispatching anything yet.
    ///
    /// Lets a caller commit its own state only once the request is known to
    /// be accepted.
    pub fn try_acquire(&self) -> Result<Slot, SubmitError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                log::warn!("decode rejected: another decode is in flight");
                SubmitError::Busy
            })?;

        Ok(Slot {
            busy: Arc::clone(&self.busy),
            executor: Arc::clone(&self.executor),
        })
    }

    /// Run `job` in the background and hand its result to `on_complete`.
    ///
    /// Returns `SubmitError::Busy` without starting anything if a job is
    /// already in flight.
    pub fn submit<T, J, C>(&self, job: J, on_complete: C) -> Result<(), SubmitError>
    where
        T: 'static,
        J: FnOnce() -> T + Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        self.try_acquire()?.dispatch(job, on_complete)
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// A claimed coordinator slot. Dropping it marks the coordinator idle.
pub struct Slot {
    busy: Arc<AtomicBool>,
    executor: Arc<dyn Executor>,
}

impl Slot {
    /// Start `job` on the executor, consuming the claim.
    pub fn dispatch<T, J, C>(self, job: J, on_complete: C) -> Result<(), SubmitError>
    where
        T: 'static,
        J: FnOnce() -> T + Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        let executor = Arc::clone(&self.executor);
        let task: Task = Box::new(move || {
            let result = job();
            drop(self);
            on_complete(result);
        });

        // A refused task is dropped, and the slot inside it with it
        executor.execute(task).map_err(|e| {
            log::warn!("decode worker failed to start: {}", e);
            SubmitError::Spawn(e)
        })
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
