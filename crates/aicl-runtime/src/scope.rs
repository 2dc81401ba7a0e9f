//! Structured concurrency scope for `RUNCON` blocks.
//!
//! A scope spawns one worker per concurrent child and joins all of them
//! before it is released, so no task escapes its block. Cancellation is
//! cooperative through a shared `CancelToken`; a cancelled scope still
//! joins every worker it started.

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Errors surfaced by a scoped worker itself (as opposed to errors the
/// worker's closure chooses to return as its value).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaskError {
    #[error("task was cancelled")]
    Cancelled,

    #[error("task panicked: {0}")]
    Panicked(String),
}

/// A token for cooperative cancellation.
///
/// Workers check the token at their own checkpoints; setting it never
/// interrupts anything mid-flight.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Cancellation checkpoint.
    pub fn check(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Shared completion slot for one spawned worker.
struct ScopedTaskInner<T> {
    result: Mutex<Option<Result<T, TaskError>>>,
    completed: Condvar,
}

impl<T> ScopedTaskInner<T> {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            completed: Condvar::new(),
        }
    }

    fn complete(&self, result: Result<T, TaskError>) {
        *self.result.lock() = Some(result);
        self.completed.notify_all();
    }

    fn wait(&self) -> Result<T, TaskError> {
        let mut result = self.result.lock();
        loop {
            if let Some(value) = result.take() {
                return value;
            }
            self.completed.wait(&mut result);
        }
    }
}

/// Handle to a worker spawned within a scope.
pub struct ScopedJoinHandle<T> {
    inner: Arc<ScopedTaskInner<T>>,
}

impl<T> ScopedJoinHandle<T> {
    /// Wait for the worker and take its result.
    pub fn join(self) -> Result<T, TaskError> {
        self.inner.wait()
    }
}

/// A fan-out/fan-in scope over dedicated OS threads.
pub struct Scope {
    cancel_token: CancelToken,
    threads: Vec<thread::JoinHandle<()>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::with_token(CancelToken::new())
    }

    /// Create a scope sharing an existing cancellation token, so nested
    /// scopes all observe the same cancel signal.
    pub fn with_token(cancel_token: CancelToken) -> Self {
        Self {
            cancel_token,
            threads: Vec::new(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel_token.clone()
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Spawn a worker within this scope. Panics inside the closure become
    /// `TaskError::Panicked` on the handle rather than tearing the scope
    /// down.
    pub fn spawn<F, T>(&mut self, f: F) -> ScopedJoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::new(ScopedTaskInner::new());
        let inner_clone = Arc::clone(&inner);

        let handle = thread::spawn(move || {
            let result = match panic::catch_unwind(panic::AssertUnwindSafe(f)) {
                Ok(value) => Ok(value),
                Err(payload) => {
                    let msg = payload
                        .downcast_ref::<String>()
                        .cloned()
                        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
                        .unwrap_or_else(|| "unknown panic".to_string());
                    Err(TaskError::Panicked(msg))
                }
            };
            inner_clone.complete(result);
        });
        self.threads.push(handle);

        ScopedJoinHandle { inner }
    }

    /// Wait for every spawned worker to finish.
    pub fn join_all(&mut self) {
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        // A scope must never release dangling workers.
        self.join_all();
    }
}
