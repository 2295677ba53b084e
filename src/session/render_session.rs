use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::error::{RasterError, RasterResult};

struct SessionInner {
    epoch: AtomicU64,
    // Paired with `wake` so interruptible sleeps observe epoch bumps without polling.
    wake_lock: Mutex<()>,
    wake: Condvar,
    // Serializes task start against cancellation; `task` itself is only held briefly.
    control: Mutex<()>,
    task: Mutex<Option<TrackedTask>>,
}

struct TrackedTask {
    id: ThreadId,
    handle: JoinHandle<()>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionInner {
    fn bump(&self) -> u64 {
        let next = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let _guard = lock(&self.wake_lock);
        self.wake.notify_all();
        tracing::trace!(epoch = next, "render epoch advanced");
        next
    }

    fn current(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}

/// Render generation tracker shared by everything that renders on behalf of one view.
///
/// A session hands out [`EpochToken`]s. Bumping the epoch (through [`RenderSession::invalidate`]
/// or [`RenderSession::cancel`]) makes every outstanding token stale, and any work that
/// periodically validates its token stops on its own.
///
/// Cloning a session yields another handle to the same generation counter.
#[derive(Clone)]
pub struct RenderSession {
    inner: Arc<SessionInner>,
}

impl Default for RenderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("epoch", &self.current_epoch())
            .field("task_running", &self.is_task_running())
            .finish()
    }
}

impl RenderSession {
    /// Create a session at epoch 0 with no tracked task.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                epoch: AtomicU64::new(0),
                wake_lock: Mutex::new(()),
                wake: Condvar::new(),
                control: Mutex::new(()),
                task: Mutex::new(None),
            }),
        }
    }

    /// Live epoch value.
    pub fn current_epoch(&self) -> u64 {
        self.inner.current()
    }

    /// Fail with [`RasterError::StaleEpoch`] unless `epoch` is the live epoch.
    pub fn validate(&self, epoch: u64) -> RasterResult<()> {
        let current = self.inner.current();
        if epoch != current {
            return Err(RasterError::StaleEpoch {
                captured: epoch,
                current,
            });
        }
        Ok(())
    }

    /// Capture the live epoch.
    pub fn token(&self) -> EpochToken {
        EpochToken {
            inner: Arc::clone(&self.inner),
            epoch: self.inner.current(),
        }
    }

    /// Advance the epoch without touching the tracked task; returns the new epoch.
    ///
    /// Outstanding tokens turn stale and interruptible sleeps wake up.
    pub fn invalidate(&self) -> u64 {
        self.inner.bump()
    }

    /// Run `work` on a new thread and track it as this session's task.
    ///
    /// A previously tracked task is cancelled first, so `work` receives a token for the
    /// post-cancellation epoch.
    pub fn start_background_task<F>(&self, work: F) -> RasterResult<()>
    where
        F: FnOnce(EpochToken) + Send + 'static,
    {
        let _control = lock(&self.inner.control);
        let prev = lock(&self.inner.task).take();
        if let Some(prev) = prev {
            self.stop(prev)?;
        }

        let token = self.token();
        let epoch = token.epoch;
        let handle = std::thread::Builder::new()
            .name(format!("render-task-{epoch}"))
            .spawn(move || work(token))
            .context("spawn render session task")?;
        tracing::debug!(epoch, "render session task started");
        *lock(&self.inner.task) = Some(TrackedTask {
            id: handle.thread().id(),
            handle,
        });
        Ok(())
    }

    /// Invalidate the epoch and block until the tracked task has exited.
    ///
    /// No-op when nothing is tracked; safe when the task already finished. Calling this from
    /// inside the tracked task returns [`RasterError::Interrupted`] instead of deadlocking.
    pub fn cancel(&self) -> RasterResult<()> {
        let _control = lock(&self.inner.control);
        let Some(task) = lock(&self.inner.task).take() else {
            return Ok(());
        };
        self.stop(task)
    }

    /// `true` while a tracked task exists and has not finished.
    pub fn is_task_running(&self) -> bool {
        lock(&self.inner.task)
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    fn stop(&self, task: TrackedTask) -> RasterResult<()> {
        if task.id == std::thread::current().id() {
            *lock(&self.inner.task) = Some(task);
            return Err(RasterError::interrupted(
                "render session task cannot cancel itself",
            ));
        }
        let epoch = self.inner.bump();
        if task.handle.join().is_err() {
            tracing::warn!(epoch, "render session task panicked");
        }
        tracing::debug!(epoch, "render session task stopped");
        Ok(())
    }
}

/// An epoch captured from a [`RenderSession`].
///
/// Cheap to clone and shareable across threads; every band worker holds one.
#[derive(Clone)]
pub struct EpochToken {
    inner: Arc<SessionInner>,
    epoch: u64,
}

impl std::fmt::Debug for EpochToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpochToken")
            .field("epoch", &self.epoch)
            .field("current", &self.inner.current())
            .finish()
    }
}

impl EpochToken {
    /// The captured epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// `true` while the session is still at the captured epoch.
    pub fn is_valid(&self) -> bool {
        self.inner.current() == self.epoch
    }

    /// Fail with [`RasterError::StaleEpoch`] once the session moved on.
    pub fn validate(&self) -> RasterResult<()> {
        let current = self.inner.current();
        if current != self.epoch {
            return Err(RasterError::StaleEpoch {
                captured: self.epoch,
                current,
            });
        }
        Ok(())
    }

    /// Sleep for `duration`, waking early with [`RasterError::StaleEpoch`] if the epoch changes.
    pub fn sleep(&self, duration: Duration) -> RasterResult<()> {
        let guard = lock(&self.inner.wake_lock);
        let (_guard, _timeout) = self
            .inner
            .wake
            .wait_timeout_while(guard, duration, |_| self.inner.current() == self.epoch)
            .unwrap_or_else(PoisonError::into_inner);
        self.validate()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
