use std::time::Duration;

/// Handle of a scheduled task.
pub type TimerId = u64;

/// Deferred work run by a [`Timer`].
pub type TimerTask = Box<dyn FnOnce() + Send>;

/// One-shot timers.
pub trait Timer: Send + Sync {
    /// Run `task` once after `delay`.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId;

    /// Cancel a scheduled task. Returns false if it already ran or was
    /// unknown.
    fn cancel(&self, id: TimerId) -> bool;
}
