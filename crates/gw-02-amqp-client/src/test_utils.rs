//! Test utilities for link establishment.
//!
//! Enable with the `test-utils` feature flag.

use crate::ports::{Timer, TimerId, TimerTask};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

struct Scheduled {
    id: TimerId,
    delay: Duration,
    cancelled: bool,
    task: Option<TimerTask>,
}

/// A [`Timer`] that only fires when told to.
///
/// Cancelled tasks are kept, so a test can fire a deadline "late" and check
/// that it no longer has any effect.
#[derive(Default)]
pub struct ManualTimer {
    next_id: AtomicU64,
    immediate: bool,
    scheduled: Mutex<Vec<Scheduled>>,
}

impl ManualTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A timer running every task inside `schedule`.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            immediate: true,
            ..Self::default()
        }
    }

    /// Delays of all scheduled tasks, in scheduling order.
    pub fn delays(&self) -> Vec<Duration> {
        self.scheduled.lock().iter().map(|s| s.delay).collect()
    }

    pub fn is_cancelled(&self, id: TimerId) -> bool {
        self.scheduled
            .lock()
            .iter()
            .any(|s| s.id == id && s.cancelled)
    }

    /// Number of cancelled tasks.
    pub fn cancelled(&self) -> usize {
        self.scheduled.lock().iter().filter(|s| s.cancelled).count()
    }

    /// Run every task that was neither fired nor cancelled.
    pub fn fire_pending(&self) -> usize {
        self.fire(false)
    }

    /// Run every task not yet fired, cancelled or not.
    pub fn fire_all(&self) -> usize {
        self.fire(true)
    }

    fn fire(&self, include_cancelled: bool) -> usize {
        let tasks: Vec<TimerTask> = self
            .scheduled
            .lock()
            .iter_mut()
            .filter(|s| include_cancelled || !s.cancelled)
            .filter_map(|s| s.task.take())
            .collect();
        let fired = tasks.len();
        // outside the lock: tasks may schedule or cancel
        for task in tasks {
            task();
        }
        fired
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if self.immediate {
            task();
            self.scheduled.lock().push(Scheduled {
                id,
                delay,
                cancelled: false,
                task: None,
            });
        } else {
            self.scheduled.lock().push(Scheduled {
                id,
                delay,
                cancelled: false,
                task: Some(task),
            });
        }
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        let mut scheduled = self.scheduled.lock();
        match scheduled.iter_mut().find(|s| s.id == id) {
            Some(s) if s.task.is_some() && !s.cancelled => {
                s.cancelled = true;
                true
            }
            _ => false,
        }
    }
}
