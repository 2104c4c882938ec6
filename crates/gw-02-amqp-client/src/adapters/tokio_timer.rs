use crate::ports::{Timer, TimerId, TimerTask};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// [`Timer`] backed by tokio tasks.
pub struct TokioTimer {
    handle: Handle,
    next_id: AtomicU64,
    scheduled: Arc<DashMap<TimerId, Option<AbortHandle>>>,
}

impl TokioTimer {
    /// Timer spawning onto the given runtime.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            next_id: AtomicU64::new(1),
            scheduled: Arc::new(DashMap::new()),
        }
    }

    /// Timer spawning onto the current runtime, if there is one.
    #[must_use]
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Number of timers not yet fired or cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.scheduled.len()
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // registered before spawning: a missing id means "cancelled"
        self.scheduled.insert(id, None);

        let scheduled = self.scheduled.clone();
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if scheduled.remove(&id).is_some() {
                task();
            }
        });
        if let Some(mut entry) = self.scheduled.get_mut(&id) {
            *entry = Some(join.abort_handle());
        }
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        match self.scheduled.remove(&id) {
            Some((_, handle)) => {
                if let Some(handle) = handle {
                    handle.abort();
                }
                true
            }
            None => false,
        }
    }
}
