//! First-writer-wins result cell for one establishment attempt.

use crate::error::LinkError;
use crate::ports::TimerId;
use parking_lot::Mutex;
use shared_types::amqp::Link;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

const PENDING: u8 = 0;
const RESOLVED_OK: u8 = 1;
const RESOLVED_ERR: u8 = 2;

pub(crate) type Outcome<L> = Result<Arc<L>, LinkError>;

/// `pending | resolved-ok | resolved-err`
///
/// Exactly one of the remote-open handler and the deadline wins
/// [`PendingLink::claim`]. Only the winner touches the link and delivers.
pub(crate) struct PendingLink<L: ?Sized> {
    state: AtomicU8,
    opened: AtomicBool,
    timer: Mutex<Option<TimerId>>,
    sender: Mutex<Option<oneshot::Sender<Outcome<L>>>>,
}

impl<L: Link + ?Sized> PendingLink<L> {
    pub(crate) fn new(sender: oneshot::Sender<Outcome<L>>) -> Self {
        Self {
            state: AtomicU8::new(PENDING),
            opened: AtomicBool::new(false),
            timer: Mutex::new(None),
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Move out of `pending`. Returns false if someone else already did.
    pub(crate) fn claim(&self, success: bool) -> bool {
        let target = if success { RESOLVED_OK } else { RESOLVED_ERR };
        self.state
            .compare_exchange(PENDING, target, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[cfg(test)]
    pub(crate) fn is_resolved(&self) -> bool {
        self.state.load(Ordering::Acquire) != PENDING
    }

    /// Deliver the outcome to the waiting caller.
    pub(crate) fn deliver(&self, outcome: Outcome<L>) {
        if let Some(sender) = self.sender.lock().take() {
            // the caller may have stopped waiting
            let _ = sender.send(outcome);
        }
    }

    /// Send the attach frame unless already sent.
    pub(crate) fn ensure_open(&self, link: &L) {
        if !self.opened.swap(true, Ordering::AcqRel) {
            link.open();
        }
    }

    pub(crate) fn set_timer(&self, id: TimerId) {
        *self.timer.lock() = Some(id);
    }

    pub(crate) fn take_timer(&self) -> Option<TimerId> {
        self.timer.lock().take()
    }
}
