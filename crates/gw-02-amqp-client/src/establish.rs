//! # Link Establishment
//!
//! ```text
//! create link ─▶ register open handler ─▶ arm deadline ─▶ open()
//!                      │                        │
//!                      ▼                        ▼
//!               attach / refusal            timeout
//!                      └──────── first wins ────┘
//! ```

use crate::config::ClientConfig;
use crate::error::{LinkError, ServiceInvocationError};
use crate::pending::{Outcome, PendingLink};
use crate::ports::Timer;
use shared_types::amqp::{
    Connection, EngineError, Link, MessageHandler, QoS, ReceiverLink, SenderLink,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Invoked with the link's address when the peer later closes an
/// established link.
pub type CloseHook = Box<dyn FnOnce(String) + Send>;

/// An in-flight establishment attempt.
///
/// Resolves exactly once. There is no way to abort the attempt; it ends
/// with the peer's answer or the deadline.
#[must_use = "an establishment does nothing unless awaited"]
pub struct Establishment<L: ?Sized> {
    receiver: oneshot::Receiver<Outcome<L>>,
}

impl<L: ?Sized> Future for Establishment<L> {
    type Output = Result<Arc<L>, LinkError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|outcome| {
            outcome.unwrap_or_else(|_| {
                Err(ServiceInvocationError::unavailable("link establishment abandoned").into())
            })
        })
    }
}

/// Opens links with bounded-time failure semantics.
pub struct LinkEstablisher {
    config: ClientConfig,
    timer: Arc<dyn Timer>,
}

impl LinkEstablisher {
    #[must_use]
    pub fn new(config: ClientConfig, timer: Arc<dyn Timer>) -> Self {
        Self { config, timer }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open a sender link to `target`.
    ///
    /// Fails right away if the connection cannot create the link.
    pub fn establish_sender(
        &self,
        connection: &dyn Connection,
        target: &str,
        qos: QoS,
        close_hook: Option<CloseHook>,
    ) -> Result<Establishment<dyn SenderLink>, LinkError> {
        let sender = connection.create_sender(target)?;
        sender.set_qos(qos);
        sender.set_local_address(Some(target.to_string()));
        debug!(target, ?qos, "Establishing sender link");

        Ok(self.establish(sender, target, close_hook))
    }

    /// Open a receiver link from `source`, delivering messages to
    /// `message_handler`. Deliveries are auto-accepted and the peer is
    /// granted `initial_credits` of prefetch.
    pub fn establish_receiver(
        &self,
        connection: &dyn Connection,
        source: &str,
        qos: QoS,
        message_handler: MessageHandler,
        close_hook: Option<CloseHook>,
    ) -> Result<Establishment<dyn ReceiverLink>, LinkError> {
        let receiver = connection.create_receiver(source)?;
        receiver.set_qos(qos);
        receiver.set_auto_accept(true);
        receiver.set_prefetch(self.config.initial_credits);
        receiver.set_local_address(Some(source.to_string()));
        receiver.on_message(message_handler);
        debug!(source, ?qos, prefetch = self.config.initial_credits, "Establishing receiver link");

        Ok(self.establish(receiver, source, close_hook))
    }

    fn establish<L>(
        &self,
        link: Arc<L>,
        address: &str,
        close_hook: Option<CloseHook>,
    ) -> Establishment<L>
    where
        L: Link + ?Sized + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let pending = Arc::new(PendingLink::new(tx));

        {
            let pending = pending.clone();
            let timer = self.timer.clone();
            let weak = Arc::downgrade(&link);
            let address = address.to_string();
            link.on_remote_open(Box::new(move |result| {
                on_remote_open(&pending, &*timer, &weak, result, address, close_hook);
            }));
        }

        let timeout = self.config.link_establishment_timeout;
        let timer_id = {
            let pending = pending.clone();
            let link = link.clone();
            let address = address.to_string();
            self.timer.schedule(
                timeout,
                Box::new(move || on_timeout(&pending, &*link, &address, timeout)),
            )
        };
        pending.set_timer(timer_id);

        pending.ensure_open(&*link);
        Establishment { receiver: rx }
    }
}

fn on_remote_open<L>(
    pending: &PendingLink<L>,
    timer: &dyn Timer,
    link: &Weak<L>,
    result: Result<(), EngineError>,
    address: String,
    close_hook: Option<CloseHook>,
) where
    L: Link + ?Sized,
{
    if !pending.claim(result.is_ok()) {
        debug!(address = %address, "Ignoring attach answer after deadline");
        return;
    }
    // the armed deadline holds the link, so upgrade before cancelling it
    let upgraded = link.upgrade();
    if let Some(id) = pending.take_timer() {
        timer.cancel(id);
    }
    let Some(link) = upgraded else {
        pending.deliver(Err(
            ServiceInvocationError::unavailable("link dropped during establishment").into(),
        ));
        return;
    };

    match result {
        Ok(()) => {
            debug!(address = %address, link = %link.name(), "Link established");
            if let Some(hook) = close_hook {
                let hook_address = address.clone();
                link.on_remote_close(Box::new(move |_| hook(hook_address)));
            }
            pending.deliver(Ok(link));
        }
        Err(error) => {
            let condition = link.remote_condition().filter(|c| !c.condition.is_empty());
            let failure = match condition {
                Some(condition) => {
                    debug!(address = %address, %condition, "Peer refused link");
                    ServiceInvocationError::from_condition(&condition)
                }
                None => {
                    debug!(address = %address, %error, "Peer refused link without condition");
                    ServiceInvocationError::not_found(format!("no link to {address}"))
                }
            };
            pending.deliver(Err(failure.into()));
        }
    }
}

fn on_timeout<L>(pending: &PendingLink<L>, link: &L, address: &str, timeout: Duration)
where
    L: Link + ?Sized,
{
    if !pending.claim(false) {
        return;
    }
    pending.take_timer();
    warn!(
        address,
        timeout_ms = timeout.as_millis() as u64,
        "Peer did not answer attach in time"
    );
    pending.ensure_open(link);
    link.close();
    link.free();
    pending.deliver(Err(ServiceInvocationError::unavailable(format!(
        "no answer to attach of {address} within {timeout:?}"
    ))
    .into()));
}
