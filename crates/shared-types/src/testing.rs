//! In-memory engine doubles.
//!
//! Enable with the `test-utils` feature flag. Each mock records the calls
//! made on it and exposes `fire_*` methods that play the remote peer.
//!
//! # Example
//!
//! ```rust,ignore
//! use shared_types::amqp::Link;
//! use shared_types::testing::MockLink;
//!
//! let link = MockLink::receiver("telemetry/tenant");
//! link.open();
//! link.close();
//! assert_eq!(link.calls(), vec!["open", "close"]);
//! ```

use crate::amqp::{
    Attachments, CloseHandler, Connection, ConnectionEventHandler, Delivery, DeliveryState,
    EngineError, ErrorCondition, Link, LinkRole, Message, MessageHandler, OpenHandler, QoS,
    ReceiverLink, SenderLink, Session,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

static LINK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A link that can act as either a sender or a receiver.
pub struct MockLink {
    role: LinkRole,
    name: String,
    remote_address: Option<String>,
    local_address: Mutex<Option<String>>,
    qos: Mutex<QoS>,
    remote_condition: Mutex<Option<ErrorCondition>>,
    condition: Mutex<Option<ErrorCondition>>,
    attachments: Attachments,
    open_handler: Mutex<Option<OpenHandler>>,
    close_handler: Mutex<Option<CloseHandler>>,
    message_handler: Mutex<Option<MessageHandler>>,
    calls: Mutex<Vec<&'static str>>,
    opened: AtomicBool,
    auto_accept: AtomicBool,
    prefetch: AtomicU32,
    credit: AtomicU32,
    sent: Mutex<Vec<Message>>,
}

impl MockLink {
    fn build(role: LinkRole, remote_address: Option<&str>) -> Arc<Self> {
        let n = LINK_COUNTER.fetch_add(1, Ordering::Relaxed);
        Arc::new(Self {
            role,
            name: format!("mock-link-{n}"),
            remote_address: remote_address.map(str::to_string),
            local_address: Mutex::new(None),
            qos: Mutex::new(QoS::default()),
            remote_condition: Mutex::new(None),
            condition: Mutex::new(None),
            attachments: Attachments::new(),
            open_handler: Mutex::new(None),
            close_handler: Mutex::new(None),
            message_handler: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            opened: AtomicBool::new(false),
            auto_accept: AtomicBool::new(false),
            prefetch: AtomicU32::new(0),
            credit: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// A receiver link whose peer offered `target`.
    pub fn receiver(target: &str) -> Arc<Self> {
        Self::build(LinkRole::Receiver, Some(target))
    }

    /// A sender link whose peer offered `source`.
    pub fn sender(source: &str) -> Arc<Self> {
        Self::build(LinkRole::Sender, Some(source))
    }

    /// A link with an anonymous remote terminus.
    pub fn anonymous(role: LinkRole) -> Arc<Self> {
        Self::build(role, None)
    }

    /// `open`, `close` and `free` calls in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    /// Condition set locally before closing.
    pub fn local_condition(&self) -> Option<ErrorCondition> {
        self.condition.lock().clone()
    }

    pub fn set_remote_condition(&self, condition: Option<ErrorCondition>) {
        *self.remote_condition.lock() = condition;
    }

    pub fn has_open_handler(&self) -> bool {
        self.open_handler.lock().is_some()
    }

    pub fn auto_accept(&self) -> bool {
        self.auto_accept.load(Ordering::SeqCst)
    }

    pub fn prefetch(&self) -> u32 {
        self.prefetch.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    /// Play the peer's attach (or refusal). Returns false if no handler
    /// was registered.
    pub fn fire_remote_open(&self, result: Result<(), EngineError>) -> bool {
        let handler = self.open_handler.lock().take();
        match handler {
            Some(handler) => {
                handler(result);
                true
            }
            None => false,
        }
    }

    /// Play the peer's detach.
    pub fn fire_remote_close(&self, result: Result<(), EngineError>) -> bool {
        let handler = self.close_handler.lock().take();
        match handler {
            Some(handler) => {
                handler(result);
                true
            }
            None => false,
        }
    }

    /// Play an incoming transfer.
    pub fn deliver(&self, delivery: Arc<dyn Delivery>, message: Message) -> bool {
        let handler = self.message_handler.lock().clone();
        match handler {
            Some(handler) => {
                handler(delivery, message);
                true
            }
            None => false,
        }
    }
}

impl Link for MockLink {
    fn role(&self) -> LinkRole {
        self.role
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn remote_address(&self) -> Option<String> {
        self.remote_address.clone()
    }

    fn local_address(&self) -> Option<String> {
        self.local_address.lock().clone()
    }

    fn set_local_address(&self, address: Option<String>) {
        *self.local_address.lock() = address;
    }

    fn qos(&self) -> QoS {
        *self.qos.lock()
    }

    fn set_qos(&self, qos: QoS) {
        *self.qos.lock() = qos;
    }

    fn remote_condition(&self) -> Option<ErrorCondition> {
        self.remote_condition.lock().clone()
    }

    fn set_condition(&self, condition: Option<ErrorCondition>) {
        *self.condition.lock() = condition;
    }

    fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    fn on_remote_open(&self, handler: OpenHandler) {
        *self.open_handler.lock() = Some(handler);
    }

    fn on_remote_close(&self, handler: CloseHandler) {
        *self.close_handler.lock() = Some(handler);
    }

    fn open(&self) {
        self.calls.lock().push("open");
        self.opened.store(true, Ordering::SeqCst);
    }

    fn close(&self) {
        self.calls.lock().push("close");
        self.opened.store(false, Ordering::SeqCst);
    }

    fn free(&self) {
        self.calls.lock().push("free");
    }

    fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }
}

impl SenderLink for MockLink {
    fn send(&self, message: Message) -> Result<(), EngineError> {
        if !self.is_open() {
            return Err(EngineError::Transport("link not open".into()));
        }
        self.sent.lock().push(message);
        Ok(())
    }

    fn credit(&self) -> u32 {
        self.credit.load(Ordering::SeqCst)
    }
}

impl ReceiverLink for MockLink {
    fn set_auto_accept(&self, auto_accept: bool) {
        self.auto_accept.store(auto_accept, Ordering::SeqCst);
    }

    fn set_prefetch(&self, credits: u32) {
        self.prefetch.store(credits, Ordering::SeqCst);
    }

    fn flow(&self, credits: u32) {
        self.credit.fetch_add(credits, Ordering::SeqCst);
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.message_handler.lock() = Some(handler);
    }
}

/// A delivery recording every disposition.
#[derive(Default)]
pub struct MockDelivery {
    dispositions: Mutex<Vec<(DeliveryState, bool)>>,
    settled: AtomicBool,
}

impl MockDelivery {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn dispositions(&self) -> Vec<(DeliveryState, bool)> {
        self.dispositions.lock().clone()
    }
}

impl Delivery for MockDelivery {
    fn tag(&self) -> Vec<u8> {
        vec![0]
    }

    fn disposition(&self, state: DeliveryState, settle: bool) {
        self.dispositions.lock().push((state, settle));
        if settle {
            self.settled.store(true, Ordering::SeqCst);
        }
    }

    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MockSession {
    calls: Mutex<Vec<&'static str>>,
    close_handler: Mutex<Option<CloseHandler>>,
}

impl MockSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn fire_remote_close(&self) -> bool {
        let handler = self.close_handler.lock().take();
        match handler {
            Some(handler) => {
                handler(Ok(()));
                true
            }
            None => false,
        }
    }
}

impl Session for MockSession {
    fn open(&self) {
        self.calls.lock().push("open");
    }

    fn close(&self) {
        self.calls.lock().push("close");
    }

    fn on_remote_close(&self, handler: CloseHandler) {
        *self.close_handler.lock() = Some(handler);
    }
}

/// A connection playing both the engine and the remote peer.
#[derive(Default)]
pub struct MockConnection {
    remote_container: Option<String>,
    subject: Option<String>,
    container: Mutex<Option<String>>,
    attachments: Attachments,
    handler: Mutex<Option<Arc<dyn ConnectionEventHandler>>>,
    calls: Mutex<Vec<&'static str>>,
    refuse_links: AtomicBool,
    links: Mutex<Vec<Arc<MockLink>>>,
}

impl MockConnection {
    /// A connection without SASL principal.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            remote_container: Some("mock-client".into()),
            ..Self::default()
        })
    }

    /// A connection authenticated as `subject`.
    pub fn with_subject(subject: &str) -> Arc<Self> {
        Arc::new(Self {
            remote_container: Some("mock-client".into()),
            subject: Some(subject.to_string()),
            ..Self::default()
        })
    }

    /// Make `create_sender`/`create_receiver` fail.
    pub fn refuse_links(&self) {
        self.refuse_links.store(true, Ordering::SeqCst);
    }

    /// `open`, `close` and `disconnect` calls in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn container(&self) -> Option<String> {
        self.container.lock().clone()
    }

    pub fn has_event_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Links created through `create_sender`/`create_receiver`.
    pub fn created_links(&self) -> Vec<Arc<MockLink>> {
        self.links.lock().clone()
    }

    fn handler(&self) -> Option<Arc<dyn ConnectionEventHandler>> {
        self.handler.lock().clone()
    }

    pub fn fire_remote_open(self: &Arc<Self>) {
        if let Some(handler) = self.handler() {
            handler.on_remote_open(self.clone());
        }
    }

    pub fn fire_session_open(self: &Arc<Self>, session: Arc<MockSession>) {
        if let Some(handler) = self.handler() {
            handler.on_session_open(self.clone(), session);
        }
    }

    pub fn fire_receiver_open(self: &Arc<Self>, link: Arc<MockLink>) {
        if let Some(handler) = self.handler() {
            handler.on_receiver_open(self.clone(), link);
        }
    }

    pub fn fire_sender_open(self: &Arc<Self>, link: Arc<MockLink>) {
        if let Some(handler) = self.handler() {
            handler.on_sender_open(self.clone(), link);
        }
    }

    pub fn fire_remote_close(self: &Arc<Self>, result: Result<(), EngineError>) {
        if let Some(handler) = self.handler() {
            handler.on_remote_close(self.clone(), result);
        }
    }

    pub fn fire_disconnect(self: &Arc<Self>) {
        if let Some(handler) = self.handler() {
            handler.on_disconnect(self.clone());
        }
    }
}

impl Connection for MockConnection {
    fn remote_container(&self) -> Option<String> {
        self.remote_container.clone()
    }

    fn set_container(&self, container: String) {
        *self.container.lock() = Some(container);
    }

    fn authenticated_subject(&self) -> Option<String> {
        self.subject.clone()
    }

    fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    fn set_event_handler(&self, handler: Arc<dyn ConnectionEventHandler>) {
        *self.handler.lock() = Some(handler);
    }

    fn create_sender(&self, target: &str) -> Result<Arc<dyn SenderLink>, EngineError> {
        if self.refuse_links.load(Ordering::SeqCst) {
            return Err(EngineError::ConnectionClosed);
        }
        let link = MockLink::build(LinkRole::Sender, Some(target));
        self.links.lock().push(link.clone());
        Ok(link)
    }

    fn create_receiver(&self, source: &str) -> Result<Arc<dyn ReceiverLink>, EngineError> {
        if self.refuse_links.load(Ordering::SeqCst) {
            return Err(EngineError::ConnectionClosed);
        }
        let link = MockLink::build(LinkRole::Receiver, Some(source));
        self.links.lock().push(link.clone());
        Ok(link)
    }

    fn open(&self) {
        self.calls.lock().push("open");
    }

    fn close(&self) {
        self.calls.lock().push("close");
    }

    fn disconnect(&self) {
        self.calls.lock().push("disconnect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_handler_fires_once() {
        let link = MockLink::receiver("telemetry/tenant");
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        link.on_remote_open(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(link.fire_remote_open(Ok(())));
        assert!(!link.fire_remote_open(Ok(())));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refused_links() {
        let connection = MockConnection::new();
        connection.refuse_links();
        assert!(connection.create_sender("a/b").is_err());
        assert!(connection.created_links().is_empty());
    }
}
