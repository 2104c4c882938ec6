//! # Event Publisher
//!
//! The publishing side of the bus and the in-memory bus itself.

use crate::events::{EventFilter, GatewayEvent};
use crate::request::{BusRequest, RequestError, RequestSender};
use crate::subscriber::{EventSubscriber, Subscription};
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_CONSUMER_CAPACITY};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event.
    ///
    /// Returns the number of active subscribers that received it.
    async fn publish(&self, event: GatewayEvent) -> usize;
}

/// In-memory implementation of the bus.
///
/// Events use `tokio::sync::broadcast`; requests go through one bounded
/// `mpsc` queue per consumer address.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<GatewayEvent>,
    consumers: DashMap<String, mpsc::Sender<BusRequest>>,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            sender,
            consumers: DashMap::new(),
        }
    }

    /// Register the consumer answering requests sent to `address`.
    ///
    /// A later registration on the same address replaces the earlier one.
    /// Dropping the receiver unregisters the consumer.
    pub fn register_consumer(&self, address: &str) -> mpsc::Receiver<BusRequest> {
        let (tx, rx) = mpsc::channel(DEFAULT_CONSUMER_CAPACITY);
        if self.consumers.insert(address.to_string(), tx).is_some() {
            warn!(address, "Replaced existing consumer");
        } else {
            debug!(address, "Consumer registered");
        }
        rx
    }

    fn consumer(&self, address: &str) -> Option<mpsc::Sender<BusRequest>> {
        let consumer = self.consumers.get(address).map(|c| c.clone())?;
        if consumer.is_closed() {
            self.consumers.remove(address);
            return None;
        }
        Some(consumer)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        debug!(addresses = ?filter.addresses, "New subscription created");
        Subscription::new(receiver, filter)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: GatewayEvent) -> usize {
        let address = event.address();

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(address, receivers, "Event published");
                receivers
            }
            Err(_) => {
                debug!(address, "Event dropped (no subscribers)");
                0
            }
        }
    }
}

#[async_trait]
impl RequestSender for InMemoryEventBus {
    async fn request(
        &self,
        address: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, RequestError> {
        let consumer = self.consumer(address).ok_or_else(|| RequestError::NoHandlers {
            address: address.to_string(),
        })?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = BusRequest::new(address, body, reply_tx);

        let exchange = async {
            consumer
                .send(request)
                .await
                .map_err(|_| RequestError::NoHandlers {
                    address: address.to_string(),
                })?;
            reply_rx.await.map_err(|_| RequestError::ReplyDropped {
                address: address.to_string(),
            })
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                debug!(address, timeout_ms = timeout.as_millis() as u64, "Request timed out");
                Err(RequestError::Timeout {
                    address: address.to_string(),
                    timeout,
                })
            }
        }
    }
}
