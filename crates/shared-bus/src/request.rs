//! # Request/Reply
//!
//! Point-to-point exchanges over the bus. The requester sends a JSON body
//! to an address and waits, bounded by a deadline, for exactly one reply
//! from the consumer registered on that address.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Request/reply failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No consumer is registered on the address.
    #[error("no handlers for address {address}")]
    NoHandlers { address: String },

    /// The consumer did not answer in time.
    #[error("request to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    /// The consumer dropped the request without answering.
    #[error("consumer on {address} dropped the request")]
    ReplyDropped { address: String },
}

/// Sends requests expecting a single reply.
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn request(
        &self,
        address: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, RequestError>;
}

/// A request as seen by its consumer.
#[derive(Debug)]
pub struct BusRequest {
    address: String,
    body: serde_json::Value,
    reply: oneshot::Sender<serde_json::Value>,
}

impl BusRequest {
    pub(crate) fn new(
        address: &str,
        body: serde_json::Value,
        reply: oneshot::Sender<serde_json::Value>,
    ) -> Self {
        Self {
            address: address.to_string(),
            body,
            reply,
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// Answer the request. Returns false if the requester gave up.
    pub fn reply(self, body: serde_json::Value) -> bool {
        self.reply.send(body).is_ok()
    }
}
