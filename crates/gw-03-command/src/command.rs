use crate::error::InvalidCommand;
use shared_types::amqp::{Delivery, DeliveryState, Message, MessageId, ReceiverLink};
use shared_types::constants::COMMAND_ENDPOINT;
use shared_types::ResourceIdentifier;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Minimum reply-to segments: endpoint, tenant, device and one id segment.
const MIN_REPLY_TO_SEGMENTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandDetails {
    name: Option<String>,
    correlation_id: MessageId,
    reply_to_id: String,
}

/// A command message sent to a device.
///
/// Built once by [`Command::from`] and never mutated.
#[derive(Debug, Clone)]
pub struct Command {
    tenant_id: String,
    device_id: String,
    message: Message,
    details: Result<CommandDetails, InvalidCommand>,
}

impl Command {
    /// Validate `message` as a command for `tenant_id`/`device_id`.
    ///
    /// An invalid message is rejected and settled on `delivery` before this
    /// returns.
    pub fn from(
        receiver: &dyn ReceiverLink,
        delivery: &dyn Delivery,
        message: Message,
        tenant_id: &str,
        device_id: &str,
    ) -> Self {
        let details = validate(&message, tenant_id, device_id);

        match &details {
            Ok(details) => debug!(
                link = %receiver.name(),
                tenant_id,
                device_id,
                reply_to_id = %details.reply_to_id,
                "Received command"
            ),
            Err(reason) => {
                debug!(
                    link = %receiver.name(),
                    tenant_id,
                    device_id,
                    %reason,
                    "Rejecting invalid command"
                );
                delivery.disposition(DeliveryState::Rejected(None), true);
            }
        }

        Self {
            tenant_id: tenant_id.to_string(),
            device_id: device_id.to_string(),
            message,
            details,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.details.is_ok()
    }

    /// Why the message was rejected.
    #[must_use]
    pub fn invalid_reason(&self) -> Option<&InvalidCommand> {
        self.details.as_ref().err()
    }

    /// Command name, taken from the message subject.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.details.as_ref().ok()?.name.as_deref()
    }

    /// `<device-id>/<reply-id>...`
    #[must_use]
    pub fn reply_to_id(&self) -> Option<&str> {
        self.details
            .as_ref()
            .ok()
            .map(|d| d.reply_to_id.as_str())
    }

    #[must_use]
    pub fn correlation_id(&self) -> Option<&MessageId> {
        self.details.as_ref().ok().map(|d| &d.correlation_id)
    }

    /// Address the device's response is sent to:
    /// `control/<tenant>/<reply-to-id>`.
    #[must_use]
    pub fn response_address(&self) -> Option<String> {
        self.reply_to_id()
            .map(|id| format!("{COMMAND_ENDPOINT}/{}/{id}", self.tenant_id))
    }

    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        self.message.body.as_deref()
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.message.content_type.as_deref()
    }

    #[must_use]
    pub fn application_properties(&self) -> &BTreeMap<String, String> {
        &self.message.application_properties
    }

    /// Reply-to as sent, also for invalid commands.
    #[must_use]
    pub fn raw_reply_to(&self) -> Option<&str> {
        self.message.reply_to.as_deref()
    }

    /// Correlation id as sent, also for invalid commands.
    #[must_use]
    pub fn raw_correlation_id(&self) -> Option<&MessageId> {
        self.message.correlation_id.as_ref()
    }

    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Ok(d) => write!(
                f,
                "Command [name: {}, tenant-id: {}, device-id: {}, reply-to-id: {}, correlation-id: {}]",
                d.name.as_deref().unwrap_or("<none>"),
                self.tenant_id,
                self.device_id,
                d.reply_to_id,
                d.correlation_id
            ),
            Err(reason) => write!(
                f,
                "Invalid Command [tenant-id: {}, device-id: {}]: {}",
                self.tenant_id, self.device_id, reason
            ),
        }
    }
}

fn validate(
    message: &Message,
    tenant_id: &str,
    device_id: &str,
) -> Result<CommandDetails, InvalidCommand> {
    let correlation_id = message
        .correlation_id
        .clone()
        .ok_or(InvalidCommand::MissingCorrelationId)?;
    let reply_to = message
        .reply_to
        .as_deref()
        .ok_or(InvalidCommand::MissingReplyTo)?;

    let malformed = || InvalidCommand::MalformedReplyTo {
        reply_to: reply_to.to_string(),
    };
    let address = ResourceIdentifier::from_string(reply_to).map_err(|_| malformed())?;
    let path = address.resource_path();
    if path.len() < MIN_REPLY_TO_SEGMENTS {
        return Err(malformed());
    }

    if address.tenant_id() != tenant_id || address.resource_id() != Some(device_id) {
        return Err(InvalidCommand::NonMatchingReplyTo {
            reply_to: reply_to.to_string(),
            tenant_id: tenant_id.to_string(),
            device_id: device_id.to_string(),
        });
    }

    Ok(CommandDetails {
        name: message.subject.clone(),
        correlation_id,
        reply_to_id: path[2..].join("/"),
    })
}

#[cfg(test)]
mod tests;
