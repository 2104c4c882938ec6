use thiserror::Error;

/// Reasons a message is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCommand {
    #[error("message has no correlation id")]
    MissingCorrelationId,

    #[error("message has no reply-to address")]
    MissingReplyTo,

    #[error("malformed reply-to address [{reply_to}]")]
    MalformedReplyTo { reply_to: String },

    #[error("reply-to address [{reply_to}] does not match tenant [{tenant_id}] and device [{device_id}]")]
    NonMatchingReplyTo {
        reply_to: String,
        tenant_id: String,
        device_id: String,
    },
}
