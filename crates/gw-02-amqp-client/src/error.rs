//! Establishment errors and the condition → status mapping.

use shared_types::amqp::condition::{
    BAD_REQUEST, DECODE_ERROR, INTERNAL_ERROR, NOT_ALLOWED, NOT_FOUND, NOT_IMPLEMENTED,
    PRECONDITION_FAILED, RESOURCE_LIMIT_EXCEEDED, UNAUTHORIZED_ACCESS,
};
use shared_types::amqp::{EngineError, ErrorCondition};
use thiserror::Error;

/// Failure of a service invocation, classified by HTTP-style status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceInvocationError {
    /// 4xx: attributable to the caller or the requested resource.
    #[error("client error ({code}): {message}")]
    Client { code: u16, message: String },

    /// 5xx: the service could not handle the request.
    #[error("server error ({code}): {message}")]
    Server { code: u16, message: String },
}

impl ServiceInvocationError {
    /// Classify by code: 5xx are server errors, everything else client.
    #[must_use]
    pub fn from_code(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if code >= 500 {
            Self::Server { code, message }
        } else {
            Self::Client { code, message }
        }
    }

    /// Map an error condition sent by the peer.
    #[must_use]
    pub fn from_condition(condition: &ErrorCondition) -> Self {
        let message = condition
            .description
            .clone()
            .unwrap_or_else(|| condition.condition.clone());
        Self::from_code(status_for_condition(&condition.condition), message)
    }

    /// The peer refused without saying why.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_code(404, message)
    }

    /// No timely answer from the peer.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::from_code(503, message)
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Client { code, .. } | Self::Server { code, .. } => *code,
        }
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }
}

fn status_for_condition(condition: &str) -> u16 {
    match condition {
        RESOURCE_LIMIT_EXCEEDED | UNAUTHORIZED_ACCESS | NOT_ALLOWED => 403,
        NOT_FOUND => 404,
        PRECONDITION_FAILED => 412,
        INTERNAL_ERROR => 500,
        NOT_IMPLEMENTED => 501,
        BAD_REQUEST | DECODE_ERROR => 400,
        _ => 400,
    }
}

/// Errors returned by the link establisher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The connection could not produce a link object.
    #[error("cannot create link: {0}")]
    Create(#[from] EngineError),

    /// The attempt ran but failed.
    #[error(transparent)]
    Invocation(#[from] ServiceInvocationError),
}

impl LinkError {
    /// Status code of an invocation failure.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Create(_) => None,
            Self::Invocation(e) => Some(e.status_code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_mapping() {
        let cases = [
            (RESOURCE_LIMIT_EXCEEDED, 403),
            (UNAUTHORIZED_ACCESS, 403),
            (NOT_FOUND, 404),
            (PRECONDITION_FAILED, 412),
            (INTERNAL_ERROR, 500),
            (NOT_IMPLEMENTED, 501),
            (DECODE_ERROR, 400),
            ("vendor:something-odd", 400),
        ];
        for (condition, code) in cases {
            let err = ServiceInvocationError::from_condition(&ErrorCondition::bare(condition));
            assert_eq!(err.status_code(), code, "{condition}");
        }
    }

    #[test]
    fn test_classification() {
        let err = ServiceInvocationError::from_condition(&ErrorCondition::new(
            INTERNAL_ERROR,
            "boom",
        ));
        assert_eq!(
            err,
            ServiceInvocationError::Server {
                code: 500,
                message: "boom".into()
            }
        );
        assert!(!ServiceInvocationError::not_found("x").is_server_error());
        assert!(ServiceInvocationError::unavailable("x").is_server_error());
    }

    #[test]
    fn test_link_error_status() {
        assert_eq!(LinkError::Create(EngineError::ConnectionClosed).status_code(), None);
        assert_eq!(
            LinkError::from(ServiceInvocationError::unavailable("t")).status_code(),
            Some(503)
        );
    }
}
