//! Stream-level error taxonomy.
//!
//! [`StreamError`] classifies every failure that can end a request stream and
//! knows which wire [`ErrorCode`] reports it. Transport-side failures
//! (validation, reassembly) are synthesised by the responder itself; only
//! [`ApplicationError`]s originate in the handler's payload stream.

use thiserror::Error;

use crate::{fragment::ReassemblyError, frame::ErrorCode};

/// Error raised by an application handler's payload stream.
///
/// The code defaults to [`ErrorCode::ApplicationError`]; the constructors
/// below cover the other codes an application may legitimately report.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ApplicationError {
    code: ErrorCode,
    message: String,
}

impl ApplicationError {
    /// A generic application error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::ApplicationError, message)
    }

    /// An error carrying an explicit wire code.
    #[must_use]
    pub fn with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The request was rejected before any work was done.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::Rejected, message)
    }

    /// The request was abandoned by the responder.
    #[must_use]
    pub fn canceled(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::Canceled, message)
    }

    /// The request was malformed.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::Invalid, message)
    }

    /// The connection is being closed.
    #[must_use]
    pub fn connection_close(message: impl Into<String>) -> Self {
        Self::with_code(ErrorCode::ConnectionClose, message)
    }

    /// Wire code reported to the peer.
    #[must_use]
    pub fn code(&self) -> ErrorCode { self.code }

    /// Message reported to the peer.
    #[must_use]
    pub fn message(&self) -> &str { &self.message }
}

/// Reasons a request stream terminates abnormally.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// A response payload exceeds the negotiated limits.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    /// A response payload was released or corrupted before it could be sent.
    #[error("Failed to validate payload. Cause: {0}")]
    ReferenceViolation(String),
    /// The inbound request could not be reassembled.
    #[error("Failed to reassemble payload. Cause: {0}")]
    Reassembly(#[from] ReassemblyError),
    /// The handler's payload stream ended with an error.
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

impl StreamError {
    /// Wire code used when reporting this error to the peer.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            StreamError::InvalidPayload(_)
            | StreamError::ReferenceViolation(_)
            | StreamError::Reassembly(_) => ErrorCode::Canceled,
            StreamError::Application(error) => error.code(),
        }
    }
}
