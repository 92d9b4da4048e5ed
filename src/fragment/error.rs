//! Error and status types emitted by the fragmentation layer.
//!
//! These enums keep the inbound reassembly and outbound fragmentation paths
//! decoupled from the stream state machine while still surfacing precise
//! diagnostics for tests and logs.

use std::num::NonZeroUsize;

use thiserror::Error;

/// Result of feeding a fragment into a
/// [`ReassemblyBuffer`](crate::fragment::ReassemblyBuffer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentStatus {
    /// The logical payload still expects more fragments.
    Incomplete,
    /// The fragment completed the logical payload.
    Complete,
}

/// Errors produced while reassembling an inbound payload.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// The reassembled payload would exceed the configured cap.
    #[error("reassembled payload of {attempted} bytes exceeds the {limit} byte limit")]
    Overflow {
        attempted: usize,
        limit: NonZeroUsize,
    },
    /// The accumulated fragments do not form a valid payload.
    #[error("{0}")]
    Decode(String),
}

/// Errors produced while sending an outbound payload.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The payload cannot be framed within the negotiated limits.
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },
    /// The outbound channel has been closed.
    #[error("outbound channel closed")]
    Closed,
}
