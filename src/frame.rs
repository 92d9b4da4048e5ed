//! Typed wire frames relevant to the request-stream responder.
//!
//! Frames are described by their semantic fields only. Turning bytes into
//! [`Frame`] values (and back) belongs to the transport codec; the constants
//! here exist so that size checks agree with what that codec will produce.

use std::fmt;

use static_assertions::const_assert;

use crate::payload::Payload;

/// Size of the length prefix that precedes every frame on a stream transport.
pub const FRAME_LENGTH_SIZE: usize = 3;
/// Size of the frame header: stream id plus frame type and flags.
pub const FRAME_HEADER_SIZE: usize = 6;
/// Size of the metadata length field inside a frame body.
pub const METADATA_LENGTH_SIZE: usize = 3;
/// Largest value representable by the 24-bit frame length prefix.
pub const FRAME_LENGTH_MASK: usize = 0xFF_FFFF;
/// Largest metadata section a single frame can describe.
pub const MAX_METADATA_LENGTH: usize = 0xFF_FFFF;
/// Smallest accepted non-zero MTU.
pub const MIN_MTU_SIZE: usize = 64;

const_assert!(FRAME_HEADER_SIZE + METADATA_LENGTH_SIZE < MIN_MTU_SIZE);
const_assert!(MIN_MTU_SIZE <= FRAME_LENGTH_MASK);

/// Connection-scoped stream identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u32);

impl StreamId {
    /// The connection-level stream, never used by request streams.
    pub const CONNECTION: StreamId = StreamId(0);

    /// Create a new [`StreamId`].
    #[must_use]
    pub const fn new(id: u32) -> Self { Self(id) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }

    /// Whether this is the connection-level stream.
    #[must_use]
    pub const fn is_connection(self) -> bool { self.0 == 0 }
}

impl From<u32> for StreamId {
    fn from(value: u32) -> Self { Self(value) }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Error codes carried by ERROR frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidSetup,
    UnsupportedSetup,
    RejectedSetup,
    RejectedResume,
    ConnectionError,
    ConnectionClose,
    ApplicationError,
    Rejected,
    Canceled,
    Invalid,
    /// A code outside the reserved table, typically application defined.
    Custom(u32),
}

impl ErrorCode {
    /// Numeric value placed on the wire.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            ErrorCode::InvalidSetup => 0x0001,
            ErrorCode::UnsupportedSetup => 0x0002,
            ErrorCode::RejectedSetup => 0x0003,
            ErrorCode::RejectedResume => 0x0004,
            ErrorCode::ConnectionError => 0x0101,
            ErrorCode::ConnectionClose => 0x0102,
            ErrorCode::ApplicationError => 0x0201,
            ErrorCode::Rejected => 0x0202,
            ErrorCode::Canceled => 0x0203,
            ErrorCode::Invalid => 0x0204,
            ErrorCode::Custom(code) => code,
        }
    }

}

impl From<u32> for ErrorCode {
    fn from(value: u32) -> Self {
        match value {
            0x0001 => ErrorCode::InvalidSetup,
            0x0002 => ErrorCode::UnsupportedSetup,
            0x0003 => ErrorCode::RejectedSetup,
            0x0004 => ErrorCode::RejectedResume,
            0x0101 => ErrorCode::ConnectionError,
            0x0102 => ErrorCode::ConnectionClose,
            0x0201 => ErrorCode::ApplicationError,
            0x0202 => ErrorCode::Rejected,
            0x0203 => ErrorCode::Canceled,
            0x0204 => ErrorCode::Invalid,
            other => ErrorCode::Custom(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:#06x}", self.as_u32()) }
}

/// Discriminant of a [`Frame`], used for logging and metrics labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
    RequestStream,
    Payload,
    Error,
    RequestN,
    Cancel,
}

/// A PAYLOAD frame and its flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadFrame {
    pub stream_id: StreamId,
    pub payload: Payload,
    /// More fragments of the same payload follow.
    pub follows: bool,
    /// The stream is complete after this frame.
    pub complete: bool,
    /// The frame carries a payload item.
    pub next: bool,
}

/// Wire frames exchanged on a request stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    RequestStream {
        stream_id: StreamId,
        initial_request_n: u32,
        payload: Payload,
        follows: bool,
    },
    Payload(PayloadFrame),
    Error {
        stream_id: StreamId,
        code: ErrorCode,
        message: String,
    },
    RequestN {
        stream_id: StreamId,
        n: u32,
    },
    Cancel {
        stream_id: StreamId,
    },
}

impl Frame {
    /// A NEXT frame, optionally marked as followed by more fragments.
    #[must_use]
    pub fn next(stream_id: StreamId, payload: Payload, follows: bool) -> Self {
        Frame::Payload(PayloadFrame {
            stream_id,
            payload,
            follows,
            complete: false,
            next: true,
        })
    }

    /// A bare COMPLETE frame with no payload.
    #[must_use]
    pub fn complete(stream_id: StreamId) -> Self {
        Frame::Payload(PayloadFrame {
            stream_id,
            payload: Payload::default(),
            follows: false,
            complete: true,
            next: false,
        })
    }

    /// An ERROR frame.
    #[must_use]
    pub fn error(stream_id: StreamId, code: ErrorCode, message: impl Into<String>) -> Self {
        Frame::Error {
            stream_id,
            code,
            message: message.into(),
        }
    }

    /// Stream the frame belongs to.
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        match self {
            Frame::RequestStream { stream_id, .. }
            | Frame::Error { stream_id, .. }
            | Frame::RequestN { stream_id, .. }
            | Frame::Cancel { stream_id } => *stream_id,
            Frame::Payload(frame) => frame.stream_id,
        }
    }

    /// Discriminant of this frame.
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::RequestStream { .. } => FrameType::RequestStream,
            Frame::Payload(_) => FrameType::Payload,
            Frame::Error { .. } => FrameType::Error,
            Frame::RequestN { .. } => FrameType::RequestN,
            Frame::Cancel { .. } => FrameType::Cancel,
        }
    }

    /// Whether this frame ends the stream from the responder's side.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Frame::Payload(frame) => frame.complete,
            Frame::Error { .. } | Frame::Cancel { .. } => true,
            Frame::RequestStream { .. } | Frame::RequestN { .. } => false,
        }
    }
}
