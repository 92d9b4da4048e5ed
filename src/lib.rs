#![doc(html_root_url = "https://docs.rs/wirestream/latest")]
//! Public API for the `wirestream` library.
//!
//! This crate implements the responder side of a multiplexed request-stream
//! protocol: inbound request reassembly, credit-driven delivery of an
//! application's payload stream, outbound fragmentation, and race-free stream
//! termination.

pub mod config;
pub mod connection;
pub mod error;
pub mod fragment;
pub mod frame;
pub mod handler;
pub mod metrics;
pub mod outbound;
pub mod payload;
pub mod registry;
pub mod responder;
pub mod subscription;

pub use config::{ConfigError, ResponderConfig, ResponderConfigBuilder};
pub use connection::ResponderConnection;
pub use error::{ApplicationError, StreamError};
pub use fragment::{
    DefaultPayloadDecoder,
    FragmentStatus,
    Outgoing,
    PayloadDecoder,
    PayloadSender,
    ReassemblyBuffer,
    ReassemblyError,
    SendError,
};
pub use frame::{ErrorCode, Frame, FrameType, PayloadFrame, StreamId};
pub use handler::{PayloadStream, RequestStreamHandler};
pub use metrics::{FRAMES_OUTBOUND, STREAM_TERMINATIONS, STREAMS_ACTIVE};
pub use outbound::{OutboundReceiver, OutboundSender, outbound_channel};
pub use payload::Payload;
pub use registry::{ActiveStreams, StreamRegistry};
pub use responder::{
    FrameHandler,
    Outcome,
    RequestStreamResponder,
    ResponderSupport,
    StreamState,
    SubscriptionSlot,
};
pub use subscription::{Subscriber, Subscription};
