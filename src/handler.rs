//! Application-facing handler contract.
//!
//! A [`RequestStreamHandler`] answers one request payload with a lazy
//! [`PayloadStream`]. The responder is the stream's only consumer and polls it
//! only while the peer has outstanding credit.

use std::pin::Pin;

use futures::stream::Stream;

use crate::{error::ApplicationError, payload::Payload};

/// A type alias for a type-erased, dynamically dispatched stream of response
/// payloads.
///
/// Ending the stream completes the request stream; yielding an `Err` ends it
/// with an ERROR frame carrying the error's code and message.
pub type PayloadStream =
    Pin<Box<dyn Stream<Item = Result<Payload, ApplicationError>> + Send + 'static>>;

/// Produces the response sequence for a request-stream interaction.
pub trait RequestStreamHandler: Send + Sync + 'static {
    /// Start answering `payload`.
    ///
    /// The returned stream must not do work until polled.
    fn request_stream(&self, payload: Payload) -> PayloadStream;
}

impl<F> RequestStreamHandler for F
where
    F: Fn(Payload) -> PayloadStream + Send + Sync + 'static,
{
    fn request_stream(&self, payload: Payload) -> PayloadStream { self(payload) }
}
