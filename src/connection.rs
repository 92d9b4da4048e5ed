//! Inbound frame routing for the responder side of a connection.
//!
//! [`ResponderConnection`] turns REQUEST_STREAM frames into
//! [`RequestStreamResponder`]s, registers them in [`ActiveStreams`] and
//! dispatches follow-up frames to whichever handler owns the stream id.
//! Outbound frames flow through the [`OutboundSender`] the connection was
//! created with.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    config::{ConfigError, ResponderConfig},
    error::{ApplicationError, StreamError},
    fragment::PayloadDecoder,
    frame::{ErrorCode, Frame, PayloadFrame, StreamId},
    handler::RequestStreamHandler,
    outbound::OutboundSender,
    payload::Payload,
    registry::{ActiveStreams, StreamRegistry},
    responder::{FrameHandler, RequestStreamResponder, ResponderSupport},
};

/// Routes inbound frames to per-stream responders.
pub struct ResponderConnection {
    support: ResponderSupport,
    streams: Arc<ActiveStreams>,
    handler: Arc<dyn RequestStreamHandler>,
}

impl ResponderConnection {
    /// Create a connection that answers requests with `handler`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when `config` is outside the supported
    /// bounds, which can happen for deserialized configurations.
    pub fn new(
        config: ResponderConfig,
        outbound: OutboundSender,
        handler: Arc<dyn RequestStreamHandler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let streams = Arc::new(ActiveStreams::new());
        let support = ResponderSupport::new(
            config,
            outbound,
            Arc::clone(&streams) as Arc<dyn StreamRegistry>,
        );
        Ok(Self {
            support,
            streams,
            handler,
        })
    }

    /// Replace the decoder used for fragmented requests.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn PayloadDecoder>) -> Self {
        self.support = self.support.clone().with_decoder(decoder);
        self
    }

    /// Streams currently registered on this connection.
    #[must_use]
    pub fn streams(&self) -> &ActiveStreams { &self.streams }

    /// Route one inbound frame.
    ///
    /// # Panics
    ///
    /// Panics if a request must be started outside of a Tokio runtime.
    pub fn handle_frame(&self, frame: Frame) {
        match frame {
            Frame::RequestStream {
                stream_id,
                initial_request_n,
                payload,
                follows,
            } => self.handle_request(stream_id, initial_request_n, payload, follows),
            Frame::Payload(PayloadFrame {
                stream_id,
                payload,
                follows,
                complete,
                ..
            }) => {
                if let Some(handler) = self.lookup(stream_id, "PAYLOAD") {
                    handler.handle_next(payload, follows, complete);
                }
            }
            Frame::RequestN { stream_id, n } => {
                if let Some(handler) = self.lookup(stream_id, "REQUEST_N") {
                    handler.handle_request_n(n);
                }
            }
            Frame::Cancel { stream_id } => {
                if let Some(handler) = self.lookup(stream_id, "CANCEL") {
                    handler.handle_cancel();
                }
            }
            Frame::Error {
                stream_id,
                code,
                message,
            } => {
                if stream_id.is_connection() {
                    warn!(%code, %message, "connection error from peer");
                    self.dispose();
                } else if let Some(handler) = self.lookup(stream_id, "ERROR") {
                    handler.handle_error(ApplicationError::with_code(code, message));
                }
            }
        }
    }

    /// Cancel every active stream.
    pub fn dispose(&self) {
        let handlers = self.streams.handlers();
        if !handlers.is_empty() {
            info!(streams = handlers.len(), "disposing active streams");
        }
        for (_, handler) in handlers {
            handler.handle_cancel();
        }
    }

    fn lookup(&self, stream_id: StreamId, kind: &'static str) -> Option<Arc<dyn FrameHandler>> {
        let handler = self.streams.get(stream_id);
        if handler.is_none() {
            debug!(%stream_id, kind, "frame for unknown stream dropped");
        }
        handler
    }

    fn handle_request(
        &self,
        stream_id: StreamId,
        initial_request_n: u32,
        payload: Payload,
        follows: bool,
    ) {
        if stream_id.is_connection() {
            warn!("REQUEST_STREAM on the connection stream");
            self.reply_error(
                stream_id,
                ErrorCode::ConnectionError,
                "REQUEST_STREAM must not use stream 0",
            );
            return;
        }
        if self.streams.contains(stream_id) {
            warn!(%stream_id, "REQUEST_STREAM for an active stream dropped");
            return;
        }

        if follows {
            match RequestStreamResponder::reassembling(
                stream_id,
                initial_request_n,
                payload,
                self.support.clone(),
                Arc::clone(&self.handler),
            ) {
                Ok(responder) => {
                    self.register(&responder);
                }
                Err(error) => {
                    let error = StreamError::from(error);
                    debug!(%stream_id, %error, "first fragment rejected");
                    self.reply_error(stream_id, error.code(), error.to_string());
                }
            }
            return;
        }

        let responder =
            RequestStreamResponder::new(stream_id, initial_request_n, self.support.clone());
        if self.register(&responder) {
            responder.subscribe_to(self.handler.request_stream(payload));
        }
    }

    fn register(&self, responder: &Arc<RequestStreamResponder>) -> bool {
        let stream_id = responder.stream_id();
        let inserted = self
            .streams
            .insert(stream_id, Arc::clone(responder) as Arc<dyn FrameHandler>);
        if inserted {
            debug!(%stream_id, "stream registered");
        } else {
            warn!(%stream_id, "stream id already registered");
        }
        inserted
    }

    fn reply_error(&self, stream_id: StreamId, code: ErrorCode, message: impl Into<String>) {
        if let Err(error) = self
            .support
            .outbound()
            .enqueue(Frame::error(stream_id, code, message))
        {
            debug!(%stream_id, %error, "error frame dropped");
        }
    }
}

impl Drop for ResponderConnection {
    fn drop(&mut self) { self.dispose(); }
}
