//! Outbound helper that splits payloads into MTU-sized frames.
//!
//! [`PayloadSender`] turns one [`Outgoing`] emission into the PAYLOAD frames
//! that carry it and hands them to the outbound channel as a single batch.
//! Payloads that fit within the MTU (or all payloads when fragmentation is
//! disabled with an MTU of zero) travel as one frame.

use super::SendError;
use crate::{
    frame::{
        FRAME_HEADER_SIZE,
        FRAME_LENGTH_SIZE,
        Frame,
        MAX_METADATA_LENGTH,
        METADATA_LENGTH_SIZE,
        MIN_MTU_SIZE,
        PayloadFrame,
        StreamId,
    },
    outbound::OutboundSender,
    payload::Payload,
};

/// What a responder asks the sender to put on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    /// One payload item.
    Next(Payload),
    /// Bare completion without a payload.
    Complete,
}

/// Splits outbound payloads into frames and enqueues them.
#[derive(Clone, Debug)]
pub struct PayloadSender {
    outbound: OutboundSender,
    max_frame_length: usize,
}

impl PayloadSender {
    /// Create a sender enforcing `max_frame_length` on unfragmented frames.
    #[must_use]
    pub fn new(outbound: OutboundSender, max_frame_length: usize) -> Self {
        Self {
            outbound,
            max_frame_length,
        }
    }

    /// Borrow the underlying outbound channel.
    #[must_use]
    pub fn outbound(&self) -> &OutboundSender { &self.outbound }

    /// Frame `outgoing` for `stream_id` and enqueue the result.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::InvalidPayload`] when the payload cannot be framed
    /// within the limits (nothing is enqueued and the payload is dropped), or
    /// [`SendError::Closed`] when the outbound channel is gone.
    pub fn send(&self, stream_id: StreamId, mtu: usize, outgoing: Outgoing) -> Result<(), SendError> {
        let frames = self.build_frames(stream_id, mtu, outgoing)?;
        self.outbound.enqueue_batch(frames)
    }

    /// Build the frames for `outgoing` without enqueueing them.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::InvalidPayload`] under the same conditions as
    /// [`PayloadSender::send`].
    pub fn build_frames(
        &self,
        stream_id: StreamId,
        mtu: usize,
        outgoing: Outgoing,
    ) -> Result<Vec<Frame>, SendError> {
        let payload = match outgoing {
            Outgoing::Complete => return Ok(vec![Frame::complete(stream_id)]),
            Outgoing::Next(payload) => payload,
        };
        self.validate(mtu, &payload)?;

        if mtu == 0 || payload.encoded_frame_len() <= mtu {
            return Ok(vec![Frame::Payload(PayloadFrame {
                stream_id,
                payload,
                follows: false,
                complete: false,
                next: true,
            })]);
        }
        Ok(fragment(stream_id, mtu, payload))
    }

    fn validate(&self, mtu: usize, payload: &Payload) -> Result<(), SendError> {
        if payload.metadata_len() > MAX_METADATA_LENGTH {
            return Err(SendError::InvalidPayload {
                reason: format!(
                    "metadata of {} bytes exceeds {MAX_METADATA_LENGTH}",
                    payload.metadata_len()
                ),
            });
        }
        if mtu != 0 && mtu < MIN_MTU_SIZE {
            return Err(SendError::InvalidPayload {
                reason: format!("mtu {mtu} is below the minimum of {MIN_MTU_SIZE}"),
            });
        }
        if mtu == 0 {
            let frame_len = FRAME_LENGTH_SIZE + payload.encoded_frame_len();
            if frame_len > self.max_frame_length {
                return Err(SendError::InvalidPayload {
                    reason: format!(
                        "frame of {frame_len} bytes exceeds max frame length {}",
                        self.max_frame_length
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Split `payload` into frames whose encoded size never exceeds `mtu`.
///
/// Metadata is sent before data and each frame that still carries metadata
/// pays for the metadata length field. Empty metadata still rides on the
/// first frame so the peer sees the metadata flag. `mtu` must leave room for
/// at least one payload byte after the header overhead.
fn fragment(stream_id: StreamId, mtu: usize, payload: Payload) -> Vec<Frame> {
    let (mut metadata, mut data) = payload.into_parts();
    let mut frames = Vec::new();

    loop {
        let mut budget = mtu - FRAME_HEADER_SIZE;
        let chunk_metadata = metadata.take().map(|mut remaining| {
            budget -= METADATA_LENGTH_SIZE;
            let take = remaining.len().min(budget);
            let chunk = remaining.split_to(take);
            budget -= take;
            if !remaining.is_empty() {
                metadata = Some(remaining);
            }
            chunk
        });
        let chunk_data = data.split_to(data.len().min(budget));

        let last = metadata.is_none() && data.is_empty();
        frames.push(Frame::Payload(PayloadFrame {
            stream_id,
            payload: Payload::new(chunk_metadata, chunk_data),
            follows: !last,
            complete: false,
            next: true,
        }));
        if last {
            return frames;
        }
    }
}
