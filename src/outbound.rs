//! Unbounded, order-preserving sink for frames destined for the wire.
//!
//! Stream state machines push frames through a cloneable [`OutboundSender`];
//! the connection writer drains the matching [`OutboundReceiver`]. Frames are
//! transferred in batches so that all fragments of one payload reach the
//! receiver contiguously even when several streams enqueue concurrently.
//! Enqueueing never blocks or awaits.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::debug;

use crate::{fragment::SendError, frame::Frame, metrics};

/// Create a connected sender/receiver pair.
#[must_use]
pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        OutboundSender { tx },
        OutboundReceiver {
            rx,
            pending: VecDeque::new(),
        },
    )
}

/// Cloneable producer handle for outbound frames.
#[derive(Clone, Debug)]
pub struct OutboundSender {
    tx: mpsc::UnboundedSender<Vec<Frame>>,
}

impl OutboundSender {
    /// Enqueue a single frame.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Closed`] if the receiver has been dropped.
    pub fn enqueue(&self, frame: Frame) -> Result<(), SendError> { self.enqueue_batch(vec![frame]) }

    /// Enqueue `frames` as one contiguous run.
    ///
    /// No frame from another producer is delivered between the first and the
    /// last frame of the batch.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Closed`] if the receiver has been dropped; in that
    /// case none of the frames were enqueued.
    pub fn enqueue_batch(&self, frames: Vec<Frame>) -> Result<(), SendError> {
        if frames.is_empty() {
            return Ok(());
        }
        let count = frames.len();
        self.tx.send(frames).map_err(|_| SendError::Closed)?;
        metrics::inc_frames_outbound(count);
        debug!(count, "frames enqueued");
        Ok(())
    }

    /// Whether the receiving side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.tx.is_closed() }
}

/// Consumer side of the outbound channel.
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::UnboundedReceiver<Vec<Frame>>,
    pending: VecDeque<Frame>,
}

impl OutboundReceiver {
    /// Receive the next frame, waiting until one is available.
    ///
    /// Returns `None` once every sender has been dropped and all frames were
    /// delivered.
    pub async fn recv(&mut self) -> Option<Frame> {
        if let Some(frame) = self.pending.pop_front() {
            return Some(frame);
        }
        let batch = self.rx.recv().await?;
        self.pending.extend(batch);
        self.pending.pop_front()
    }

    /// Receive the next frame without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        if let Some(frame) = self.pending.pop_front() {
            return Some(frame);
        }
        let batch = self.rx.try_recv().ok()?;
        self.pending.extend(batch);
        self.pending.pop_front()
    }

    /// Collect every frame that is currently available without waiting.
    pub fn drain(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Close the channel; subsequent enqueues fail with [`SendError::Closed`].
    pub fn close(&mut self) { self.rx.close(); }
}
