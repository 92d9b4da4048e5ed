//! Responder-side state machine for the request-stream interaction.
//!
//! A [`RequestStreamResponder`] owns one stream from its first inbound frame
//! until a terminal outcome. Three contexts drive it concurrently: the
//! connection's inbound path (fragments, REQUEST_N, CANCEL), the task polling
//! the handler's payload stream (items, completion, errors) and, on the
//! reassembly path, fragment validation. No lock serialises them. Every
//! terminal path first claims the [`SubscriptionSlot`] atomically; only the
//! winner deregisters the stream, releases the reassembly buffer and emits at
//! most one frame.

mod slot;
mod state;
mod support;

use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    OnceLock,
    PoisonError,
    Weak,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

pub use slot::{CancelOutcome, Rejected, SlotState, SubscriptionSlot};
pub use state::{Outcome, StreamState};
pub use support::ResponderSupport;
use tracing::{debug, warn};

use crate::{
    error::{ApplicationError, StreamError},
    fragment::{Outgoing, ReassemblyBuffer, ReassemblyError, SendError},
    frame::{Frame, StreamId},
    handler::{PayloadStream, RequestStreamHandler},
    metrics,
    payload::{self, Payload},
    subscription::{self, Subscriber, Subscription},
};

/// Inbound side of a stream, as routed by the connection.
pub trait FrameHandler: Send + Sync {
    /// A follow-up PAYLOAD frame for this stream.
    fn handle_next(&self, fragment: Payload, follows: bool, complete: bool);

    /// The peer granted `n` more items.
    fn handle_request_n(&self, n: u32);

    /// The peer (or the local connection) cancelled the stream.
    fn handle_cancel(&self);

    /// The peer sent an ERROR frame on this stream.
    fn handle_error(&self, _error: ApplicationError) { self.handle_cancel(); }
}

/// State machine for one responder-side request stream.
pub struct RequestStreamResponder {
    stream_id: StreamId,
    initial_request: u64,
    support: ResponderSupport,
    handler: Option<Arc<dyn RequestStreamHandler>>,
    slot: SubscriptionSlot<Arc<dyn Subscription>>,
    frames: Mutex<Option<ReassemblyBuffer>>,
    early_credit: AtomicU64,
    done: AtomicBool,
    outcome: OnceLock<Outcome>,
    me: Weak<Self>,
}

impl RequestStreamResponder {
    /// Create a responder for a request whose first frame carried the whole
    /// payload.
    ///
    /// The caller invokes the handler and passes the resulting stream to
    /// [`RequestStreamResponder::subscribe_to`].
    #[must_use]
    pub fn new(stream_id: StreamId, initial_request: u32, support: ResponderSupport) -> Arc<Self> {
        Self::build(stream_id, initial_request, support, None, None)
    }

    /// Create a responder for a request whose first frame was fragmented.
    ///
    /// The handler is invoked once the final fragment arrives through
    /// [`FrameHandler::handle_next`].
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Overflow`] when the first fragment alone
    /// exceeds the inbound payload limit; nothing is created in that case.
    pub fn reassembling(
        stream_id: StreamId,
        initial_request: u32,
        first_fragment: Payload,
        support: ResponderSupport,
        handler: Arc<dyn RequestStreamHandler>,
    ) -> Result<Arc<Self>, ReassemblyError> {
        let buffer =
            ReassemblyBuffer::with_first(support.config().inbound_limit(), first_fragment)?;
        Ok(Self::build(
            stream_id,
            initial_request,
            support,
            Some(handler),
            Some(buffer),
        ))
    }

    fn build(
        stream_id: StreamId,
        initial_request: u32,
        support: ResponderSupport,
        handler: Option<Arc<dyn RequestStreamHandler>>,
        frames: Option<ReassemblyBuffer>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            stream_id,
            initial_request: u64::from(initial_request),
            support,
            handler,
            slot: SubscriptionSlot::new(),
            frames: Mutex::new(frames),
            early_credit: AtomicU64::new(0),
            done: AtomicBool::new(false),
            outcome: OnceLock::new(),
            me: me.clone(),
        })
    }

    /// Subscribe this responder to the handler's payload stream.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn subscribe_to(self: &Arc<Self>, stream: PayloadStream) {
        subscription::subscribe(stream, Arc::clone(self) as Arc<dyn Subscriber>);
    }

    #[must_use]
    pub fn stream_id(&self) -> StreamId { self.stream_id }

    /// Terminal outcome, once one has been claimed.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> { self.outcome.get().copied() }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        if let Some(outcome) = self.outcome() {
            return outcome.into();
        }
        match self.slot.state() {
            SlotState::Live => StreamState::Active,
            SlotState::Cancelled => StreamState::Cancelled,
            SlotState::Unset if self.lock_frames().is_some() => StreamState::Reassembling,
            SlotState::Unset => StreamState::Subscribing,
        }
    }

    /// Whether further payloads from upstream are discarded.
    #[must_use]
    pub fn is_done(&self) -> bool { self.done.load(Ordering::Acquire) || self.slot.is_cancelled() }

    fn lock_frames(&self) -> MutexGuard<'_, Option<ReassemblyBuffer>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deregister and release resources after winning the terminal claim.
    fn finish(&self, outcome: Outcome) {
        let _ = self.outcome.set(outcome);
        self.support.registry().remove(self.stream_id, self);
        drop(self.lock_frames().take());
        metrics::inc_terminations(outcome);
        debug!(stream_id = %self.stream_id, outcome = outcome.as_str(), "stream terminated");
    }

    /// Claim the slot from whatever it holds, cancelling any live upstream.
    ///
    /// Returns `true` when this call won the terminal transition.
    fn claim_cancel(&self, outcome: Outcome) -> bool {
        match self.slot.cancel() {
            CancelOutcome::AlreadyCancelled => false,
            CancelOutcome::BeforeSubscribe => {
                self.finish(outcome);
                true
            }
            CancelOutcome::Active(subscription) => {
                self.finish(outcome);
                subscription.cancel();
                true
            }
        }
    }

    /// Cancel upstream and report `error` to the peer if this call won.
    fn cancel_with_error(&self, error: &StreamError) {
        let won = self.claim_cancel(Outcome::Errored);
        self.done.store(true, Ordering::Release);
        if won {
            self.emit(Frame::error(self.stream_id, error.code(), error.to_string()));
        } else {
            debug!(stream_id = %self.stream_id, %error, "dropped error after cancellation");
        }
    }

    fn fail_reassembly(&self, error: ReassemblyError) {
        debug!(stream_id = %self.stream_id, %error, "reassembly has failed");
        self.cancel_with_error(&StreamError::Reassembly(error));
    }

    fn emit(&self, frame: Frame) {
        if let Err(error) = self.support.outbound().enqueue(frame) {
            debug!(stream_id = %self.stream_id, %error, "terminal frame dropped");
        }
    }

    fn start(&self, payload: Payload) {
        let Some(handler) = self.handler.as_ref() else {
            warn!(stream_id = %self.stream_id, "reassembled request without a handler");
            return;
        };
        let Some(me) = self.me.upgrade() else {
            return;
        };
        if self.slot.is_cancelled() {
            debug!(stream_id = %self.stream_id, "cancelled before the handler was invoked");
            return;
        }
        me.subscribe_to(handler.request_stream(payload));
    }
}

impl FrameHandler for RequestStreamResponder {
    fn handle_next(&self, fragment: Payload, follows: bool, _complete: bool) {
        let mut frames = self.lock_frames();
        let Some(buffer) = frames.as_mut() else {
            debug!(stream_id = %self.stream_id, "fragment dropped; no reassembly pending");
            return;
        };

        let is_final = !follows;
        if let Err(error) = buffer.add_fragment(fragment, is_final) {
            let released = frames.take();
            drop(frames);
            drop(released);
            self.fail_reassembly(error);
            return;
        }
        if !is_final {
            return;
        }

        let Some(buffer) = frames.take() else {
            return;
        };
        drop(frames);
        debug!(
            stream_id = %self.stream_id,
            fragments = buffer.fragment_count(),
            len = buffer.len(),
            "request reassembled"
        );
        match buffer.decode(self.support.decoder()) {
            Ok(payload) => self.start(payload),
            Err(error) => self.fail_reassembly(error),
        }
    }

    fn handle_request_n(&self, n: u32) {
        if n == 0 {
            warn!(stream_id = %self.stream_id, "ignoring REQUEST_N of zero");
            return;
        }
        let n = u64::from(n);
        match self.slot.state() {
            SlotState::Live => {
                if let Some(subscription) = self.slot.live() {
                    subscription.request(n);
                }
            }
            SlotState::Cancelled => {
                debug!(stream_id = %self.stream_id, n, "REQUEST_N after termination ignored");
            }
            SlotState::Unset => {
                let _ = self
                    .early_credit
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                        Some(current.saturating_add(n))
                    });
                // The subscription may have been installed after the state was
                // read; whoever swaps the credit out forwards it.
                if self.slot.state() == SlotState::Live {
                    let pending = self.early_credit.swap(0, Ordering::SeqCst);
                    if let (true, Some(subscription)) = (pending > 0, self.slot.live()) {
                        subscription.request(pending);
                    }
                }
            }
        }
    }

    fn handle_cancel(&self) { self.claim_cancel(Outcome::Cancelled); }

    fn handle_error(&self, error: ApplicationError) {
        debug!(stream_id = %self.stream_id, %error, "peer error; cancelling stream");
        self.handle_cancel();
    }
}

impl Subscriber for RequestStreamResponder {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        match self.slot.install(Arc::clone(&subscription)) {
            Ok(()) => {
                let early = self.early_credit.swap(0, Ordering::SeqCst);
                subscription.request(self.initial_request.saturating_add(early));
            }
            Err(Rejected::AlreadySubscribed(rejected)) => {
                warn!(stream_id = %self.stream_id, "second subscription rejected");
                rejected.cancel();
            }
            Err(Rejected::Cancelled(rejected)) => {
                debug!(stream_id = %self.stream_id, "subscription arrived after cancellation");
                rejected.cancel();
            }
        }
    }

    fn on_next(&self, payload: Payload) {
        if self.is_done() {
            debug!(stream_id = %self.stream_id, "payload discarded after termination");
            return;
        }

        let config = self.support.config();
        if !payload::is_valid(config.mtu, config.max_frame_length, &payload) {
            drop(payload);
            self.cancel_with_error(&StreamError::InvalidPayload(format!(
                "the payload exceeds the max frame length of {} bytes",
                config.max_frame_length
            )));
            return;
        }

        match self
            .support
            .sender()
            .send(self.stream_id, config.mtu, Outgoing::Next(payload))
        {
            Ok(()) => {}
            Err(SendError::InvalidPayload { reason }) => {
                self.cancel_with_error(&StreamError::InvalidPayload(reason));
            }
            Err(error @ SendError::Closed) => {
                debug!(stream_id = %self.stream_id, %error, "send failed; cancelling upstream");
                self.claim_cancel(Outcome::Cancelled);
                self.done.store(true, Ordering::Release);
            }
        }
    }

    fn on_error(&self, error: ApplicationError) {
        if self.done.swap(true, Ordering::AcqRel) {
            debug!(stream_id = %self.stream_id, %error, "dropped error");
            return;
        }
        if !self.slot.terminate() {
            debug!(stream_id = %self.stream_id, %error, "dropped error");
            return;
        }
        self.finish(Outcome::Errored);
        let error = StreamError::from(error);
        self.emit(Frame::error(self.stream_id, error.code(), error.to_string()));
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if !self.slot.terminate() {
            debug!(stream_id = %self.stream_id, "completion suppressed after cancellation");
            return;
        }
        self.finish(Outcome::Completed);
        if let Err(error) = self
            .support
            .sender()
            .send(self.stream_id, 0, Outgoing::Complete)
        {
            debug!(stream_id = %self.stream_id, %error, "terminal frame dropped");
        }
    }
}
