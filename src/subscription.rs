//! Pull-based subscription between a payload stream and its consumer.
//!
//! [`subscribe`] connects an application [`PayloadStream`] to a
//! [`Subscriber`]. The subscriber receives a [`Subscription`] first and must
//! request credit through it; a Tokio task then polls the stream once per unit
//! of credit and forwards each item. Cancelling the subscription stops the
//! task and drops the stream, even while it is waiting for an item.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use futures::StreamExt;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{error::ApplicationError, handler::PayloadStream, payload::Payload};

/// Credit value treated as unbounded demand.
pub const UNBOUNDED: u64 = u64::MAX;

/// Handle through which a subscriber controls the flow of items.
pub trait Subscription: Send + Sync {
    /// Allow up to `n` more items to be delivered.
    fn request(&self, n: u64);

    /// Stop delivery permanently.
    fn cancel(&self);
}

/// Consumer of a payload stream.
pub trait Subscriber: Send + Sync + 'static {
    /// Called once, before any other signal, with the subscription handle.
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    /// Called for each item, never more often than credit allows.
    fn on_next(&self, payload: Payload);

    /// Called at most once when the stream fails.
    fn on_error(&self, error: ApplicationError);

    /// Called at most once when the stream ends.
    fn on_complete(&self);
}

/// Outstanding credit shared between requesters and the delivering task.
#[derive(Debug, Default)]
pub struct Demand {
    outstanding: AtomicU64,
    notify: Notify,
}

impl Demand {
    /// Add `n` units of credit, saturating at [`UNBOUNDED`].
    pub fn add(&self, n: u64) {
        if n == 0 {
            return;
        }
        let _ = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(n))
            });
        self.notify.notify_one();
    }

    /// Consume one unit of credit if any is available.
    ///
    /// Unbounded demand is never decremented.
    pub fn try_take(&self) -> bool {
        self.outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match current {
                0 => None,
                UNBOUNDED => Some(UNBOUNDED),
                n => Some(n - 1),
            })
            .is_ok()
    }

    /// Credit not yet consumed.
    #[must_use]
    pub fn outstanding(&self) -> u64 { self.outstanding.load(Ordering::Acquire) }

    /// Wait until one unit of credit can be consumed, then consume it.
    pub async fn acquire(&self) {
        loop {
            if self.try_take() {
                return;
            }
            self.notify.notified().await;
        }
    }
}

/// [`Subscription`] backed by a Tokio task polling a [`PayloadStream`].
#[derive(Debug, Default)]
pub struct StreamSubscription {
    demand: Demand,
    token: CancellationToken,
    delivered: AtomicU64,
}

impl StreamSubscription {
    /// Whether the subscription has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool { self.token.is_cancelled() }

    /// Number of items delivered to the subscriber so far.
    #[must_use]
    pub fn delivered(&self) -> u64 { self.delivered.load(Ordering::Acquire) }

    /// Credit granted but not yet used.
    #[must_use]
    pub fn outstanding(&self) -> u64 { self.demand.outstanding() }
}

impl Subscription for StreamSubscription {
    fn request(&self, n: u64) { self.demand.add(n); }

    fn cancel(&self) { self.token.cancel(); }
}

/// Subscribe `subscriber` to `stream`.
///
/// `on_subscribe` runs synchronously on the calling thread, so credit the
/// subscriber requests there is in place before the first poll. Delivery
/// happens on a spawned Tokio task.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn subscribe(stream: PayloadStream, subscriber: Arc<dyn Subscriber>) -> Arc<StreamSubscription> {
    let subscription = Arc::new(StreamSubscription::default());
    subscriber.on_subscribe(Arc::clone(&subscription) as Arc<dyn Subscription>);
    tokio::spawn(drive(stream, Arc::clone(&subscription), subscriber));
    subscription
}

async fn drive(
    mut stream: PayloadStream,
    subscription: Arc<StreamSubscription>,
    subscriber: Arc<dyn Subscriber>,
) {
    let token = subscription.token.clone();
    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            () = subscription.demand.acquire() => {}
        }
        let item = tokio::select! {
            biased;
            () = token.cancelled() => break,
            item = stream.next() => item,
        };
        match item {
            Some(Ok(payload)) => {
                subscription.delivered.fetch_add(1, Ordering::AcqRel);
                subscriber.on_next(payload);
            }
            Some(Err(error)) => {
                subscriber.on_error(error);
                return;
            }
            None => {
                subscriber.on_complete();
                return;
            }
        }
    }
    debug!(
        delivered = subscription.delivered(),
        "subscription cancelled"
    );
}
