//! Shared utilities for integration tests.
//!
//! Provides a connection harness wired to an outbound receiver, handler
//! builders based on `async-stream`, and a registry wrapper that counts
//! deregistrations.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_stream::stream;
use rstest::fixture;
use tokio::time::{sleep, timeout};
use wirestream::{
    ActiveStreams,
    ApplicationError,
    FrameHandler,
    Frame,
    OutboundReceiver,
    Payload,
    PayloadFrame,
    PayloadStream,
    RequestStreamHandler,
    ResponderConfig,
    ResponderConnection,
    StreamId,
    StreamRegistry,
    outbound_channel,
};

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// How long to wait for a frame before failing.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait before asserting that nothing else arrives.
pub const SETTLE: Duration = Duration::from_millis(50);

/// A responder connection and the receiving end of its outbound channel.
pub struct Peer {
    pub connection: ResponderConnection,
    pub rx: OutboundReceiver,
    pub requests: Arc<AtomicUsize>,
}

impl Peer {
    /// Wire a connection with `config` to `handler`.
    pub fn new(config: ResponderConfig, handler: Arc<dyn RequestStreamHandler>) -> Self {
        let (tx, rx) = outbound_channel();
        let requests = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&requests);
        let connection = ResponderConnection::new(
            config,
            tx,
            Arc::new(move |payload: Payload| -> PayloadStream {
                counted.fetch_add(1, Ordering::AcqRel);
                handler.request_stream(payload)
            }),
        )
        .expect("valid config");
        Self {
            connection,
            rx,
            requests,
        }
    }

    /// Number of times the application handler was invoked.
    pub fn requests(&self) -> usize { self.requests.load(Ordering::Acquire) }

    /// Receive the next outbound frame.
    pub async fn next_frame(&mut self) -> TestResult<Frame> {
        let frame = timeout(FRAME_TIMEOUT, self.rx.recv())
            .await?
            .ok_or("outbound channel closed")?;
        Ok(frame)
    }

    /// Receive frames up to and including the first terminal frame.
    pub async fn until_terminal(&mut self) -> TestResult<Vec<Frame>> {
        let mut frames = Vec::new();
        loop {
            let frame = self.next_frame().await?;
            let terminal = frame.is_terminal();
            frames.push(frame);
            if terminal {
                return Ok(frames);
            }
        }
    }

    /// Wait briefly, then return whatever frames are pending.
    pub async fn settle(&mut self) -> Vec<Frame> {
        sleep(SETTLE).await;
        self.rx.drain()
    }
}

#[expect(
    unused_braces,
    reason = "rustc false positive for single-line rstest fixtures"
)]
#[fixture]
pub fn peer() -> Peer { Peer::new(ResponderConfig::default(), emit(3, 10)) }

/// Build a REQUEST_STREAM frame.
pub fn request(id: u32, initial_request_n: u32, payload: Payload, follows: bool) -> Frame {
    Frame::RequestStream {
        stream_id: StreamId::new(id),
        initial_request_n,
        payload,
        follows,
    }
}

/// Handler emitting `count` payloads of `len` bytes, then completing.
pub fn emit(count: usize, len: usize) -> Arc<dyn RequestStreamHandler> {
    Arc::new(move |_request: Payload| -> PayloadStream {
        Box::pin(stream! {
            for i in 0..count {
                let fill = u8::try_from(i % 256).unwrap_or_default();
                yield Ok::<_, ApplicationError>(Payload::from_data(vec![fill; len]));
            }
        })
    })
}

/// Handler echoing the request payload once.
pub fn echo() -> Arc<dyn RequestStreamHandler> {
    Arc::new(|request: Payload| -> PayloadStream {
        Box::pin(stream! {
            yield Ok::<_, ApplicationError>(request);
        })
    })
}

/// Handler emitting payloads forever and flagging when its stream is dropped.
pub fn endless(dropped: &Arc<AtomicUsize>) -> Arc<dyn RequestStreamHandler> {
    let dropped = Arc::clone(dropped);
    Arc::new(move |_request: Payload| -> PayloadStream {
        let guard = DropFlag(Arc::clone(&dropped));
        Box::pin(stream! {
            let _guard = guard;
            let mut i = 0_u8;
            loop {
                yield Ok::<_, ApplicationError>(Payload::from_data(vec![i]));
                i = i.wrapping_add(1);
            }
        })
    })
}

/// Increments its counter when dropped.
pub struct DropFlag(pub Arc<AtomicUsize>);

impl Drop for DropFlag {
    fn drop(&mut self) { self.0.fetch_add(1, Ordering::AcqRel); }
}

/// Data bytes of a NEXT frame.
pub fn next_data(frame: &Frame) -> Option<&[u8]> {
    match frame {
        Frame::Payload(PayloadFrame {
            payload,
            next: true,
            ..
        }) => Some(payload.data().as_ref()),
        _ => None,
    }
}

/// Registry wrapper counting successful deregistrations.
#[derive(Default)]
pub struct CountingRegistry {
    pub inner: ActiveStreams,
    pub removals: AtomicUsize,
}

impl CountingRegistry {
    pub fn removals(&self) -> usize { self.removals.load(Ordering::Acquire) }
}

impl StreamRegistry for CountingRegistry {
    fn remove(&self, id: StreamId, handler: &dyn FrameHandler) -> bool {
        let removed = self.inner.remove(id, handler);
        if removed {
            self.removals.fetch_add(1, Ordering::AcqRel);
        }
        removed
    }
}
