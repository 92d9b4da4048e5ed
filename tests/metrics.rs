#![cfg(all(not(loom), feature = "metrics"))]
//! Tests for `wirestream` metrics helpers.
//!
//! These tests verify that counters and gauges update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.
use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;
use serial_test::serial;
use wirestream::{
    ActiveStreams,
    ApplicationError,
    Frame,
    FrameHandler,
    Outcome,
    RequestStreamResponder,
    ResponderConfig,
    ResponderSupport,
    StreamId,
    StreamRegistry,
    Subscriber,
    metrics::{FRAMES_OUTBOUND, STREAM_TERMINATIONS, STREAMS_ACTIVE},
    outbound_channel,
};

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

#[test]
#[serial]
fn outbound_frames_are_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let (tx, _rx) = outbound_channel();
    metrics::with_local_recorder(&recorder, || {
        tx.enqueue(Frame::complete(StreamId::new(1)))
            .expect("enqueue");
        tx.enqueue_batch(vec![
            Frame::complete(StreamId::new(3)),
            Frame::complete(StreamId::new(5)),
        ])
        .expect("enqueue batch");
    });

    assert_counter_eq(&snapshotter, FRAMES_OUTBOUND, &[], 3);
}

#[test]
#[serial]
fn active_streams_gauge_follows_registry() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let (tx, _rx) = outbound_channel();
    let streams = Arc::new(ActiveStreams::new());
    let support = ResponderSupport::new(
        ResponderConfig::default(),
        tx,
        Arc::clone(&streams) as Arc<dyn StreamRegistry>,
    );
    metrics::with_local_recorder(&recorder, || {
        for id in [1, 3] {
            let responder = RequestStreamResponder::new(StreamId::new(id), 1, support.clone());
            streams.insert(StreamId::new(id), responder as Arc<dyn FrameHandler>);
        }
        if let Some(handler) = streams.get(StreamId::new(1)) {
            handler.handle_cancel();
        }
    });

    let metrics = snapshotter.snapshot().into_vec();
    let gauge = metrics.iter().find_map(|(key, _, _, value)| match value {
        DebugValue::Gauge(g) if key.key().name() == STREAMS_ACTIVE => Some(g.into_inner()),
        _ => None,
    });
    assert!(
        gauge.is_some_and(|g| (g - 1.0).abs() < f64::EPSILON),
        "expected one active stream, got {metrics:#?}"
    );
}

#[rstest]
#[case(Outcome::Completed, "completed")]
#[case(Outcome::Errored, "errored")]
#[case(Outcome::Cancelled, "cancelled")]
#[serial]
fn terminations_are_labelled_by_outcome(#[case] outcome: Outcome, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let (tx, _rx) = outbound_channel();
    let streams = Arc::new(ActiveStreams::new());
    let support = ResponderSupport::new(
        ResponderConfig::default(),
        tx,
        Arc::clone(&streams) as Arc<dyn StreamRegistry>,
    );
    let responder = RequestStreamResponder::new(StreamId::new(9), 1, support);
    metrics::with_local_recorder(&recorder, || match outcome {
        Outcome::Completed => responder.on_complete(),
        Outcome::Errored => responder.on_error(ApplicationError::new("boom")),
        Outcome::Cancelled => responder.handle_cancel(),
    });

    assert_eq!(responder.outcome(), Some(outcome));
    assert_counter_eq(&snapshotter, STREAM_TERMINATIONS, &[("outcome", label)], 1);
}

fn assert_counter_eq(
    snapshotter: &Snapshotter,
    name: &str,
    labels: &[(&str, &str)],
    expected: u64,
) {
    let metrics = snapshotter.snapshot().into_vec();
    assert!(
        metrics.iter().any(|(key, _, _, value)| {
            key.key().name() == name
                && labels.iter().all(|(k, v)| {
                    key.key()
                        .labels()
                        .any(|l| l.key() == *k && l.value() == *v)
                })
                && matches!(value, DebugValue::Counter(c) if *c == expected)
        }),
        "expected {name} == {expected}, got {metrics:#?}"
    );
}
