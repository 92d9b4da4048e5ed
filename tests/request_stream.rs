#![cfg(not(loom))]
//! End-to-end request-stream scenarios driven through `ResponderConnection`.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use rstest::rstest;
use wirestream::{Frame, Payload, ResponderConfig, StreamId};

mod common;
use common::{Peer, TestResult, emit, endless, next_data, peer, request};

/// Three items within five credits produce three NEXT frames and a COMPLETE,
/// after which the stream is gone from the registry.
#[rstest]
#[tokio::test]
async fn emits_items_then_completes(mut peer: Peer) -> TestResult {
    peer.connection
        .handle_frame(request(7, 5, Payload::from_data(vec![0; 10]), false));

    let frames = peer.until_terminal().await?;
    assert_eq!(frames.len(), 4);
    assert!(frames[..3].iter().all(|f| next_data(f).is_some()));
    assert!(frames.iter().all(|f| f.stream_id() == StreamId::new(7)));
    assert_eq!(frames[3], Frame::complete(StreamId::new(7)));
    assert!(!peer.connection.streams().contains(StreamId::new(7)));
    assert_eq!(peer.requests(), 1);
    Ok(())
}

/// A CANCEL after the first item stops the application stream without any
/// terminal frame.
#[tokio::test]
async fn cancel_stops_application_stream() -> TestResult {
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut peer = Peer::new(ResponderConfig::default(), endless(&dropped));
    peer.connection
        .handle_frame(request(7, 1, Payload::from_data(vec![0; 10]), false));
    let first = peer.next_frame().await?;
    assert!(next_data(&first).is_some());

    peer.connection.handle_frame(Frame::Cancel {
        stream_id: StreamId::new(7),
    });

    let rest = peer.settle().await;
    assert!(rest.len() <= 1);
    assert!(rest.iter().all(|f| !f.is_terminal()));
    assert!(!peer.connection.streams().contains(StreamId::new(7)));
    assert_eq!(dropped.load(Ordering::Acquire), 1);
    Ok(())
}

/// Delivery never exceeds the initial credit plus granted REQUEST_N.
#[rstest]
#[case(1, &[], 1)]
#[case(2, &[3], 5)]
#[case(1, &[1, 1, 1], 4)]
#[tokio::test]
async fn delivery_is_bounded_by_credit(
    #[case] initial: u32,
    #[case] grants: &[u32],
    #[case] expected: usize,
) -> TestResult {
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut peer = Peer::new(ResponderConfig::default(), endless(&dropped));
    peer.connection
        .handle_frame(request(9, initial, Payload::from_data("go"), false));
    for n in grants {
        peer.connection.handle_frame(Frame::RequestN {
            stream_id: StreamId::new(9),
            n: *n,
        });
    }

    let frames = peer.settle().await;
    assert_eq!(frames.len(), expected);
    assert!(frames.iter().all(|f| next_data(f).is_some()));
    Ok(())
}

/// Unbounded credit drains a finite stream and completes it.
#[tokio::test]
async fn max_credit_is_unbounded() -> TestResult {
    let mut peer = Peer::new(ResponderConfig::default(), emit(50, 1));
    peer.connection
        .handle_frame(request(11, u32::MAX, Payload::from_data("all"), false));
    let frames = peer.until_terminal().await?;
    assert_eq!(frames.len(), 51);
    Ok(())
}

/// Items larger than the MTU are split into fragments within the MTU.
#[tokio::test]
async fn large_items_are_fragmented() -> TestResult {
    let config = ResponderConfig::builder().mtu(64).build()?;
    let mut peer = Peer::new(config, emit(2, 150));
    peer.connection
        .handle_frame(request(13, 2, Payload::from_data("frag"), false));

    let frames = peer.until_terminal().await?;
    let payload_frames = &frames[..frames.len() - 1];
    assert!(payload_frames.len() > 2);
    for frame in payload_frames {
        let Frame::Payload(payload) = frame else {
            return Err(format!("unexpected frame {frame:?}").into());
        };
        assert!(payload.payload.encoded_frame_len() <= 64);
    }
    let total: usize = payload_frames
        .iter()
        .filter_map(next_data)
        .map(<[u8]>::len)
        .sum();
    assert_eq!(total, 300);
    Ok(())
}

/// Several streams on one connection stay independent.
#[rstest]
#[tokio::test]
async fn concurrent_streams_complete_independently(mut peer: Peer) -> TestResult {
    for id in [1, 3, 5, 7] {
        peer.connection
            .handle_frame(request(id, 10, Payload::from_data("x"), false));
    }

    let mut completed = Vec::new();
    while completed.len() < 4 {
        let frame = peer.next_frame().await?;
        if frame.is_terminal() {
            completed.push(frame.stream_id().get());
        }
    }
    completed.sort_unstable();
    assert_eq!(completed, vec![1, 3, 5, 7]);
    assert!(peer.connection.streams().is_empty());
    Ok(())
}
