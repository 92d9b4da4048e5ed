//! Demo binary driving one request stream through an in-process responder.
//!
//! Parses CLI arguments, feeds a (possibly fragmented) REQUEST_STREAM frame to
//! a [`ResponderConnection`] and prints every outbound frame.

mod cli;

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use clap::Parser;
use futures::stream;
use tracing::info;
use wirestream::{
    ApplicationError,
    Frame,
    OutboundReceiver,
    Payload,
    PayloadFrame,
    PayloadStream,
    ResponderConfig,
    ResponderConnection,
    StreamId,
    outbound_channel,
};

const REQUEST: &[u8] = b"wirestream demo request payload";
const IDLE: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Enable structured logging for the demo.
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let config = ResponderConfig::builder().mtu(cli.mtu).build()?;
    let (tx, mut rx) = outbound_channel();

    let (count, size) = (cli.items, cli.payload_size);
    let connection = ResponderConnection::new(
        config,
        tx,
        Arc::new(move |request: Payload| -> PayloadStream {
            info!(len = request.len(), "request received");
            Box::pin(stream::iter((0..count).map(move |i| {
                #[expect(clippy::cast_possible_truncation, reason = "filler byte wraps")]
                let fill = i as u8;
                Ok::<_, ApplicationError>(Payload::from_data(vec![fill; size]))
            })))
        }),
    )?;

    let stream_id = StreamId::new(cli.stream_id);
    for frame in request_frames(stream_id, cli.initial_request, cli.fragment) {
        connection.handle_frame(frame);
    }

    let written = print_frames(&mut rx, &connection, stream_id, cli.cancel_after).await;
    info!(written, active = ?connection.streams().active_ids(), "demo finished");
    Ok(())
}

/// Build the inbound frames for the demo request.
fn request_frames(stream_id: StreamId, initial_request_n: u32, fragment: Option<usize>) -> Vec<Frame> {
    let chunk = fragment.filter(|size| *size > 0).unwrap_or(REQUEST.len());
    let mut chunks = REQUEST.chunks(chunk).map(Bytes::copy_from_slice).peekable();
    let mut frames = Vec::new();
    if let Some(first) = chunks.next() {
        frames.push(Frame::RequestStream {
            stream_id,
            initial_request_n,
            payload: Payload::from_data(first),
            follows: chunks.peek().is_some(),
        });
    }
    while let Some(next) = chunks.next() {
        let follows = chunks.peek().is_some();
        frames.push(Frame::next(stream_id, Payload::from_data(next), follows));
    }
    frames
}

async fn print_frames(
    rx: &mut OutboundReceiver,
    connection: &ResponderConnection,
    stream_id: StreamId,
    cancel_after: Option<usize>,
) -> usize {
    let mut written = 0;
    while let Ok(Some(frame)) = tokio::time::timeout(IDLE, rx.recv()).await {
        written += 1;
        println!("{}", describe(&frame));
        if frame.is_terminal() {
            break;
        }
        if cancel_after == Some(written) {
            println!("-> CANCEL stream={stream_id}");
            connection.handle_frame(Frame::Cancel { stream_id });
        }
    }
    written
}

fn describe(frame: &Frame) -> String {
    match frame {
        Frame::Payload(PayloadFrame {
            stream_id,
            payload,
            follows,
            complete,
            next,
        }) => format!(
            "PAYLOAD stream={stream_id} metadata={} data={} next={next} follows={follows} \
             complete={complete}",
            payload.metadata_len(),
            payload.data().len()
        ),
        Frame::Error {
            stream_id,
            code,
            message,
        } => format!("ERROR stream={stream_id} code={code} message={message:?}"),
        other => format!("{:?} stream={}", other.frame_type(), other.stream_id()),
    }
}
