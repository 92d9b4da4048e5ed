//! Command line interface for the wirestream demo binary.
//!
//! Describes one synthetic request stream to run through an in-process
//! responder and is also used to render the man page.

use clap::Parser;

/// Command line arguments for the `wirestream` binary.
#[derive(Debug, Parser)]
#[command(
    name = "wirestream",
    version,
    about = "Run a synthetic request stream through the responder"
)]
pub struct Cli {
    /// Stream identifier of the request.
    #[arg(long, default_value_t = 1)]
    pub stream_id: u32,

    /// Credit granted by the REQUEST_STREAM frame.
    #[arg(short = 'n', long, default_value_t = 4)]
    pub initial_request: u32,

    /// Number of items the handler emits.
    #[arg(short, long, default_value_t = 3)]
    pub items: usize,

    /// Size in bytes of each emitted item.
    #[arg(short, long, default_value_t = 16)]
    pub payload_size: usize,

    /// Outbound MTU; 0 disables fragmentation.
    #[arg(long, default_value_t = 0)]
    pub mtu: usize,

    /// Split the request payload into fragments of this many bytes.
    #[arg(long)]
    pub fragment: Option<usize>,

    /// Send a CANCEL after this many frames have been written.
    #[arg(long)]
    pub cancel_after: Option<usize>,
}
