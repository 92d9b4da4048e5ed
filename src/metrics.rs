//! Metric helpers for `wirestream`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

use crate::responder::Outcome;

/// Name of the gauge tracking registered request streams.
pub const STREAMS_ACTIVE: &str = "wirestream_streams_active";
/// Name of the counter tracking frames handed to the outbound channel.
pub const FRAMES_OUTBOUND: &str = "wirestream_frames_outbound_total";
/// Name of the counter tracking stream terminations by outcome.
pub const STREAM_TERMINATIONS: &str = "wirestream_stream_terminations_total";

/// Increment the active streams gauge.
pub fn inc_streams() {
    #[cfg(feature = "metrics")]
    metrics::gauge!(STREAMS_ACTIVE).increment(1.0);
}

/// Decrement the active streams gauge.
pub fn dec_streams() {
    #[cfg(feature = "metrics")]
    metrics::gauge!(STREAMS_ACTIVE).decrement(1.0);
}

/// Record `count` frames handed to the outbound channel.
pub fn inc_frames_outbound(count: usize) {
    #[cfg(feature = "metrics")]
    metrics::counter!(FRAMES_OUTBOUND).increment(count as u64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record a stream termination.
pub fn inc_terminations(outcome: Outcome) {
    #[cfg(feature = "metrics")]
    metrics::counter!(STREAM_TERMINATIONS, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}
