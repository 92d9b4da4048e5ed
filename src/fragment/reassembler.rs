//! Inbound helper that stitches fragments back into a complete payload.
//!
//! [`ReassemblyBuffer`] owns the fragments of exactly one stream's request
//! until the final fragment arrives. It guards against unbounded allocation
//! with a configurable cap and hands its contents to a
//! [`PayloadDecoder`](crate::fragment::PayloadDecoder) by value, so the
//! accumulated bytes are released exactly once whether decoding succeeds or
//! fails.

use std::num::NonZeroUsize;

use super::{FragmentStatus, PayloadDecoder, ReassemblyError};
use crate::payload::Payload;

/// Ordered accumulator for the fragments of one inbound payload.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    limit: NonZeroUsize,
    fragments: Vec<Payload>,
    len: usize,
    complete: bool,
}

impl ReassemblyBuffer {
    /// Create an empty buffer that rejects payloads larger than `limit` bytes.
    #[must_use]
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            limit,
            fragments: Vec::new(),
            len: 0,
            complete: false,
        }
    }

    /// Create a buffer seeded with the first fragment of a payload that is
    /// known to be followed by more fragments.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Overflow`] when the first fragment alone
    /// exceeds `limit`.
    pub fn with_first(limit: NonZeroUsize, first: Payload) -> Result<Self, ReassemblyError> {
        let mut buffer = Self::new(limit);
        buffer.add_fragment(first, false)?;
        Ok(buffer)
    }

    /// Append a fragment.
    ///
    /// Returns [`FragmentStatus::Complete`] when `is_final` is set, otherwise
    /// [`FragmentStatus::Incomplete`].
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Overflow`] when the running total would
    /// exceed the limit, or [`ReassemblyError::Decode`] when the final
    /// fragment was already accepted. The buffer should be dropped after
    /// either error.
    pub fn add_fragment(
        &mut self,
        fragment: Payload,
        is_final: bool,
    ) -> Result<FragmentStatus, ReassemblyError> {
        if self.complete {
            return Err(ReassemblyError::Decode(
                "fragment received after the final fragment".to_owned(),
            ));
        }
        let attempted = self.len.saturating_add(fragment.len());
        if attempted > self.limit.get() {
            return Err(ReassemblyError::Overflow {
                attempted,
                limit: self.limit,
            });
        }

        self.len = attempted;
        self.fragments.push(fragment);
        if is_final {
            self.complete = true;
            Ok(FragmentStatus::Complete)
        } else {
            Ok(FragmentStatus::Incomplete)
        }
    }

    /// Total number of payload bytes accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize { self.len }

    /// Whether no payload bytes have been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Number of fragments accepted.
    #[must_use]
    pub fn fragment_count(&self) -> usize { self.fragments.len() }

    /// Whether the final fragment has been accepted.
    #[must_use]
    pub fn is_complete(&self) -> bool { self.complete }

    /// Consume the buffer and decode its fragments into a single payload.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Decode`] when the final fragment has not
    /// been received or the decoder rejects the fragments.
    pub fn decode(self, decoder: &dyn PayloadDecoder) -> Result<Payload, ReassemblyError> {
        if !self.complete {
            return Err(ReassemblyError::Decode(
                "final fragment not yet received".to_owned(),
            ));
        }
        decoder.decode(self.fragments)
    }
}
