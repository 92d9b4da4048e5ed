//! Application payloads exchanged on a stream.
//!
//! A [`Payload`] pairs optional metadata with a data section. Both halves are
//! reference-counted [`Bytes`] so that moving a payload into outbound frames
//! never copies its contents.

use bytes::Bytes;

use crate::frame::{FRAME_HEADER_SIZE, FRAME_LENGTH_SIZE, MAX_METADATA_LENGTH, METADATA_LENGTH_SIZE};

/// Metadata and data carried by a single logical message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    metadata: Option<Bytes>,
    data: Bytes,
}

impl Payload {
    /// Construct a payload from optional metadata and data.
    #[must_use]
    pub fn new(metadata: Option<Bytes>, data: impl Into<Bytes>) -> Self {
        Self {
            metadata,
            data: data.into(),
        }
    }

    /// Construct a payload with no metadata.
    #[must_use]
    pub fn from_data(data: impl Into<Bytes>) -> Self { Self::new(None, data) }

    /// Construct a payload with both metadata and data.
    #[must_use]
    pub fn with_metadata(metadata: impl Into<Bytes>, data: impl Into<Bytes>) -> Self {
        Self::new(Some(metadata.into()), data)
    }

    /// Borrow the metadata section, if present.
    #[must_use]
    pub fn metadata(&self) -> Option<&Bytes> { self.metadata.as_ref() }

    /// Borrow the data section.
    #[must_use]
    pub fn data(&self) -> &Bytes { &self.data }

    /// Whether the payload carries a metadata section (possibly empty).
    #[must_use]
    pub fn has_metadata(&self) -> bool { self.metadata.is_some() }

    /// Number of metadata bytes, zero when absent.
    #[must_use]
    pub fn metadata_len(&self) -> usize { self.metadata.as_ref().map_or(0, Bytes::len) }

    /// Combined length of metadata and data.
    #[must_use]
    pub fn len(&self) -> usize { self.metadata_len() + self.data.len() }

    /// Whether both sections are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Size of a PAYLOAD frame carrying this payload, excluding the length
    /// prefix added by the transport.
    #[must_use]
    pub fn encoded_frame_len(&self) -> usize {
        let metadata = if self.has_metadata() {
            METADATA_LENGTH_SIZE + self.metadata_len()
        } else {
            0
        };
        FRAME_HEADER_SIZE + metadata + self.data.len()
    }

    /// Consume the payload, returning its sections.
    #[must_use]
    pub fn into_parts(self) -> (Option<Bytes>, Bytes) { (self.metadata, self.data) }
}

/// Check whether `payload` can be sent on a stream with the given limits.
///
/// With fragmentation enabled (`mtu > 0`) any payload whose metadata fits the
/// 24-bit length field is acceptable. Without fragmentation the whole frame,
/// including its length prefix, must fit within `max_frame_length`.
#[must_use]
pub fn is_valid(mtu: usize, max_frame_length: usize, payload: &Payload) -> bool {
    if payload.metadata_len() > MAX_METADATA_LENGTH {
        return false;
    }
    if mtu > 0 {
        return true;
    }
    FRAME_LENGTH_SIZE + payload.encoded_frame_len() <= max_frame_length
}
