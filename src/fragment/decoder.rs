//! Conversion of reassembled fragments into an application payload.

use bytes::{BufMut, BytesMut};

use super::ReassemblyError;
use crate::payload::Payload;

/// Turns the ordered fragments of one payload into a single [`Payload`].
///
/// Implementations take the fragments by value; whatever they do not hand
/// back inside the returned payload is released when they return.
pub trait PayloadDecoder: Send + Sync {
    /// Decode `fragments`, which are never empty and arrive in wire order.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Decode`] when the fragments do not describe
    /// a well-formed payload.
    fn decode(&self, fragments: Vec<Payload>) -> Result<Payload, ReassemblyError>;
}

/// Decoder that concatenates metadata and data sections.
///
/// A single fragment is returned as is. For multiple fragments the metadata
/// sections must all precede the first non-empty data section.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPayloadDecoder;

impl PayloadDecoder for DefaultPayloadDecoder {
    fn decode(&self, mut fragments: Vec<Payload>) -> Result<Payload, ReassemblyError> {
        if fragments.len() == 1 {
            return fragments
                .pop()
                .ok_or_else(|| ReassemblyError::Decode("no fragments".to_owned()));
        }
        if fragments.is_empty() {
            return Err(ReassemblyError::Decode("no fragments".to_owned()));
        }

        let metadata_len: usize = fragments.iter().map(Payload::metadata_len).sum();
        let data_len: usize = fragments.iter().map(|f| f.data().len()).sum();
        let has_metadata = fragments.iter().any(Payload::has_metadata);
        let mut metadata = BytesMut::with_capacity(metadata_len);
        let mut data = BytesMut::with_capacity(data_len);

        for (index, fragment) in fragments.into_iter().enumerate() {
            let (fragment_metadata, fragment_data) = fragment.into_parts();
            if let Some(bytes) = fragment_metadata.filter(|m| !m.is_empty()) {
                if !data.is_empty() {
                    return Err(ReassemblyError::Decode(format!(
                        "fragment {index} carries metadata after data"
                    )));
                }
                metadata.put(bytes);
            }
            data.put(fragment_data);
        }

        let metadata = has_metadata.then(|| metadata.freeze());
        Ok(Payload::new(metadata, data.freeze()))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn concatenates_metadata_then_data() {
        let fragments = vec![
            Payload::with_metadata(vec![1_u8, 2], Bytes::new()),
            Payload::with_metadata(vec![3_u8], vec![10_u8, 11]),
            Payload::from_data(vec![12_u8]),
        ];
        let payload = DefaultPayloadDecoder
            .decode(fragments)
            .expect("well-formed fragments");
        assert_eq!(payload.metadata(), Some(&Bytes::from_static(&[1, 2, 3])));
        assert_eq!(payload.data(), &Bytes::from_static(&[10, 11, 12]));
    }

    #[test]
    fn single_fragment_passes_through() {
        let original = Payload::with_metadata(vec![9_u8], vec![8_u8]);
        let payload = DefaultPayloadDecoder
            .decode(vec![original.clone()])
            .expect("single fragment");
        assert_eq!(payload, original);
    }

    #[test]
    fn rejects_metadata_after_data() {
        let fragments = vec![
            Payload::from_data(vec![1_u8]),
            Payload::with_metadata(vec![2_u8], Bytes::new()),
        ];
        let err = DefaultPayloadDecoder
            .decode(fragments)
            .expect_err("metadata after data");
        assert!(matches!(err, ReassemblyError::Decode(_)));
    }
}
