//! Payload fragmentation and re-assembly.
//!
//! Outbound payloads larger than the MTU are split by [`PayloadSender`];
//! inbound request fragments are accumulated in a [`ReassemblyBuffer`] and
//! turned back into one payload by a [`PayloadDecoder`]. Each sub-module
//! focuses on a single concept while the crate root sees one cohesive API.

pub mod decoder;
pub mod error;
pub mod fragmenter;
pub mod reassembler;

pub use decoder::{DefaultPayloadDecoder, PayloadDecoder};
pub use error::{FragmentStatus, ReassemblyError, SendError};
pub use fragmenter::{Outgoing, PayloadSender};
pub use reassembler::ReassemblyBuffer;
