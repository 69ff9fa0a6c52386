//! Wire-level frame recovery.
//!
//! Three layers, leaf first:
//! - [`header`]: the stateless 9-byte header classifier
//! - [`extract`]: the resynchronizing frame extractor, a pure function of
//!   one byte window
//! - [`reassembly`]: the per-connection buffer that feeds the extractor
//!   and bounds memory under backpressure

pub mod extract;
pub mod header;
pub mod reassembly;

pub use extract::{Extraction, Frame, NOISE_FRAME_TYPES, extract};
pub use header::{Encoding, FrameHeader, HEADER_LEN, MAX_FRAME_TYPE, MAX_PAYLOAD_LEN};
pub use reassembly::{MAX_BUFFER_LEN, StreamReassembler};
