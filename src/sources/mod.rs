//! Byte-source implementations.
//!
//! Live capture adapters live outside this crate; what ships here is the
//! archival pair (record a capture, replay it later through the same
//! decoder/correlator pipeline) plus the in-memory source re-exported
//! from [`crate::source`].

mod archive;

pub use archive::{ArchiveSource, ArchiveWriter, RecordingSource};
