//! Typed, async reconstruction of combat telemetry from raw TCP byte streams.
//!
//! Skirmish turns an unbounded, boundary-unaware byte stream captured off a
//! game connection into resolved (attacker, target, skill, amount) damage
//! records. Two engines do the heavy lifting:
//!
//! - the **frame extractor / stream reassembler** recovers typed,
//!   length-delimited, optionally Brotli-compressed frames from the byte
//!   stream, resynchronizing over garbage and bounding memory under
//!   backpressure
//! - the **skill–damage correlator** joins skill signals with the damage
//!   they produce using identity fields, approximate timestamps and a
//!   per-actor state machine; the protocol itself carries no causal link
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use skirmish::{Skirmish, Chunk, MemorySource};
//!
//! #[tokio::main]
//! async fn main() -> skirmish::Result<()> {
//!     // Any ByteSource works: live capture adapter, memory, or archive.
//!     let source = MemorySource::new([Chunk {
//!         payload: captured_segment(),
//!         sequence: 0,
//!         observed_at_ms: 1_700_000_000_000,
//!     }]);
//!
//!     let mut channels = Skirmish::capture(source);
//!     while let Some(record) = channels.records.recv().await {
//!         println!("{}", record.to_log_line());
//!     }
//!     Ok(())
//! }
//! # fn captured_segment() -> Vec<u8> { Vec::new() }
//! ```
//!
//! Replaying an archived capture runs the identical pipeline:
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> skirmish::Result<()> {
//! let mut channels = skirmish::Skirmish::replay("session.cap")?;
//! while let Some(record) = channels.records.recv().await {
//!     println!("{}", record.skill_name);
//! }
//! # Ok(())
//! # }
//! ```

// Core types and error handling
mod error;
pub mod types;

// Wire recovery and decoding
pub mod decode;
pub mod wire;

// Correlation engine
pub mod correlate;

// Source/sink architecture
pub mod pipeline;
pub mod policy;
pub mod source;
pub mod sources;
pub mod stream;

// Core exports
pub use error::{CombatError, Result};
pub use types::*;

// Wire exports
pub use wire::{Encoding, Frame, FrameHeader, StreamReassembler, extract};

// Correlation exports
pub use correlate::{SkillMatcher, SkillPhase, SkillSignal, SkillTracker, SkillType};

// Pipeline exports
pub use pipeline::{Pipeline, PipelineChannels, PipelineOptions};
pub use policy::{FramePolicy, StaticPolicy};
pub use source::{ByteSource, Chunk, MemorySource};
pub use sources::{ArchiveSource, ArchiveWriter, RecordingSource};
pub use stream::{MeterExt, MeterFrame};

/// Unified entry point for combat-wire pipelines.
///
/// A thin factory over [`Pipeline`] for the two common cases: attaching to
/// a live capture source and replaying an archived capture.
///
/// # Examples
///
/// ## Live capture
/// ```rust,no_run
/// use skirmish::{Skirmish, MemorySource};
///
/// # #[tokio::main]
/// # async fn main() {
/// let source = MemorySource::default(); // your capture adapter here
/// let channels = Skirmish::capture(source);
/// # let _ = channels;
/// # }
/// ```
///
/// ## Archive replay
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() -> skirmish::Result<()> {
/// let channels = skirmish::Skirmish::replay("session.cap")?;
/// # let _ = channels;
/// # Ok(())
/// # }
/// ```
pub struct Skirmish;

impl Skirmish {
    /// Attach the pipeline to a live byte source.
    pub fn capture<S: ByteSource>(source: S) -> PipelineChannels {
        Pipeline::spawn(source)
    }

    /// Replay an archived capture at recorded pace through the same
    /// decoder/correlator pipeline.
    pub fn replay<P: AsRef<std::path::Path>>(path: P) -> Result<PipelineChannels> {
        Ok(Pipeline::spawn(ArchiveSource::open(path)?))
    }
}
