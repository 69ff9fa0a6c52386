//! Raw-chunk archival and replay.
//!
//! An archive is the flat record sequence
//!
//! ```text
//! struct archive_record {
//!   uint64 observed_at_ms;  // offset 0
//!   uint32 sequence;        // offset 8
//!   uint32 payload_len;     // offset 12
//!   uint8  payload[payload_len];
//! }
//! ```
//!
//! little-endian throughout. [`RecordingSource`] tees a live source into a
//! writer; [`ArchiveSource`] replays an archive through the same pipeline,
//! optionally paced on the recorded timestamps.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tokio::time::{Duration, sleep};
use tracing::{debug, info};

use crate::error::{CombatError, Result};
use crate::source::{ByteSource, Chunk};

const RECORD_HEADER_LEN: usize = 16;

/// Appends captured chunks to an archive file.
pub struct ArchiveWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    records: u64,
}

impl ArchiveWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .map_err(|e| CombatError::archive_error(path.clone(), e))?;
        Ok(Self { writer: BufWriter::new(file), path, records: 0 })
    }

    /// Append one chunk record.
    pub fn record(&mut self, chunk: &Chunk) -> Result<()> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        header[0..8].copy_from_slice(&chunk.observed_at_ms.to_le_bytes());
        header[8..12].copy_from_slice(&chunk.sequence.to_le_bytes());
        header[12..16].copy_from_slice(&(chunk.payload.len() as u32).to_le_bytes());

        self.writer
            .write_all(&header)
            .and_then(|_| self.writer.write_all(&chunk.payload))
            .map_err(|e| CombatError::archive_error(self.path.clone(), e))?;
        self.records += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| CombatError::archive_error(self.path.clone(), e))
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Decorator that records every chunk a live source delivers.
pub struct RecordingSource<S> {
    inner: S,
    writer: ArchiveWriter,
}

impl<S: ByteSource> RecordingSource<S> {
    pub fn new(inner: S, writer: ArchiveWriter) -> Self {
        Self { inner, writer }
    }
}

#[async_trait::async_trait]
impl<S: ByteSource> ByteSource for RecordingSource<S> {
    async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let chunk = self.inner.next_chunk().await?;
        if let Some(chunk) = &chunk {
            self.writer.record(chunk)?;
        } else {
            self.writer.flush()?;
        }
        Ok(chunk)
    }
}

/// Replays an archive file as a byte source.
pub struct ArchiveSource {
    data: Vec<u8>,
    position: usize,
    path: PathBuf,
    /// Playback speed multiplier (1.0 = recorded pace).
    speed: f64,
    paced: bool,
    last_ts: Option<u64>,
}

impl ArchiveSource {
    /// Open an archive for paced replay at recorded speed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file =
            File::open(&path).map_err(|e| CombatError::archive_error(path.clone(), e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| CombatError::archive_error(path.clone(), e))?;

        info!(path = %path.display(), bytes = data.len(), "opened capture archive");
        Ok(Self { data, position: 0, path, speed: 1.0, paced: true, last_ts: None })
    }

    /// Open an archive for immediate (unpaced) replay.
    pub fn open_immediate<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut source = Self::open(path)?;
        source.paced = false;
        Ok(source)
    }

    /// Set the playback speed multiplier, clamped to a sane range.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.1, 10.0);
        debug!("replay speed set to {}x", self.speed);
    }

    fn read_record(&mut self) -> Result<Option<Chunk>> {
        if self.position == self.data.len() {
            return Ok(None);
        }
        let remaining = self.data.len() - self.position;
        if remaining < RECORD_HEADER_LEN {
            return Err(CombatError::Parse {
                context: "archive replay".to_string(),
                details: format!(
                    "truncated record header at offset {}: {} bytes left",
                    self.position, remaining
                ),
            });
        }

        let h = &self.data[self.position..self.position + RECORD_HEADER_LEN];
        let observed_at_ms =
            u64::from_le_bytes([h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7]]);
        let sequence = u32::from_le_bytes([h[8], h[9], h[10], h[11]]);
        let payload_len = u32::from_le_bytes([h[12], h[13], h[14], h[15]]) as usize;

        let start = self.position + RECORD_HEADER_LEN;
        let end = start.checked_add(payload_len).filter(|e| *e <= self.data.len()).ok_or_else(
            || CombatError::Parse {
                context: "archive replay".to_string(),
                details: format!(
                    "record at offset {} declares {} payload bytes past end of archive",
                    self.position, payload_len
                ),
            },
        )?;

        let payload = self.data[start..end].to_vec();
        self.position = end;
        Ok(Some(Chunk { payload, sequence, observed_at_ms }))
    }
}

#[async_trait::async_trait]
impl ByteSource for ArchiveSource {
    async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let Some(chunk) = self.read_record()? else {
            debug!(path = %self.path.display(), "archive replay complete");
            return Ok(None);
        };

        if self.paced {
            if let Some(last) = self.last_ts {
                let gap = chunk.observed_at_ms.saturating_sub(last);
                if gap > 0 {
                    sleep(Duration::from_secs_f64(gap as f64 / 1000.0 / self.speed)).await;
                }
            }
            self.last_ts = Some(chunk.observed_at_ms);
        }

        Ok(Some(chunk))
    }
}
