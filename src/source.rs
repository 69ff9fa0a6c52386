//! Capture-source trait.
//!
//! Acquiring bytes off the network is an external collaborator's job; the
//! core only sees (payload, sequence, timestamp) chunks. Sources abstract
//! over live capture adapters, in-memory fixtures and archived replays,
//! and handle their own timing internally.

use crate::error::Result;

/// One raw chunk as delivered by a capture source: at most one per network
/// segment, sequence monotonic per source.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub payload: Vec<u8>,
    pub sequence: u32,
    /// Capture timestamp, unix milliseconds.
    pub observed_at_ms: u64,
}

/// Trait for byte-producing capture sources.
///
/// Returns:
/// - `Ok(Some(chunk))` - next chunk available
/// - `Ok(None)` - stream ended (normal termination)
/// - `Err(e)` - source failure; the pipeline retries with backoff
#[async_trait::async_trait]
pub trait ByteSource: Send + 'static {
    async fn next_chunk(&mut self) -> Result<Option<Chunk>>;
}

/// In-memory source over pre-built chunks. Used by tests and benchmarks,
/// and handy for pushing captured buffers through the pipeline by hand.
#[derive(Debug, Default)]
pub struct MemorySource {
    chunks: std::collections::VecDeque<Chunk>,
}

impl MemorySource {
    pub fn new(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        Self { chunks: chunks.into_iter().collect() }
    }

    /// Wrap raw buffers, numbering them from zero at the given timestamp.
    pub fn from_buffers(buffers: impl IntoIterator<Item = Vec<u8>>, observed_at_ms: u64) -> Self {
        Self {
            chunks: buffers
                .into_iter()
                .enumerate()
                .map(|(i, payload)| Chunk {
                    payload,
                    sequence: i as u32,
                    observed_at_ms,
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl ByteSource for MemorySource {
    async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        Ok(self.chunks.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_source_drains_in_order() {
        let mut source = MemorySource::from_buffers([vec![1u8], vec![2u8]], 42);

        let first = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(first.payload, vec![1]);
        assert_eq!(first.sequence, 0);
        assert_eq!(first.observed_at_ms, 42);

        let second = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(second.sequence, 1);

        assert!(source.next_chunk().await.unwrap().is_none());
    }
}
