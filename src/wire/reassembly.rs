//! Stream reassembly over an unbounded chunk sequence.
//!
//! One [`StreamReassembler`] owns the byte buffer for one TCP connection.
//! Chunks append, the extractor runs over the whole window, and only the
//! unconsumed tail is retained for the next pass. A hard cap bounds memory
//! when the peer streams garbage or a frame never completes: exceeding the
//! cap discards the oldest half of the buffer, even if that destroys a
//! pending partial frame. That truncation is a memory-safety valve, not a
//! protocol guarantee.

use tracing::warn;

use super::extract::{Frame, extract};

/// Hard cap on the retained buffer: 3 MiB.
pub const MAX_BUFFER_LEN: usize = 3 * 1024 * 1024;

/// Per-connection reassembly buffer.
pub struct StreamReassembler {
    buffer: Vec<u8>,
    max_buffer: usize,
    next_sequence: u32,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self::with_max_buffer(MAX_BUFFER_LEN)
    }

    /// Override the buffer cap (tests and constrained deployments).
    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self { buffer: Vec::with_capacity(64 * 1024), max_buffer, next_sequence: 0 }
    }

    /// Append one inbound chunk and extract every frame that completes.
    ///
    /// Returned frames are stamped with this reassembler's running
    /// sequence number and the chunk's arrival timestamp.
    pub fn push(&mut self, chunk: &[u8], observed_at_ms: u64) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let extraction = extract(&self.buffer);
        let mut frames = extraction.frames;
        for frame in &mut frames {
            frame.sequence = self.next_sequence;
            self.next_sequence = self.next_sequence.wrapping_add(1);
            frame.observed_at_ms = observed_at_ms;
        }

        if extraction.consumed > 0 {
            self.buffer.drain(..extraction.consumed);
        }

        // Backpressure valve: a peer that never completes a frame (or one
        // oversized chunk) must not grow the buffer without bound.
        while self.buffer.len() > self.max_buffer {
            let discard = self.buffer.len() / 2;
            warn!(
                buffered = self.buffer.len(),
                cap = self.max_buffer,
                discarded = discard,
                "reassembly buffer over cap, dropping oldest half"
            );
            self.buffer.drain(..discard);
        }

        frames
    }

    /// Bytes currently retained awaiting completion.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for StreamReassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::header::{Encoding, FrameHeader};

    fn frame_bytes(frame_type: i32, payload: &[u8]) -> Vec<u8> {
        let header = FrameHeader {
            frame_type,
            length: payload.len() as i32,
            encoding: Encoding::Raw,
        };
        let mut out = header.encode().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn fragmented_frame_completes_across_pushes() {
        let mut reassembler = StreamReassembler::new();
        let bytes = frame_bytes(42, b"split across two segments");

        let first = reassembler.push(&bytes[..11], 1_000);
        assert!(first.is_empty());
        assert_eq!(reassembler.buffered(), 11);

        let second = reassembler.push(&bytes[11..], 1_050);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].payload, b"split across two segments");
        assert_eq!(second[0].observed_at_ms, 1_050);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let mut reassembler = StreamReassembler::new();
        let bytes = frame_bytes(42, b"slow");

        let mut frames = Vec::new();
        for (i, byte) in bytes.iter().enumerate() {
            frames.extend(reassembler.push(&[*byte], i as u64));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"slow");
    }

    #[test]
    fn sequence_numbers_run_across_pushes() {
        let mut reassembler = StreamReassembler::new();

        let mut bytes = frame_bytes(1, b"a");
        bytes.extend(frame_bytes(2, b"b"));
        let first = reassembler.push(&bytes, 0);
        let second = reassembler.push(&frame_bytes(3, b"c"), 1);

        assert_eq!(first[0].sequence, 0);
        assert_eq!(first[1].sequence, 1);
        assert_eq!(second[0].sequence, 2);
    }

    #[test]
    fn garbage_between_frames_is_discarded() {
        let mut reassembler = StreamReassembler::new();

        let mut bytes = frame_bytes(1, b"one");
        bytes.extend([0xde, 0xad, 0xbe]);
        bytes.extend(frame_bytes(2, b"two"));

        let frames = reassembler.push(&bytes, 0);
        assert_eq!(frames.len(), 2);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn buffer_cap_is_never_exceeded() {
        // A tiny cap with an endless garbage stream: the retained buffer
        // must stay under it after every push.
        let cap = 1024;
        let mut reassembler = StreamReassembler::with_max_buffer(cap);
        let garbage = vec![0xffu8; 300];

        for i in 0..64 {
            reassembler.push(&garbage, i);
            assert!(reassembler.buffered() <= cap, "buffer exceeded cap after push {i}");
        }
    }

    #[test]
    fn oversized_single_chunk_is_halved_down() {
        let cap = 1024;
        let mut reassembler = StreamReassembler::with_max_buffer(cap);

        reassembler.push(&vec![0xffu8; 10 * cap], 0);
        assert!(reassembler.buffered() <= cap);
    }

    #[test]
    fn truncation_may_destroy_a_pending_partial_frame() {
        let cap = 64;
        let mut reassembler = StreamReassembler::with_max_buffer(cap);

        // A frame that declares more payload than will ever arrive.
        let header =
            FrameHeader { frame_type: 9, length: 60_000, encoding: Encoding::Raw };
        reassembler.push(&header.encode(), 0);
        for i in 0..40 {
            reassembler.push(&[0xaa; 16], i);
        }
        assert!(reassembler.buffered() <= cap);

        // The stream recovers: a fresh complete frame still extracts.
        let frames = reassembler.push(&frame_bytes(10, b"fresh"), 100);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame_type, 10);
    }
}
