//! Frame extraction over a raw byte window.
//!
//! [`extract`] is a pure function of its input: it scans the window left to
//! right, validating a candidate header at each position. A valid header
//! consumes a whole frame and the scan resumes at the frame's end; an
//! invalid one advances the scan a single byte, which is what makes the
//! extractor self-resynchronizing after garbage or a truncated predecessor.
//!
//! Decompression failures never abort a scan: a Brotli payload that does
//! not decode is passed through as its raw bytes with a warning.

use std::io::Read;

use tracing::warn;

use super::header::{Encoding, FrameHeader, HEADER_LEN};

/// Frame types that are pure transport noise (position sync, keepalives).
/// Dropped during extraction, before decoding is ever attempted.
pub mod noise {
    pub const HEARTBEAT: i32 = 10_002;
    pub const MOVEMENT_TICK: i32 = 10_021;
    pub const SCENE_SYNC: i32 = 10_077;
}

/// The static extraction-stage exclude list.
pub const NOISE_FRAME_TYPES: &[i32] =
    &[noise::HEARTBEAT, noise::MOVEMENT_TICK, noise::SCENE_SYNC];

/// One extracted frame.
///
/// `span_start..span_end` are offsets into the buffer the frame was
/// extracted from; `span_end - span_start` always equals `9 + declared_len`.
/// For raw frames `payload.len() == declared_len`; a decompressed Brotli
/// payload may differ from the declared (compressed) length.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_type: i32,
    pub declared_len: i32,
    pub encoding: Encoding,
    pub payload: Vec<u8>,
    pub span_start: usize,
    pub span_end: usize,
    /// Running frame counter, stamped by the reassembler.
    pub sequence: u32,
    /// Arrival timestamp of the completing chunk, stamped by the
    /// reassembler. Unix milliseconds.
    pub observed_at_ms: u64,
}

/// Result of one extraction pass.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Extracted frames in ascending span order, noise types removed.
    pub frames: Vec<Frame>,
    /// Byte offset up to which the buffer has been consumed: the end of
    /// the last valid frame walked, including dropped noise frames. Bytes
    /// past this point are an unconsumed tail (garbage still being skipped
    /// or a frame whose trailing bytes have not arrived).
    pub consumed: usize,
}

/// Scan `buffer` and extract every complete frame.
///
/// Deterministic and stateless; the caller re-supplies the unconsumed tail
/// on the next pass.
pub fn extract(buffer: &[u8]) -> Extraction {
    let mut frames = Vec::new();
    let mut consumed = 0usize;
    let mut pos = 0usize;

    while pos + HEADER_LEN <= buffer.len() {
        let header = match FrameHeader::decode(&buffer[pos..]) {
            Some(h) if h.is_plausible() => h,
            _ => {
                // Resynchronize: not a frame boundary, try the next byte.
                pos += 1;
                continue;
            }
        };

        let end = pos + header.frame_len();
        if end > buffer.len() {
            // Either a partial frame still arriving or a lucky-looking
            // garbage header; both resolve by advancing one byte now and
            // re-scanning once more data lands.
            pos += 1;
            continue;
        }

        let raw = &buffer[pos + HEADER_LEN..end];
        let payload = match header.encoding {
            Encoding::Raw => raw.to_vec(),
            Encoding::Brotli => decompress_or_raw(header.frame_type, raw),
        };

        consumed = end;
        if !NOISE_FRAME_TYPES.contains(&header.frame_type) {
            frames.push(Frame {
                frame_type: header.frame_type,
                declared_len: header.length,
                encoding: header.encoding,
                payload,
                span_start: pos,
                span_end: end,
                sequence: 0,
                observed_at_ms: 0,
            });
        }
        pos = end;
    }

    // The scan is already left-to-right; callers may rely on nothing
    // beyond non-overlap and ascending order.
    frames.sort_by_key(|f| f.span_start);

    Extraction { frames, consumed }
}

fn decompress_or_raw(frame_type: i32, raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut decoder = brotli::Decompressor::new(raw, 4096);
    match decoder.read_to_end(&mut out) {
        Ok(_) => out,
        Err(err) => {
            warn!(frame_type, error = %err, "brotli decompression failed, keeping raw payload");
            raw.to_vec()
        }
    }
}
