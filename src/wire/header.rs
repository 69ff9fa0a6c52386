//! Frame header decoding and validation.
//!
//! Every wire frame opens with a fixed 9-byte header, little-endian:
//!
//! ```text
//! struct frame_header {
//!   int32  type;      // offset 0
//!   int32  length;    // offset 4, payload bytes following the header
//!   uint8  encoding;  // offset 8, 0 = raw, 1 = brotli
//! }
//! ```
//!
//! Header decoding is the leaf classifier of the extractor: it carries no
//! state and a rejected candidate position simply advances the scan by one
//! byte.

/// Size of the frame header in bytes.
pub const HEADER_LEN: usize = 9;

/// Upper bound on a declared payload length.
pub const MAX_PAYLOAD_LEN: i32 = 65_536;

/// Upper bound on a frame type id.
pub const MAX_FRAME_TYPE: i32 = 200_000;

/// Payload encoding carried in the header's last byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Raw,
    Brotli,
}

impl Encoding {
    /// Map the wire byte; anything but 0/1 is an invalid header.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Encoding::Raw),
            1 => Some(Encoding::Brotli),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Encoding::Raw => 0,
            Encoding::Brotli => 1,
        }
    }
}

/// A decoded 9-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: i32,
    pub length: i32,
    pub encoding: Encoding,
}

impl FrameHeader {
    /// Decode a header from the start of `bytes`. Returns `None` when
    /// fewer than [`HEADER_LEN`] bytes are available or the encoding byte
    /// is out of range.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let frame_type = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let length = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let encoding = Encoding::from_wire(bytes[8])?;
        Some(Self { frame_type, length, encoding })
    }

    /// Range checks that do not depend on the surrounding buffer: declared
    /// length within 1..=65536 and type within 1..=200000.
    pub fn is_plausible(&self) -> bool {
        (1..=MAX_PAYLOAD_LEN).contains(&self.length)
            && self.frame_type > 0
            && self.frame_type <= MAX_FRAME_TYPE
    }

    /// Total frame size on the wire: header plus declared payload.
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.length as usize
    }

    /// Encode back to the 9-byte wire form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.frame_type.to_le_bytes());
        out[4..8].copy_from_slice(&self.length.to_le_bytes());
        out[8] = self.encoding.to_wire();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let header = FrameHeader { frame_type: 20_064, length: 42, encoding: Encoding::Raw };
        assert_eq!(FrameHeader::decode(&header.encode()), Some(header));

        let header = FrameHeader { frame_type: 7, length: 65_536, encoding: Encoding::Brotli };
        assert_eq!(FrameHeader::decode(&header.encode()), Some(header));
    }

    #[test]
    fn short_input_is_rejected() {
        assert_eq!(FrameHeader::decode(&[0u8; 8]), None);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let mut bytes = FrameHeader { frame_type: 1, length: 1, encoding: Encoding::Raw }.encode();
        bytes[8] = 2;
        assert_eq!(FrameHeader::decode(&bytes), None);
    }

    #[test]
    fn plausibility_bounds() {
        let base = FrameHeader { frame_type: 100, length: 100, encoding: Encoding::Raw };
        assert!(base.is_plausible());

        assert!(!FrameHeader { length: 0, ..base }.is_plausible());
        assert!(!FrameHeader { length: MAX_PAYLOAD_LEN + 1, ..base }.is_plausible());
        assert!(FrameHeader { length: MAX_PAYLOAD_LEN, ..base }.is_plausible());

        assert!(!FrameHeader { frame_type: 0, ..base }.is_plausible());
        assert!(!FrameHeader { frame_type: -3, ..base }.is_plausible());
        assert!(!FrameHeader { frame_type: MAX_FRAME_TYPE + 1, ..base }.is_plausible());
        assert!(FrameHeader { frame_type: MAX_FRAME_TYPE, ..base }.is_plausible());
    }
}
