//! Length-prefixed name decoding.
//!
//! Names arrive as a 4-byte little-endian length followed by that many
//! bytes. The server mixes two text encodings on the same field: plain
//! ASCII identifiers and UTF-16LE display names. UTF-16LE text over a
//! mostly-Latin alphabet shows up as a null byte at almost every odd
//! offset, so the discriminator is density: more than a quarter of the
//! odd-indexed bytes being zero selects UTF-16.

use crate::error::{CombatError, Result};

/// Read a length-prefixed name at `offset`.
///
/// Returns the decoded string and the total bytes consumed (the 4-byte
/// length prefix plus the name bytes).
pub(crate) fn read_name(data: &[u8], offset: usize, context: &str) -> Result<(String, usize)> {
    let len_bytes = data.get(offset..offset + 4).ok_or_else(|| CombatError::Parse {
        context: context.to_string(),
        details: format!("payload too short for name length at offset {offset}"),
    })?;
    let declared = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);

    let start = offset + 4;
    let end = start.checked_add(declared as usize).filter(|e| *e <= data.len()).ok_or_else(
        || CombatError::Parse {
            context: context.to_string(),
            details: format!(
                "name length {declared} at offset {offset} exceeds payload of {} bytes",
                data.len()
            ),
        },
    )?;

    Ok((decode_name_bytes(&data[start..end]), 4 + declared as usize))
}

/// Decode raw name bytes, choosing UTF-16LE or filtered ASCII.
pub(crate) fn decode_name_bytes(raw: &[u8]) -> String {
    if looks_like_utf16le(raw) {
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|unit| *unit != 0)
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        raw.iter()
            .copied()
            .filter(|b| (0x20..=0x7e).contains(b))
            .map(char::from)
            .collect()
    }
}

fn looks_like_utf16le(raw: &[u8]) -> bool {
    let odd_total = raw.len() / 2;
    if odd_total == 0 {
        return false;
    }
    let odd_zeroes = raw.iter().skip(1).step_by(2).filter(|b| **b == 0).count();
    odd_zeroes * 4 > odd_total
}
