//! Bounds-checked little-endian field readers.
//!
//! Every multi-byte value in this protocol is little-endian. The readers
//! here return a structured parse error naming the decoder and offset, so
//! a malformed frame reports where it went wrong without panicking.

use crate::error::{CombatError, Result};
use crate::types::ActorId;

fn take<const N: usize>(data: &[u8], offset: usize, context: &str) -> Result<[u8; N]> {
    let end = offset.checked_add(N).ok_or_else(|| CombatError::Parse {
        context: context.to_string(),
        details: format!("field offset {offset} overflows"),
    })?;
    let slice = data.get(offset..end).ok_or_else(|| CombatError::Parse {
        context: context.to_string(),
        details: format!(
            "payload too short: need {} bytes at offset {}, have {}",
            N,
            offset,
            data.len()
        ),
    })?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

pub(crate) fn read_i32_le(data: &[u8], offset: usize, context: &str) -> Result<i32> {
    Ok(i32::from_le_bytes(take::<4>(data, offset, context)?))
}

pub(crate) fn read_u32_le(data: &[u8], offset: usize, context: &str) -> Result<u32> {
    Ok(u32::from_le_bytes(take::<4>(data, offset, context)?))
}

pub(crate) fn read_f32_le(data: &[u8], offset: usize, context: &str) -> Result<f32> {
    Ok(f32::from_le_bytes(take::<4>(data, offset, context)?))
}

/// Read a 4-byte actor identity (the 4 pad bytes that follow identifiers
/// on the wire are the caller's offset bookkeeping, not part of the id).
pub(crate) fn read_actor(data: &[u8], offset: usize, context: &str) -> Result<ActorId> {
    Ok(ActorId::from_wire(take::<4>(data, offset, context)?))
}

pub(crate) fn read_flag_bytes(data: &[u8], offset: usize, context: &str) -> Result<[u8; 6]> {
    take::<6>(data, offset, context)
}
