//! Packet decoders: fixed-layout binary readers, one per frame type.
//!
//! Each decoder is a pure function from payload bytes to one typed event
//! record. All integers and floats are little-endian; identifiers occupy
//! 4 bytes followed by 4 bytes of padding. Decoders fail only with a
//! "too short" parse error when the payload is under the layout's minimum
//! length; the dispatch path logs such failures and skips the frame so a
//! single malformed decode never stops a batch.

mod fields;
mod names;

use fields::{read_actor, read_f32_le, read_flag_bytes, read_i32_le, read_u32_le};
use names::read_name;

use crate::error::{CombatError, Result};
use crate::types::{ChangeHp, DamageFlags, EventBody, SkillAction, SkillDamage, SkillInfo, SkillState};

/// Frame type ids of the decoded subset of the protocol.
pub mod frame_type {
    pub const SKILL_INFO: i32 = 20_049;
    pub const SKILL_ACTION: i32 = 20_050;
    pub const SKILL_DAMAGE: i32 = 20_064;
    pub const SKILL_STATE: i32 = 20_071;
    pub const CHANGE_HP: i32 = 20_114;
}

/// Decode one frame payload by type.
///
/// Returns `None` for frame types outside the decoded subset, and
/// `Some(Err(..))` when a known type's payload violates its layout.
pub fn decode_frame(frame_type: i32, payload: &[u8]) -> Option<Result<EventBody>> {
    match frame_type {
        frame_type::SKILL_INFO => Some(decode_skill_info(payload).map(EventBody::SkillInfo)),
        frame_type::SKILL_ACTION => Some(decode_skill_action(payload).map(EventBody::SkillAction)),
        frame_type::SKILL_DAMAGE => Some(decode_skill_damage(payload).map(EventBody::SkillDamage)),
        frame_type::SKILL_STATE => Some(decode_skill_state(payload).map(EventBody::SkillState)),
        frame_type::CHANGE_HP => Some(decode_change_hp(payload).map(EventBody::ChangeHp)),
        _ => None,
    }
}

fn check_min(payload: &[u8], min: usize, context: &str) -> Result<()> {
    if payload.len() < min {
        return Err(CombatError::Parse {
            context: context.to_string(),
            details: format!("payload too short: {} bytes, layout needs {}", payload.len(), min),
        });
    }
    Ok(())
}

/// Layout:
/// ```text
/// usedBy(4) pad(4) | target(4) pad(4) | owner(4) pad(4)
/// | nameLen(4) name(n) | x:f32(4) pad(4) | y:f32(4) pad(4) | extra(4)
/// ```
pub fn decode_skill_info(payload: &[u8]) -> Result<SkillInfo> {
    const CTX: &str = "SkillInfo decode";
    check_min(payload, 48, CTX)?;

    let used_by = read_actor(payload, 0, CTX)?;
    let target = read_actor(payload, 8, CTX)?;
    let owner = read_actor(payload, 16, CTX)?;
    let (skill_name, name_len) = read_name(payload, 24, CTX)?;

    let tail = 24 + name_len;
    let x = read_f32_le(payload, tail, CTX)?;
    let y = read_f32_le(payload, tail + 8, CTX)?;
    let extra = read_i32_le(payload, tail + 16, CTX)?;

    Ok(SkillInfo { used_by, target, owner, skill_name, x, y, extra })
}

/// Layout:
/// ```text
/// usedBy(4) pad(4) | nameLen(4) name(n) | action:i32(4) pad(4)
/// | unknown(4) | castTime:f32(4) | nextTarget(4) | ... target = last 4 bytes
/// ```
pub fn decode_skill_action(payload: &[u8]) -> Result<SkillAction> {
    const CTX: &str = "SkillAction decode";
    check_min(payload, 32, CTX)?;

    let used_by = read_actor(payload, 0, CTX)?;
    let (action_name, name_len) = read_name(payload, 8, CTX)?;

    let tail = 8 + name_len;
    let action_code = read_i32_le(payload, tail, CTX)?;
    // tail + 4: pad, tail + 8: unknown word
    let cast_time = read_f32_le(payload, tail + 12, CTX)?;
    let next_target = read_actor(payload, tail + 16, CTX)?;
    let target = read_actor(payload, payload.len() - 4, CTX)?;

    Ok(SkillAction { used_by, action_name, action_code, cast_time, next_target, target })
}

/// Layout:
/// ```text
/// usedBy(4) pad(4) | target(4) pad(4) | damage:u32(4) | unknown(12)
/// | flags(6) | skillId:i32(4)
/// ```
pub fn decode_skill_damage(payload: &[u8]) -> Result<SkillDamage> {
    const CTX: &str = "SkillDamage decode";
    check_min(payload, 42, CTX)?;

    let used_by = read_actor(payload, 0, CTX)?;
    let target = read_actor(payload, 8, CTX)?;
    let damage = read_u32_le(payload, 16, CTX)?;
    let flags = DamageFlags::decode(read_flag_bytes(payload, 32, CTX)?);
    let skill_id = read_i32_le(payload, 38, CTX)?;

    Ok(SkillDamage { used_by, target, damage, skill_id, flags, skill_name: String::new() })
}

/// Layout:
/// ```text
/// target(4) pad(4) | prevHp:i32(4) | currentHp:i32(4)
/// ```
pub fn decode_change_hp(payload: &[u8]) -> Result<ChangeHp> {
    const CTX: &str = "ChangeHp decode";
    check_min(payload, 16, CTX)?;

    let target = read_actor(payload, 0, CTX)?;
    let prev_hp = read_i32_le(payload, 8, CTX)?;
    let current_hp = read_i32_le(payload, 12, CTX)?;

    Ok(ChangeHp { target, prev_hp, current_hp })
}

/// Layout:
/// ```text
/// usedBy(4) pad(4) | target(4) pad(4) | actionCode:i32(4) | flags(6)
/// ```
pub fn decode_skill_state(payload: &[u8]) -> Result<SkillState> {
    const CTX: &str = "SkillState decode";
    check_min(payload, 26, CTX)?;

    let used_by = read_actor(payload, 0, CTX)?;
    let target = read_actor(payload, 8, CTX)?;
    let action_code = read_i32_le(payload, 16, CTX)?;
    let flags = DamageFlags::decode(read_flag_bytes(payload, 20, CTX)?);

    Ok(SkillState { used_by, target, action_code, flags })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActorId;

    fn actor(hex8: &str) -> ActorId {
        ActorId::from_hex(hex8).unwrap()
    }

    fn put_actor(buf: &mut Vec<u8>, hex8: &str) {
        buf.extend_from_slice(&actor(hex8).as_bytes());
        buf.extend_from_slice(&[0u8; 4]);
    }

    fn put_name(buf: &mut Vec<u8>, name: &str) {
        buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
    }

    #[test]
    fn skill_info_layout() {
        let mut payload = Vec::new();
        put_actor(&mut payload, "aaaa0001");
        put_actor(&mut payload, "bbbb0002");
        put_actor(&mut payload, "aaaa0001");
        put_name(&mut payload, "Fireball");
        payload.extend_from_slice(&12.5f32.to_le_bytes());
        payload.extend_from_slice(&[0u8; 4]);
        payload.extend_from_slice(&(-3.0f32).to_le_bytes());
        payload.extend_from_slice(&[0u8; 4]);
        payload.extend_from_slice(&7i32.to_le_bytes());

        let info = decode_skill_info(&payload).unwrap();
        assert_eq!(info.used_by, actor("aaaa0001"));
        assert_eq!(info.target, actor("bbbb0002"));
        assert_eq!(info.owner, actor("aaaa0001"));
        assert_eq!(info.skill_name, "Fireball");
        assert!((info.x - 12.5).abs() < f32::EPSILON);
        assert!((info.y + 3.0).abs() < f32::EPSILON);
        assert_eq!(info.extra, 7);
    }

    #[test]
    fn skill_action_layout() {
        let mut payload = Vec::new();
        put_actor(&mut payload, "aaaa0001");
        put_name(&mut payload, "Lightning_Casting");
        payload.extend_from_slice(&902i32.to_le_bytes());
        payload.extend_from_slice(&[0u8; 4]); // pad
        payload.extend_from_slice(&[0u8; 4]); // unknown
        payload.extend_from_slice(&1.75f32.to_le_bytes());
        payload.extend_from_slice(&actor("cccc0003").as_bytes());
        payload.extend_from_slice(&actor("bbbb0002").as_bytes());

        let action = decode_skill_action(&payload).unwrap();
        assert_eq!(action.used_by, actor("aaaa0001"));
        assert_eq!(action.action_name, "Lightning_Casting");
        assert_eq!(action.action_code, 902);
        assert!((action.cast_time - 1.75).abs() < f32::EPSILON);
        assert_eq!(action.next_target, actor("cccc0003"));
        assert_eq!(action.target, actor("bbbb0002"));
    }

    #[test]
    fn skill_damage_layout() {
        let mut payload = Vec::new();
        put_actor(&mut payload, "aaaa0001");
        put_actor(&mut payload, "bbbb0002");
        payload.extend_from_slice(&500u32.to_le_bytes());
        payload.extend_from_slice(&[0u8; 12]);
        payload.extend_from_slice(&[0x01, 0x08, 0x00, 0x40, 0x00, 0x00]);
        payload.extend_from_slice(&31i32.to_le_bytes());

        let damage = decode_skill_damage(&payload).unwrap();
        assert_eq!(damage.used_by, actor("aaaa0001"));
        assert_eq!(damage.target, actor("bbbb0002"));
        assert_eq!(damage.damage, 500);
        assert_eq!(damage.skill_id, 31);
        assert!(damage.flags.crit());
        assert!(damage.flags.dot());
        assert!(damage.flags.fire());
        assert!(damage.skill_name.is_empty());
    }

    #[test]
    fn change_hp_layout() {
        let mut payload = Vec::new();
        put_actor(&mut payload, "bbbb0002");
        payload.extend_from_slice(&1500i32.to_le_bytes());
        payload.extend_from_slice(&900i32.to_le_bytes());

        let hp = decode_change_hp(&payload).unwrap();
        assert_eq!(hp.target, actor("bbbb0002"));
        assert_eq!(hp.damage(), 600);
    }

    #[test]
    fn skill_state_layout() {
        let mut payload = Vec::new();
        put_actor(&mut payload, "aaaa0001");
        put_actor(&mut payload, "bbbb0002");
        payload.extend_from_slice(&77i32.to_le_bytes());
        payload.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00]);

        let state = decode_skill_state(&payload).unwrap();
        assert_eq!(state.used_by, actor("aaaa0001"));
        assert_eq!(state.target, actor("bbbb0002"));
        assert_eq!(state.action_code, 77);
        assert!(state.flags.multi_hit());
    }

    #[test]
    fn short_payloads_error_for_every_decoder() {
        let short = [0u8; 8];
        assert!(decode_skill_info(&short).is_err());
        assert!(decode_skill_action(&short).is_err());
        assert!(decode_skill_damage(&short).is_err());
        assert!(decode_change_hp(&short).is_err());
        assert!(decode_skill_state(&short).is_err());
    }

    #[test]
    fn unknown_frame_type_is_not_decoded() {
        assert!(decode_frame(99_999, &[0u8; 64]).is_none());
    }

    #[test]
    fn known_frame_type_dispatches() {
        let mut payload = Vec::new();
        put_actor(&mut payload, "bbbb0002");
        payload.extend_from_slice(&100i32.to_le_bytes());
        payload.extend_from_slice(&90i32.to_le_bytes());

        match decode_frame(frame_type::CHANGE_HP, &payload) {
            Some(Ok(EventBody::ChangeHp(hp))) => assert_eq!(hp.damage(), 10),
            other => panic!("unexpected decode result: {other:?}"),
        }
    }
}
