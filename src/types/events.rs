//! Typed event records produced by the packet decoders.
//!
//! Each decoder yields one of these records; the dispatch path wraps it in
//! a [`CombatEvent`] carrying the frame sequence number and the arrival
//! timestamp, which is what the correlator's timing rules run on.

use serde::Serialize;

use super::actor::ActorId;
use super::flags::DamageFlags;

/// A skill announcement: who used what on whom.
#[derive(Debug, Clone, Serialize)]
pub struct SkillInfo {
    pub used_by: ActorId,
    pub target: ActorId,
    pub owner: ActorId,
    pub skill_name: String,
    pub x: f32,
    pub y: f32,
    pub extra: i32,
}

/// A skill action signal: a lifecycle step of a casting-family skill.
#[derive(Debug, Clone, Serialize)]
pub struct SkillAction {
    pub used_by: ActorId,
    pub action_name: String,
    pub action_code: i32,
    pub cast_time: f32,
    pub next_target: ActorId,
    pub target: ActorId,
}

/// A damage application. `skill_name` starts empty and is filled in by the
/// correlator when a skill signal can be attributed.
#[derive(Debug, Clone, Serialize)]
pub struct SkillDamage {
    pub used_by: ActorId,
    pub target: ActorId,
    pub damage: u32,
    pub skill_id: i32,
    pub flags: DamageFlags,
    pub skill_name: String,
}

/// A hit-point delta observed on a target.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChangeHp {
    pub target: ActorId,
    pub prev_hp: i32,
    pub current_hp: i32,
}

impl ChangeHp {
    /// Damage derived from the delta; negative for healing.
    pub fn damage(&self) -> i32 {
        self.prev_hp - self.current_hp
    }
}

/// A skill state-transition signal keyed by action code rather than name.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SkillState {
    pub used_by: ActorId,
    pub target: ActorId,
    pub action_code: i32,
    pub flags: DamageFlags,
}

/// The decoded body of one frame.
#[derive(Debug, Clone, Serialize)]
pub enum EventBody {
    SkillInfo(SkillInfo),
    SkillAction(SkillAction),
    SkillDamage(SkillDamage),
    ChangeHp(ChangeHp),
    SkillState(SkillState),
}

/// One decoded frame with its delivery metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CombatEvent {
    pub body: EventBody,
    /// Running frame sequence number stamped by the reassembler.
    pub sequence: u32,
    /// Arrival timestamp (unix milliseconds) of the chunk that completed
    /// this frame.
    pub observed_at_ms: u64,
}
