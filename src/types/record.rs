//! Sink-facing resolved damage records.
//!
//! A [`ResolvedDamage`] is the final product of the pipeline: one damage
//! application with the attributed skill name. Records render as the
//! pipe-delimited log line the outward transport broadcasts; booleans are
//! rendered `1`/`0`.

use serde::Serialize;

use super::actor::ActorId;
use super::events::SkillDamage;
use super::flags::DamageFlags;

/// One resolved (attacker, target, skill, amount) record.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedDamage {
    /// Arrival timestamp, unix milliseconds.
    pub at_ms: u64,
    pub used_by: ActorId,
    pub target: ActorId,
    /// Matched skill name, or a flag-derived synthetic name when nothing
    /// matched.
    pub skill_name: String,
    pub damage: u32,
    pub flags: DamageFlags,
    pub skill_id: i32,
}

impl ResolvedDamage {
    /// Build the record from a (possibly already name-attributed) damage
    /// event. An empty name is synthesized from the flags.
    pub fn from_damage(damage: &SkillDamage, at_ms: u64) -> Self {
        let skill_name = if damage.skill_name.is_empty() {
            synthesized_name(&damage.flags)
        } else {
            damage.skill_name.clone()
        };
        Self {
            at_ms,
            used_by: damage.used_by,
            target: damage.target,
            skill_name,
            damage: damage.damage,
            flags: damage.flags,
            skill_id: damage.skill_id,
        }
    }

    /// Render the pipe-delimited sink line.
    ///
    /// Field order is the wire contract of the outward transport:
    /// `unixMillis|usedBy|target|skillName|damage|crit|addHit|unguarded|
    /// broken|firstHit|defaultAttack|multiHit|powerHit|fastHit|dot|ice|
    /// fire|electric|holy|dark|bleed|poison|mind|skillId`.
    pub fn to_log_line(&self) -> String {
        let f = &self.flags;
        let b = |v: bool| if v { '1' } else { '0' };
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.at_ms,
            self.used_by,
            self.target,
            self.skill_name,
            self.damage,
            b(f.crit()),
            b(f.add_hit()),
            b(f.unguarded()),
            b(f.broken()),
            b(f.first_hit()),
            b(f.default_attack()),
            b(f.multi_hit()),
            b(f.power_hit()),
            b(f.fast_hit()),
            b(f.dot()),
            b(f.ice()),
            b(f.fire()),
            b(f.electric()),
            b(f.holy()),
            b(f.dark()),
            b(f.bleed()),
            b(f.poison()),
            b(f.mind()),
            self.skill_id,
        )
    }
}

/// Synthesize a skill name from flags when no skill signal matched.
///
/// Damage-over-time attribution is flag-derived by design: `DOT` plus the
/// active elements, or bare `DOT` when untyped. Everything else is
/// `UNKNOWN`.
pub fn synthesized_name(flags: &DamageFlags) -> String {
    if flags.dot() {
        let elements = flags.active_elements();
        if elements.is_empty() {
            "DOT".to_string()
        } else {
            format!("DOT_{}", elements.join("_"))
        }
    } else {
        "UNKNOWN".to_string()
    }
}
