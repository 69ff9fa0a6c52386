//! Skill–damage correlation.
//!
//! The matching policy sits behind the [`SkillMatcher`] trait so an
//! alternate engine can be substituted at pipeline construction without
//! touching the extractor or the decoders. [`SkillTracker`] is the default
//! engine implementing the priority-ordered heuristics this protocol
//! needs; see its module documentation for the quirks it preserves.

mod name_parse;
mod tracker;

pub use name_parse::{NameSuffix, SkillPhase, SkillType, split_suffix};
pub use tracker::{ActiveSkill, INSTANT_WINDOW_MS, STATE_TTL_MS, SkillTracker};

use crate::types::{ActorId, SkillAction, SkillDamage, SkillInfo, SkillState};

/// One skill announcement, unified across the signal-carrying records.
#[derive(Debug, Clone)]
pub struct SkillSignal {
    pub used_by: ActorId,
    pub target: ActorId,
    pub next_target: Option<ActorId>,
    pub name: String,
}

impl From<&SkillInfo> for SkillSignal {
    fn from(info: &SkillInfo) -> Self {
        Self {
            used_by: info.used_by,
            target: info.target,
            next_target: None,
            name: info.skill_name.clone(),
        }
    }
}

impl From<&SkillAction> for SkillSignal {
    fn from(action: &SkillAction) -> Self {
        Self {
            used_by: action.used_by,
            target: action.target,
            next_target: Some(action.next_target),
            name: action.action_name.clone(),
        }
    }
}

/// Matching policy capability.
///
/// All timing arguments are the arrival timestamps carried on events
/// (unix milliseconds); implementations never read a clock, which keeps
/// matching deterministic and replayable.
pub trait SkillMatcher: Send + 'static {
    /// Register a skill signal for later damage attribution.
    fn enqueue_skill(&mut self, signal: SkillSignal, at_ms: u64);

    /// Observe a state-transition signal (keep-alive for tracked skills).
    fn note_state(&mut self, state: &SkillState, at_ms: u64);

    /// Attribute a damage event; `Some(name)` on the first rule that
    /// matches, `None` when the caller should fall back to a flag-derived
    /// name.
    fn match_damage(&mut self, damage: &SkillDamage, at_ms: u64) -> Option<String>;

    /// Reap state not touched within the TTL. Invoked once per processed
    /// batch; this is the only bound on state growth for skills that never
    /// receive a terminating signal.
    fn cleanup(&mut self, latest_ms: u64);
}
