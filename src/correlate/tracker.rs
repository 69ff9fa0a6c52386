//! The default skill–damage matching engine.
//!
//! The wire protocol carries no causal link between a skill signal and the
//! damage it produces, so attribution is a best-effort join over identity
//! fields, approximate timestamps and a per-actor state machine. Matching
//! rules run in strict priority order; the first success wins. State is
//! sharded per actor: each attacker owns a casting table keyed by
//! (base name, normalized target) and a queue of instant-skill signals.
//!
//! Two protocol quirks are load-bearing and intentionally preserved:
//! - the first damage seen while a skill is still in its `Casting` phase
//!   reclassifies that skill as channeling (rule 2a);
//! - a `Casting`-type entry in its `Ending` phase is discarded unmatched
//!   the first time damage consults it (rule 2c); the server tends to
//!   emit a spurious early `_End` before the real hit.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, trace};

use super::name_parse::{NameSuffix, SkillPhase, SkillType, split_suffix};
use super::{SkillMatcher, SkillSignal};
use crate::types::{ActorId, SkillDamage, SkillState, target_match};

/// How long a state entry may sit untouched before the sweep reaps it.
pub const STATE_TTL_MS: u64 = 10_000;

/// Window for matching damage against a queued instant skill.
pub const INSTANT_WINDOW_MS: u64 = 2_000;

/// One live casting-family skill instance.
#[derive(Debug, Clone)]
pub struct ActiveSkill {
    pub base: String,
    /// Normalized target recorded at creation.
    pub target: ActorId,
    pub next_target: Option<ActorId>,
    pub phase: SkillPhase,
    pub skill_type: SkillType,
    pub last_state_ms: u64,
    pub is_using: bool,
    pub targeting_count: i32,
}

#[derive(Debug, Clone)]
struct InstantSkill {
    name: String,
    target: ActorId,
    next_target: Option<ActorId>,
    at_ms: u64,
}

#[derive(Debug, Default)]
struct ActorState {
    casting: HashMap<(String, ActorId), ActiveSkill>,
    instants: VecDeque<InstantSkill>,
}

impl ActorState {
    fn is_empty(&self) -> bool {
        self.casting.is_empty() && self.instants.is_empty()
    }
}

/// Default [`SkillMatcher`] implementation.
pub struct SkillTracker {
    actors: HashMap<ActorId, ActorState>,
    instant_window_ms: u64,
    state_ttl_ms: u64,
}

impl SkillTracker {
    pub fn new() -> Self {
        Self::with_windows(INSTANT_WINDOW_MS, STATE_TTL_MS)
    }

    /// Override the matching window and state TTL (tests, tuning).
    pub fn with_windows(instant_window_ms: u64, state_ttl_ms: u64) -> Self {
        Self { actors: HashMap::new(), instant_window_ms, state_ttl_ms }
    }

    /// Number of actors currently holding any state.
    pub fn tracked_actors(&self) -> usize {
        self.actors.len()
    }

    /// Resolve a suffix to (phase, type). `_End`/`_Hit` inherit the type
    /// of an existing same-named casting entry, defaulting to plain
    /// casting when none exists.
    fn resolve(&self, used_by: ActorId, base: &str, suffix: NameSuffix) -> (SkillPhase, SkillType) {
        match suffix {
            NameSuffix::Casting => (SkillPhase::Casting, SkillType::Casting),
            NameSuffix::Targeting => (SkillPhase::Targeting, SkillType::TargetCasting),
            NameSuffix::End => {
                (SkillPhase::Ending, self.existing_type(used_by, base).unwrap_or(SkillType::Casting))
            }
            NameSuffix::Hit => {
                (SkillPhase::Hit, self.existing_type(used_by, base).unwrap_or(SkillType::Casting))
            }
            NameSuffix::Idle => (SkillPhase::Idle, SkillType::Instant),
            NameSuffix::None => (SkillPhase::Instant, SkillType::Instant),
        }
    }

    fn existing_type(&self, used_by: ActorId, base: &str) -> Option<SkillType> {
        let actor = self.actors.get(&used_by)?;
        actor
            .casting
            .iter()
            .find(|((name, _), _)| name == base)
            .map(|(_, entry)| entry.skill_type)
    }

    fn enqueue_casting(
        &mut self,
        signal: &SkillSignal,
        base: &str,
        phase: SkillPhase,
        skill_type: SkillType,
        at_ms: u64,
    ) {
        let norm = signal.target.normalized();
        let actor = self.actors.entry(signal.used_by).or_default();
        let key = (base.to_string(), norm);

        if let Some(entry) = actor.casting.get_mut(&key) {
            match phase {
                SkillPhase::Targeting => {
                    entry.targeting_count += 1;
                }
                SkillPhase::Hit => {
                    entry.targeting_count -= 1;
                    if entry.targeting_count == 0 {
                        // Casting arc complete: every targeting step got
                        // its hit.
                        actor.casting.remove(&key);
                    }
                }
                _ => {
                    entry.phase = phase;
                    entry.skill_type = skill_type;
                    entry.last_state_ms = at_ms;
                    if signal.next_target.is_some() {
                        entry.next_target = signal.next_target;
                    }
                }
            }
            return;
        }

        actor.casting.insert(
            key,
            ActiveSkill {
                base: base.to_string(),
                target: norm,
                next_target: signal.next_target,
                phase,
                skill_type,
                last_state_ms: at_ms,
                is_using: false,
                targeting_count: i32::from(phase == SkillPhase::Targeting),
            },
        );
    }

    /// `Idle` marks the actor's most recent ending channel as finished; it
    /// will be reaped by the next channeling match or by cleanup.
    fn finish_channel(&mut self, used_by: ActorId, at_ms: u64) {
        let Some(actor) = self.actors.get_mut(&used_by) else {
            return;
        };
        if let Some(entry) = actor
            .casting
            .values_mut()
            .filter(|e| e.skill_type == SkillType::Channeling && e.phase == SkillPhase::Ending)
            .max_by_key(|e| e.last_state_ms)
        {
            trace!(actor = %used_by, skill = %entry.base, "channel marked idle");
            entry.phase = SkillPhase::Idle;
            entry.last_state_ms = at_ms;
        }
    }

    /// Rule 2a: the first damage during a `Casting` phase reclassifies the
    /// nearest-in-time casting entry as channeling. Returns whether a flip
    /// happened; the caller then re-attempts the channeling match.
    fn flip_nearest_casting(&mut self, used_by: ActorId, at_ms: u64) -> bool {
        let Some(actor) = self.actors.get_mut(&used_by) else {
            return false;
        };
        let key = actor
            .casting
            .iter()
            .filter(|(_, e)| e.skill_type == SkillType::Casting && e.phase == SkillPhase::Casting)
            .min_by_key(|(_, e)| at_ms.abs_diff(e.last_state_ms))
            .map(|(k, _)| k.clone());
        if let Some(key) = key {
            if let Some(entry) = actor.casting.get_mut(&key) {
                debug!(actor = %used_by, skill = %entry.base, "casting skill reclassified as channeling");
                entry.skill_type = SkillType::Channeling;
                return true;
            }
        }
        false
    }

    /// Rule 2b: a target-cast that reached `Ending` and has not produced
    /// damage yet.
    fn match_targeting_cast(&mut self, used_by: ActorId, at_ms: u64) -> Option<String> {
        let actor = self.actors.get_mut(&used_by)?;
        let key = actor
            .casting
            .iter()
            .filter(|(_, e)| {
                e.skill_type == SkillType::TargetCasting
                    && e.phase == SkillPhase::Ending
                    && !e.is_using
            })
            .min_by_key(|(_, e)| at_ms.abs_diff(e.last_state_ms))
            .map(|(k, _)| k.clone())?;
        let entry = actor.casting.get_mut(&key)?;
        entry.is_using = true;
        Some(entry.base.clone())
    }

    /// Rule 2c: a plain cast that reached `Ending`. The first encounter is
    /// treated as the protocol's spurious early `_End` and discarded
    /// without a match; only an entry already marked in-use matches.
    fn match_lazy_cast(&mut self, used_by: ActorId, at_ms: u64) -> Option<String> {
        let actor = self.actors.get_mut(&used_by)?;
        let key = actor
            .casting
            .iter()
            .filter(|(_, e)| e.skill_type == SkillType::Casting && e.phase == SkillPhase::Ending)
            .min_by_key(|(_, e)| at_ms.abs_diff(e.last_state_ms))
            .map(|(k, _)| k.clone())?;
        let entry = actor.casting.get(&key)?;
        if !entry.is_using {
            trace!(actor = %used_by, skill = %entry.base, "stale ended cast discarded");
            actor.casting.remove(&key);
            return None;
        }
        Some(entry.base.clone())
    }

    /// Rule 3: channeling skills keep matching while alive; an `Idle`
    /// channel matches one final tick and is removed.
    fn match_channeling(&mut self, damage: &SkillDamage, at_ms: u64) -> Option<String> {
        let actor = self.actors.get_mut(&damage.used_by)?;
        let key = actor
            .casting
            .iter()
            .filter(|(_, e)| {
                e.skill_type == SkillType::Channeling
                    && target_match(e.target, e.next_target, damage.target)
            })
            .min_by_key(|(_, e)| at_ms.abs_diff(e.last_state_ms))
            .map(|(k, _)| k.clone())?;
        let entry = actor.casting.get_mut(&key)?;
        if entry.phase == SkillPhase::Idle {
            let name = entry.base.clone();
            actor.casting.remove(&key);
            return Some(name);
        }
        entry.last_state_ms = at_ms;
        Some(entry.base.clone())
    }

    /// Rule 4: nearest queued instant skill with a matching target inside
    /// the window. Broadcast-targeted entries stay queued, since one area
    /// effect legitimately produces many damage events.
    fn match_instant(&mut self, damage: &SkillDamage, at_ms: u64) -> Option<String> {
        let window = self.instant_window_ms;
        let actor = self.actors.get_mut(&damage.used_by)?;
        let index = actor
            .instants
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                target_match(e.target, e.next_target, damage.target)
                    && at_ms.abs_diff(e.at_ms) <= window
            })
            .min_by_key(|(_, e)| at_ms.abs_diff(e.at_ms))
            .map(|(i, _)| i)?;
        let name = actor.instants[index].name.clone();
        if !actor.instants[index].target.is_broadcast() {
            actor.instants.remove(index);
        }
        Some(name)
    }
}

impl Default for SkillTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillMatcher for SkillTracker {
    fn enqueue_skill(&mut self, signal: SkillSignal, at_ms: u64) {
        let (base, suffix) = split_suffix(&signal.name);
        let (phase, skill_type) = self.resolve(signal.used_by, base, suffix);

        if skill_type != SkillType::Instant {
            let base = base.to_string();
            self.enqueue_casting(&signal, &base, phase, skill_type, at_ms);
        } else if base == "Idle" {
            self.finish_channel(signal.used_by, at_ms);
        } else {
            let name = base.to_string();
            self.actors.entry(signal.used_by).or_default().instants.push_back(InstantSkill {
                name,
                target: signal.target,
                next_target: signal.next_target,
                at_ms,
            });
        }
    }

    fn note_state(&mut self, state: &SkillState, at_ms: u64) {
        if let Some(actor) = self.actors.get_mut(&state.used_by) {
            for entry in actor
                .casting
                .values_mut()
                .filter(|e| target_match(e.target, e.next_target, state.target))
            {
                entry.last_state_ms = at_ms;
            }
        }
    }

    fn match_damage(&mut self, damage: &SkillDamage, at_ms: u64) -> Option<String> {
        // Rule 1: unnamed DoT damage is attributed by flags downstream,
        // never by this matcher.
        if damage.flags.dot() && damage.skill_name.is_empty() {
            return None;
        }

        // Rule 2a: flip, then re-attempt against the now-channeling entry.
        if self.flip_nearest_casting(damage.used_by, at_ms) {
            if let Some(name) = self.match_channeling(damage, at_ms) {
                return Some(name);
            }
        }

        // Rules 2b, 2c, 3, 4 in order; first success wins.
        if let Some(name) = self.match_targeting_cast(damage.used_by, at_ms) {
            return Some(name);
        }
        if let Some(name) = self.match_lazy_cast(damage.used_by, at_ms) {
            return Some(name);
        }
        if let Some(name) = self.match_channeling(damage, at_ms) {
            return Some(name);
        }
        self.match_instant(damage, at_ms)
    }

    fn cleanup(&mut self, latest_ms: u64) {
        let ttl = self.state_ttl_ms;
        for actor in self.actors.values_mut() {
            actor.casting.retain(|_, e| latest_ms.saturating_sub(e.last_state_ms) <= ttl);
            actor.instants.retain(|e| latest_ms.saturating_sub(e.at_ms) <= ttl);
        }
        self.actors.retain(|_, state| !state.is_empty());
    }
}
