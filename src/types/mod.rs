//! Core types for combat-wire data representation.
//!
//! This module provides the foundational data structures for the decoded
//! side of the pipeline:
//! - [`ActorId`] is the 4-byte wire identity with sentinel and
//!   normalization semantics used by every matching rule
//! - [`DamageFlags`] is the immutable 6-byte qualifier bit-set
//! - the event records ([`SkillInfo`], [`SkillAction`], [`SkillDamage`],
//!   [`ChangeHp`], [`SkillState`]) are what the packet decoders produce
//! - [`ResolvedDamage`] is the sink-facing output record
//!
//! Identity comparison never allocates: actors hash as fixed-width byte
//! arrays and normalization is a single byte store.

mod actor;
mod events;
mod flags;
mod record;

pub use actor::{ActorId, target_match};
pub use events::{ChangeHp, CombatEvent, EventBody, SkillAction, SkillDamage, SkillInfo, SkillState};
pub use flags::{DamageFlags, masks};
pub use record::{ResolvedDamage, synthesized_name};
