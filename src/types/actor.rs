//! Actor identities and target-matching rules.
//!
//! The wire carries identities as 4-byte fields rendered as 8 lowercase
//! hex characters. Two values are reserved: all-zeroes is the wildcard
//! (self / unset) and all-ones is the broadcast target (area effects).
//! Damage attribution only ever compares identities in *normalized* form,
//! which zeroes the low byte; the sentinels pass through unchanged.

use serde::{Serialize, Serializer};
use std::fmt;

/// A 4-byte actor identity as carried on the wire.
///
/// Kept as raw bytes rather than a hex `String` so that the per-actor state
/// tables hash fixed-width keys instead of heap strings on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId([u8; 4]);

impl ActorId {
    /// Wildcard identity: self / unset. Matches any target.
    pub const WILDCARD: ActorId = ActorId([0x00; 4]);

    /// Broadcast identity: anyone in range. Matches any target.
    pub const BROADCAST: ActorId = ActorId([0xff; 4]);

    /// Wrap the raw wire bytes.
    pub const fn from_wire(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Parse an 8-character lowercase hex rendering back into an identity.
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 4];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// The raw wire bytes.
    pub const fn as_bytes(&self) -> [u8; 4] {
        self.0
    }

    pub fn is_wildcard(&self) -> bool {
        *self == Self::WILDCARD
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    fn is_sentinel(&self) -> bool {
        self.is_wildcard() || self.is_broadcast()
    }

    /// Normalized form: the last two hex characters (the low byte) forced
    /// to zero. Sentinels map to themselves. Idempotent.
    pub fn normalized(&self) -> Self {
        if self.is_sentinel() {
            return *self;
        }
        Self([self.0[0], self.0[1], self.0[2], 0x00])
    }

    /// Target-matching rule: true if either side is the wildcard, either
    /// side is the broadcast sentinel, or the normalized forms are equal.
    pub fn matches(&self, other: ActorId) -> bool {
        if self.is_sentinel() || other.is_sentinel() {
            return true;
        }
        self.normalized() == other.normalized()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for ActorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

/// Match a skill's recorded target (or its follow-up target, when one was
/// announced) against a damage event's target.
pub fn target_match(recorded: ActorId, next: Option<ActorId>, damage: ActorId) -> bool {
    recorded.matches(damage) || next.is_some_and(|n| n.matches(damage))
}
