//! Damage qualifier flags decoded from the 6-byte wire field.
//!
//! The flag word is an immutable bit-set; decoding masks each byte down to
//! its defined bits, so re-encoding reproduces exactly the qualifier set
//! (unassigned bits are dropped). Bytes 2 and 5 carry no assigned bits in
//! this protocol revision.

use serde::{Deserialize, Serialize};

/// Named masks for the damage flag bytes, grouped by byte index.
pub mod masks {
    pub mod byte0 {
        pub const CRIT: u8 = 0x01;
        pub const UNGUARDED: u8 = 0x04;
        pub const BROKEN: u8 = 0x08;
        pub const FIRST_HIT: u8 = 0x40;
        pub const DEFAULT_ATTACK: u8 = 0x80;
    }
    pub mod byte1 {
        pub const MULTI_HIT: u8 = 0x01;
        pub const POWER_HIT: u8 = 0x02;
        pub const FAST_HIT: u8 = 0x04;
        pub const DOT: u8 = 0x08;
    }
    pub mod byte3 {
        pub const ADD_HIT: u8 = 0x08;
        pub const BLEED: u8 = 0x10;
        pub const DARK: u8 = 0x20;
        pub const FIRE: u8 = 0x40;
        pub const HOLY: u8 = 0x80;
    }
    pub mod byte4 {
        pub const ICE: u8 = 0x01;
        pub const ELECTRIC: u8 = 0x02;
        pub const POISON: u8 = 0x04;
        pub const MIND: u8 = 0x08;
    }
}

/// Per-byte union of every assigned bit. Decoding masks with these.
const DEFINED: [u8; 6] = [
    masks::byte0::CRIT
        | masks::byte0::UNGUARDED
        | masks::byte0::BROKEN
        | masks::byte0::FIRST_HIT
        | masks::byte0::DEFAULT_ATTACK,
    masks::byte1::MULTI_HIT | masks::byte1::POWER_HIT | masks::byte1::FAST_HIT | masks::byte1::DOT,
    0x00,
    masks::byte3::ADD_HIT
        | masks::byte3::BLEED
        | masks::byte3::DARK
        | masks::byte3::FIRE
        | masks::byte3::HOLY,
    masks::byte4::ICE | masks::byte4::ELECTRIC | masks::byte4::POISON | masks::byte4::MIND,
    0x00,
];

/// Immutable damage qualifier set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DamageFlags {
    bytes: [u8; 6],
}

impl DamageFlags {
    /// Decode the 6 raw wire bytes, dropping unassigned bits.
    pub fn decode(raw: [u8; 6]) -> Self {
        let mut bytes = [0u8; 6];
        for (i, b) in raw.iter().enumerate() {
            bytes[i] = b & DEFINED[i];
        }
        Self { bytes }
    }

    /// Re-encode to the 6-byte wire form (defined bits only).
    pub fn encode(&self) -> [u8; 6] {
        self.bytes
    }

    fn bit(&self, byte: usize, mask: u8) -> bool {
        self.bytes[byte] & mask != 0
    }

    pub fn crit(&self) -> bool {
        self.bit(0, masks::byte0::CRIT)
    }
    pub fn unguarded(&self) -> bool {
        self.bit(0, masks::byte0::UNGUARDED)
    }
    pub fn broken(&self) -> bool {
        self.bit(0, masks::byte0::BROKEN)
    }
    pub fn first_hit(&self) -> bool {
        self.bit(0, masks::byte0::FIRST_HIT)
    }
    pub fn default_attack(&self) -> bool {
        self.bit(0, masks::byte0::DEFAULT_ATTACK)
    }
    pub fn multi_hit(&self) -> bool {
        self.bit(1, masks::byte1::MULTI_HIT)
    }
    pub fn power_hit(&self) -> bool {
        self.bit(1, masks::byte1::POWER_HIT)
    }
    pub fn fast_hit(&self) -> bool {
        self.bit(1, masks::byte1::FAST_HIT)
    }
    pub fn dot(&self) -> bool {
        self.bit(1, masks::byte1::DOT)
    }
    pub fn add_hit(&self) -> bool {
        self.bit(3, masks::byte3::ADD_HIT)
    }
    pub fn bleed(&self) -> bool {
        self.bit(3, masks::byte3::BLEED)
    }
    pub fn dark(&self) -> bool {
        self.bit(3, masks::byte3::DARK)
    }
    pub fn fire(&self) -> bool {
        self.bit(3, masks::byte3::FIRE)
    }
    pub fn holy(&self) -> bool {
        self.bit(3, masks::byte3::HOLY)
    }
    pub fn ice(&self) -> bool {
        self.bit(4, masks::byte4::ICE)
    }
    pub fn electric(&self) -> bool {
        self.bit(4, masks::byte4::ELECTRIC)
    }
    pub fn poison(&self) -> bool {
        self.bit(4, masks::byte4::POISON)
    }
    pub fn mind(&self) -> bool {
        self.bit(4, masks::byte4::MIND)
    }

    /// Active elemental/status qualifiers in synthesized-name order.
    pub fn active_elements(&self) -> Vec<&'static str> {
        let table: [(bool, &'static str); 8] = [
            (self.ice(), "ICE"),
            (self.fire(), "FIRE"),
            (self.electric(), "ELECTRIC"),
            (self.bleed(), "BLEED"),
            (self.poison(), "POISON"),
            (self.mind(), "MIND"),
            (self.holy(), "HOLY"),
            (self.dark(), "DARK"),
        ];
        table.into_iter().filter(|(set, _)| *set).map(|(_, name)| name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_bits() {
        let flags = DamageFlags::decode([0x01 | 0x40, 0x08, 0x00, 0x10 | 0x80, 0x02, 0x00]);
        assert!(flags.crit());
        assert!(flags.first_hit());
        assert!(flags.dot());
        assert!(flags.bleed());
        assert!(flags.holy());
        assert!(flags.electric());
        assert!(!flags.unguarded());
        assert!(!flags.ice());
    }

    #[test]
    fn unassigned_bits_are_dropped() {
        // Bytes 2 and 5 carry nothing; byte 0 bits 0x02/0x10/0x20 are unassigned.
        let flags = DamageFlags::decode([0x32, 0xf0, 0xff, 0x07, 0xf0, 0xff]);
        assert_eq!(flags.encode(), [0x00; 6]);
        assert_eq!(flags, DamageFlags::default());
    }

    #[test]
    fn element_order_is_stable() {
        let flags = DamageFlags::decode([0x00, 0x00, 0x00, 0x30 | 0x40, 0x01, 0x00]);
        assert_eq!(flags.active_elements(), vec!["ICE", "FIRE", "BLEED", "DARK"]);
    }

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_encode_round_trip(raw in prop::array::uniform6(any::<u8>())) {
                // Masked bits are ignored; the defined boolean set survives.
                let flags = DamageFlags::decode(raw);
                let reencoded = DamageFlags::decode(flags.encode());
                prop_assert_eq!(flags, reencoded);
            }

            #[test]
            fn encode_never_sets_undefined_bits(raw in prop::array::uniform6(any::<u8>())) {
                let encoded = DamageFlags::decode(raw).encode();
                for (i, byte) in encoded.iter().enumerate() {
                    prop_assert_eq!(byte & !super::super::DEFINED[i], 0);
                }
            }
        }
    }
}
