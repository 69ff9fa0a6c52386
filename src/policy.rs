//! Frame admission policy.
//!
//! An optional collaborator may veto frame types before they reach the
//! decoders. The default policy is the same static known-noise set the
//! extractor already drops, so a pipeline without a custom policy decodes
//! everything the extractor lets through.

use std::collections::HashSet;

use crate::wire::{Encoding, NOISE_FRAME_TYPES};

/// Per-frame admission check, consulted before decoding.
pub trait FramePolicy: Send + 'static {
    /// Return true to drop the frame before decoding.
    fn should_exclude(&self, frame_type: i32, length: i32, encoding: Encoding) -> bool;
}

/// Static exclusion list over frame type ids.
#[derive(Debug, Clone)]
pub struct StaticPolicy {
    excluded: HashSet<i32>,
}

impl StaticPolicy {
    /// Exclude exactly the given frame types.
    pub fn new(excluded: impl IntoIterator<Item = i32>) -> Self {
        Self { excluded: excluded.into_iter().collect() }
    }

    /// Extend the default noise set with additional types.
    pub fn with_extra(extra: impl IntoIterator<Item = i32>) -> Self {
        let mut excluded: HashSet<i32> = NOISE_FRAME_TYPES.iter().copied().collect();
        excluded.extend(extra);
        Self { excluded }
    }
}

impl Default for StaticPolicy {
    fn default() -> Self {
        Self { excluded: NOISE_FRAME_TYPES.iter().copied().collect() }
    }
}

impl FramePolicy for StaticPolicy {
    fn should_exclude(&self, frame_type: i32, _length: i32, _encoding: Encoding) -> bool {
        self.excluded.contains(&frame_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::extract::noise;

    #[test]
    fn default_policy_mirrors_the_noise_set() {
        let policy = StaticPolicy::default();
        assert!(policy.should_exclude(noise::HEARTBEAT, 10, Encoding::Raw));
        assert!(!policy.should_exclude(20_064, 10, Encoding::Raw));
    }

    #[test]
    fn extra_exclusions_stack_on_the_noise_set() {
        let policy = StaticPolicy::with_extra([20_114]);
        assert!(policy.should_exclude(noise::MOVEMENT_TICK, 10, Encoding::Raw));
        assert!(policy.should_exclude(20_114, 10, Encoding::Raw));
        assert!(!policy.should_exclude(20_064, 10, Encoding::Raw));
    }

    #[test]
    fn explicit_list_replaces_the_default() {
        let policy = StaticPolicy::new([1, 2, 3]);
        assert!(policy.should_exclude(2, 10, Encoding::Brotli));
        assert!(!policy.should_exclude(noise::HEARTBEAT, 10, Encoding::Raw));
    }
}
