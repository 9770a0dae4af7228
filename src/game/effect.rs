use serde::{Deserialize, Serialize};

use super::Timestamp;

/// What a timed modifier on a cell does.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EffectKind {
    /// Cell cannot be written.
    Lock,
    /// Cell can be written but does not count towards progress.
    Fog,
    /// Both.
    Freeze,
}

/// Capability pair of an effect kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_block_set: bool,
    pub can_block_progress: bool,
}

impl EffectKind {
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Lock => Capabilities {
                can_block_set: true,
                can_block_progress: false,
            },
            Self::Fog => Capabilities {
                can_block_set: false,
                can_block_progress: true,
            },
            Self::Freeze => Capabilities {
                can_block_set: true,
                can_block_progress: true,
            },
        }
    }

    pub(crate) const fn hash_tag(self) -> u64 {
        match self {
            Self::Lock => 1,
            Self::Fog => 2,
            Self::Freeze => 3,
        }
    }
}

/// A timed modifier attached to a cell. Without `expires_at` it is permanent.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EffectState {
    pub kind: EffectKind,
    pub started_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl EffectState {
    pub fn new(kind: EffectKind, started_at: Timestamp, expires_at: Option<Timestamp>) -> Self {
        Self {
            kind,
            started_at,
            expires_at,
        }
    }

    /// Effect lasting `duration` ms from `started_at`.
    pub fn timed(kind: EffectKind, started_at: Timestamp, duration: Timestamp) -> Self {
        Self::new(kind, started_at, Some(started_at + duration))
    }

    fn before_expiry(&self, now: Timestamp) -> bool {
        self.expires_at.map_or(true, |end| now < end)
    }

    pub fn blocks_set(&self, now: Timestamp) -> bool {
        self.kind.capabilities().can_block_set && self.before_expiry(now)
    }

    pub fn blocks_progress(&self, now: Timestamp) -> bool {
        self.kind.capabilities().can_block_progress
            && now >= self.started_at
            && self.before_expiry(now)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        !self.before_expiry(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_blocks_set_until_expiry() {
        let effect = EffectState::timed(EffectKind::Lock, 1_000, 2_000);
        assert!(effect.blocks_set(1_000));
        assert!(effect.blocks_set(2_999));
        assert!(!effect.blocks_set(3_000));
        assert!(!effect.blocks_progress(1_500));
    }

    #[test]
    fn fog_blocks_progress_only_inside_window() {
        let effect = EffectState::timed(EffectKind::Fog, 1_000, 2_000);
        assert!(!effect.blocks_progress(999));
        assert!(effect.blocks_progress(1_000));
        assert!(!effect.blocks_progress(3_000));
        assert!(!effect.blocks_set(1_500));
    }

    #[test]
    fn permanent_freeze_never_expires() {
        let effect = EffectState::new(EffectKind::Freeze, 0, None);
        assert!(effect.blocks_set(i64::MAX));
        assert!(effect.blocks_progress(i64::MAX));
        assert!(!effect.is_expired(i64::MAX));
    }
}
