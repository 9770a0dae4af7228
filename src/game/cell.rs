use serde::{Deserialize, Serialize};

use super::{effect::EffectState, Timestamp, CELL_COOLDOWN_MS};

/// Highest digit a cell may hold. `0` means empty.
pub const MAX_CELL_VALUE: u8 = 9;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn mix(hash: u64, input: u64) -> u64 {
    (hash ^ input).wrapping_mul(FNV_PRIME)
}

/// One puzzle cell. The validation rules here are shared by the server
/// board and the client prediction layer.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CellState {
    pub value: u8,
    pub fixed: bool,
    pub cooldown_end: Timestamp,
    pub effects: Vec<EffectState>,
}

impl CellState {
    pub fn new(value: u8, fixed: bool) -> Self {
        Self {
            value,
            fixed,
            cooldown_end: 0,
            effects: Vec::new(),
        }
    }

    /// Cell built from a base puzzle digit, non-zero digits are givens.
    pub fn from_given(value: u8) -> Self {
        Self::new(value, value != 0)
    }

    /// Whether `value` may be written at `now`. Without a time only the
    /// range and fixed checks apply, plus permanent effects.
    pub fn validate(&self, value: u8, now: Option<Timestamp>) -> bool {
        if value > MAX_CELL_VALUE || self.fixed {
            return false;
        }
        match now {
            Some(now) => now >= self.cooldown_end && !self.blocks_set(now),
            None => !self
                .effects
                .iter()
                .any(|effect| effect.expires_at.is_none() && effect.blocks_set(0)),
        }
    }

    fn blocks_set(&self, now: Timestamp) -> bool {
        self.effects.iter().any(|effect| effect.blocks_set(now))
    }

    /// Unconditional write. Callers validate first.
    pub fn update(&mut self, value: u8, now: Option<Timestamp>) {
        self.value = value;
        if let Some(now) = now {
            self.cooldown_end = now + CELL_COOLDOWN_MS;
        }
    }

    /// Whether this cell counts as correctly solved at `now`.
    pub fn progress(&self, solution_value: u8, now: Option<Timestamp>) -> bool {
        if self.fixed || self.value != solution_value {
            return false;
        }
        let now = now.unwrap_or(Timestamp::MAX);
        !self.effects.iter().any(|effect| effect.blocks_progress(now))
    }

    pub fn add_effect(&mut self, effect: EffectState) {
        self.effects.push(effect);
    }

    /// Drop effects that can no longer block anything.
    pub fn prune_effects(&mut self, now: Timestamp) -> usize {
        let before = self.effects.len();
        self.effects.retain(|effect| !effect.is_expired(now));
        before - self.effects.len()
    }

    /// Sync checksum over every field, used to spot client/server divergence.
    pub fn compute_hash(&self) -> u64 {
        let mut hash = mix(FNV_OFFSET, self.value as u64);
        hash = mix(hash, self.fixed as u64);
        hash = mix(hash, self.cooldown_end as u64);
        for effect in &self.effects {
            hash = mix(hash, effect.kind.hash_tag());
            hash = mix(hash, effect.started_at as u64);
            hash = mix(hash, effect.expires_at.map_or(u64::MAX, |end| end as u64));
        }
        hash
    }
}
