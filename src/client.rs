//! Client side prediction. A player's own board is mirrored locally so the
//! UI can show a write before the server has answered. Speculative state
//! lives in a [`PendingOverlay`] and is either committed by a confirmation
//! or thrown away by a rejection. Nothing here talks to the server.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::game::{
    board::board_hash,
    cell::{CellState, MAX_CELL_VALUE},
    effect::EffectState,
    Timestamp, CELL_COOLDOWN_MS, GLOBAL_COOLDOWN_MS,
};

/// Speculative fields layered over a confirmed cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOverlay {
    pub value: Option<u8>,
    pub cooldown_end: Option<Timestamp>,
    pub effects: Option<Vec<EffectState>>,
}

impl PendingOverlay {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.cooldown_end.is_none() && self.effects.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedCell {
    cell: CellState,
    pending: PendingOverlay,
    notes: BTreeSet<u8>,
}

impl PredictedCell {
    pub fn new(cell: CellState) -> Self {
        Self {
            cell,
            ..Default::default()
        }
    }

    pub fn from_given(value: u8) -> Self {
        Self::new(CellState::from_given(value))
    }

    /// Last state the server confirmed.
    pub fn confirmed(&self) -> &CellState {
        &self.cell
    }

    pub fn pending(&self) -> &PendingOverlay {
        &self.pending
    }

    /// Shared cell rules plus the pending overlay. Writing the value that is
    /// already shown or already confirmed is refused.
    pub fn validate(&self, value: u8, now: Option<Timestamp>) -> bool {
        if !self.cell.validate(value, now) {
            return false;
        }
        if self.pending.value == Some(value) || self.cell.value == value {
            return false;
        }
        let Some(now) = now else {
            return true;
        };
        if self.pending.cooldown_end.is_some_and(|end| now < end) {
            return false;
        }
        !self
            .pending
            .effects
            .iter()
            .flatten()
            .any(|effect| effect.blocks_set(now))
    }

    /// Show `value` right away while the server decides.
    pub fn set_pending(&mut self, value: u8, now: Option<Timestamp>) -> bool {
        if !self.validate(value, now) {
            return false;
        }
        self.pending.value = Some(value);
        if let Some(now) = now {
            self.pending.cooldown_end = Some(now + CELL_COOLDOWN_MS);
        }
        true
    }

    /// The server accepted a write. Pending state is dropped before
    /// validating, so confirming the pending value itself succeeds.
    pub fn confirm_set(&mut self, value: u8, now: Option<Timestamp>) -> bool {
        self.reject_pending();
        if !self.validate(value, now) {
            return false;
        }
        self.cell.update(value, now);
        true
    }

    pub fn reject_pending(&mut self) {
        self.pending = PendingOverlay::default();
    }

    /// Predict an effect before the server reports it.
    pub fn add_pending_effect(&mut self, effect: EffectState) {
        self.pending.effects.get_or_insert_with(Vec::new).push(effect);
    }

    /// The server applied an effect to this cell.
    pub fn confirm_effect(&mut self, effect: EffectState) {
        if let Some(pending) = self.pending.effects.as_mut() {
            pending.retain(|predicted| predicted != &effect);
            if pending.is_empty() {
                self.pending.effects = None;
            }
        }
        self.cell.add_effect(effect);
    }

    pub fn display_value(&self) -> u8 {
        self.pending.value.unwrap_or(self.cell.value)
    }

    /// Flip a pencil mark. Returns whether `digit` is noted afterwards.
    pub fn toggle_note(&mut self, digit: u8) -> bool {
        if !(1..=MAX_CELL_VALUE).contains(&digit) || self.cell.fixed {
            return false;
        }
        if self.notes.remove(&digit) {
            false
        } else {
            self.notes.insert(digit)
        }
    }

    pub fn notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.notes.iter().copied()
    }

    /// Returns whether there was anything to clear.
    pub fn wipe_notes(&mut self) -> bool {
        let had_notes = !self.notes.is_empty();
        self.notes.clear();
        had_notes
    }
}

/// Local mirror of the player's own board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedBoard {
    cells: Vec<PredictedCell>,
    global_cooldown_end: Timestamp,
    pending_global_cooldown_end: Option<Timestamp>,
}

impl PredictedBoard {
    /// Mirror of a freshly initialized board.
    pub fn from_values(values: &[u8]) -> Self {
        Self {
            cells: values.iter().copied().map(PredictedCell::from_given).collect(),
            ..Default::default()
        }
    }

    pub fn cell(&self, index: usize) -> Option<&PredictedCell> {
        self.cells.get(index)
    }

    /// The server put `effect` on cell `index`.
    pub fn confirm_effect(&mut self, index: usize, effect: EffectState) -> bool {
        let Some(cell) = self.cells.get_mut(index) else {
            return false;
        };
        cell.confirm_effect(effect);
        true
    }

    fn global_gate_open(&self, now: Option<Timestamp>) -> bool {
        let Some(now) = now else {
            return true;
        };
        let end = self
            .pending_global_cooldown_end
            .map_or(self.global_cooldown_end, |pending| pending.max(self.global_cooldown_end));
        now >= end
    }

    /// Predict a write locally, ahead of the server's answer.
    pub fn set_pending(&mut self, index: usize, value: u8, now: Option<Timestamp>) -> bool {
        if !self.global_gate_open(now) {
            return false;
        }
        let Some(cell) = self.cells.get_mut(index) else {
            return false;
        };
        if !cell.set_pending(value, now) {
            return false;
        }
        if let Some(now) = now {
            self.pending_global_cooldown_end = Some(now + GLOBAL_COOLDOWN_MS);
        }
        true
    }

    /// Commit a write the server accepted at `server_time`. Effects that
    /// expired by then are dropped, as the server drops them.
    pub fn confirm_set(
        &mut self,
        index: usize,
        value: u8,
        server_time: Option<Timestamp>,
    ) -> bool {
        self.pending_global_cooldown_end = None;
        let Some(cell) = self.cells.get_mut(index) else {
            return false;
        };
        if !cell.confirm_set(value, server_time) {
            return false;
        }
        if let Some(server_time) = server_time {
            self.global_cooldown_end = server_time + GLOBAL_COOLDOWN_MS;
            for cell in &mut self.cells {
                cell.cell.prune_effects(server_time);
            }
        }
        true
    }

    pub fn reject_pending(&mut self, index: usize) {
        self.pending_global_cooldown_end = None;
        if let Some(cell) = self.cells.get_mut(index) {
            cell.reject_pending();
        }
    }

    pub fn display_values(&self) -> Vec<u8> {
        self.cells.iter().map(PredictedCell::display_value).collect()
    }

    /// Checksum of the confirmed state. Matches the server board hash when
    /// both saw the same writes.
    pub fn compute_hash(&self) -> u64 {
        board_hash(
            self.global_cooldown_end,
            self.cells.iter().map(|cell| cell.confirmed().compute_hash()),
        )
    }
}
