use std::fmt::Debug;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use super::{
    cell::CellState,
    effect::EffectState,
    objective::{Geometry, ObjectiveType},
    Timestamp, GLOBAL_COOLDOWN_MS,
};

/// Flat grid of cells plus a board wide cooldown gate.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    pub cells: Vec<CellState>,
    pub global_cooldown_end: Timestamp,
}

impl Debug for BoardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // print the board as a grid
        let side = Geometry::for_len(self.cells.len()).map_or(self.cells.len().max(1), |g| g.side);
        for row in self.cells.chunks(side) {
            for cell in row {
                match cell.value {
                    0 => write!(f, ".")?,
                    v => write!(f, "{v}")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl BoardState {
    /// Build a board from base puzzle digits.
    pub fn from_values(values: &[u8]) -> Self {
        Self {
            cells: values.iter().copied().map(CellState::from_given).collect(),
            global_cooldown_end: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CellState> {
        self.cells.get(index)
    }

    /// Would writing `value` at `index` be accepted at `now`.
    pub fn validate(&self, index: usize, value: u8, now: Option<Timestamp>) -> bool {
        let Some(cell) = self.cells.get(index) else {
            return false;
        };
        if let Some(now) = now {
            if now < self.global_cooldown_end {
                return false;
            }
        }
        cell.validate(value, now)
    }

    /// Unconditional write, refreshing both cooldowns when a time is given.
    pub fn update(
        &mut self,
        index: usize,
        value: u8,
        now: Option<Timestamp>,
    ) -> anyhow::Result<()> {
        let len = self.cells.len();
        let Some(cell) = self.cells.get_mut(index) else {
            bail!("cell index {index} out of range for board of {len}");
        };
        cell.update(value, now);
        if let Some(now) = now {
            self.global_cooldown_end = now + GLOBAL_COOLDOWN_MS;
        }
        Ok(())
    }

    /// Validate then write. Returns whether the write happened.
    pub fn set(&mut self, index: usize, value: u8, now: Option<Timestamp>) -> bool {
        self.validate(index, value, now) && self.update(index, value, now).is_ok()
    }

    /// Attach an effect to one cell. Errors on an index outside the board.
    pub fn add_effect(&mut self, index: usize, effect: EffectState) -> anyhow::Result<()> {
        let len = self.cells.len();
        let Some(cell) = self.cells.get_mut(index) else {
            bail!("cell index {index} out of range for board of {len}");
        };
        cell.add_effect(effect);
        Ok(())
    }

    pub fn prune_effects(&mut self, now: Timestamp) -> usize {
        self.cells
            .iter_mut()
            .map(|cell| cell.prune_effects(now))
            .sum()
    }

    /// Percentage of non-fixed cells that are correct, rounded.
    pub fn progress(&self, solution: &[u8], now: Option<Timestamp>) -> u8 {
        let mut total = 0u32;
        let mut correct = 0u32;
        for (cell, &answer) in self.cells.iter().zip(solution) {
            if cell.fixed {
                continue;
            }
            total += 1;
            if cell.progress(answer, now) {
                correct += 1;
            }
        }
        if total == 0 {
            return 100;
        }
        (correct as f64 / total as f64 * 100.0).round() as u8
    }

    pub fn compute_hash(&self) -> u64 {
        board_hash(
            self.global_cooldown_end,
            self.cells.iter().map(CellState::compute_hash),
        )
    }
}

/// Board checksum from the global cooldown and each cell's hash in order.
/// Shared with the client prediction board so both sides agree.
pub(crate) fn board_hash(
    global_cooldown_end: Timestamp,
    cell_hashes: impl Iterator<Item = u64>,
) -> u64 {
    let seed = (global_cooldown_end as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    cell_hashes.fold(seed, |hash, cell| hash.wrapping_mul(31).wrapping_add(cell))
}

/// Server bookkeeping for one cell that never leaves the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellCredit {
    /// Cell already paid out power-up progress. Never revoked.
    pub progress_set: bool,
    /// One-shot bonus waiting on this cell.
    pub golden: bool,
}

/// Server side wrapper: writes are validated and committed in one step.
#[derive(Debug, Clone)]
pub struct AuthoritativeBoard {
    board: BoardState,
    credits: Vec<CellCredit>,
    geometry: Geometry,
}

impl AuthoritativeBoard {
    pub fn new(values: &[u8]) -> anyhow::Result<Self> {
        let Some(geometry) = Geometry::for_len(values.len()) else {
            bail!("board of {} cells is not a square grid", values.len());
        };
        let board = BoardState::from_values(values);
        Ok(Self {
            credits: vec![CellCredit::default(); board.len()],
            board,
            geometry,
        })
    }

    pub fn state(&self) -> &BoardState {
        &self.board
    }

    /// Validate and commit in one step, so a rejected write leaves no trace.
    pub fn try_set(&mut self, index: usize, value: u8, now: Timestamp) -> bool {
        self.board.set(index, value, Some(now))
    }

    /// Flip the progress credit on. Returns true only the first time.
    pub fn claim_credit(&mut self, index: usize) -> bool {
        match self.credits.get_mut(index) {
            Some(credit) if !credit.progress_set => {
                credit.progress_set = true;
                true
            }
            _ => false,
        }
    }

    /// Consume the golden flag if it is set.
    pub fn take_golden(&mut self, index: usize) -> bool {
        self.credits
            .get_mut(index)
            .is_some_and(|credit| std::mem::take(&mut credit.golden))
    }

    /// Flag a cell so its next correct write earns the golden bonus.
    pub fn mark_golden(&mut self, index: usize) -> bool {
        let Some(cell) = self.board.get(index) else {
            return false;
        };
        if cell.fixed {
            return false;
        }
        self.credits[index].golden = true;
        true
    }

    pub fn add_effect(&mut self, index: usize, effect: EffectState) -> anyhow::Result<()> {
        self.board.add_effect(index, effect)
    }

    pub fn prune_effects(&mut self, now: Timestamp) -> usize {
        self.board.prune_effects(now)
    }

    /// Every cell of the objective around `index` is a given or credited.
    pub fn is_objective_solved(&self, objective: ObjectiveType, index: usize) -> bool {
        if index >= self.board.len() {
            return false;
        }
        self.geometry
            .cells(objective, index)
            .into_iter()
            .all(|i| self.board.cells[i].fixed || self.credits[i].progress_set)
    }
}
