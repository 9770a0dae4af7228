use serde::{Deserialize, Serialize};

pub mod board;
pub mod cell;
pub mod effect;
pub mod objective;
pub mod player;

/// Milliseconds on the server clock (or a client's estimate of it).
pub type Timestamp = i64;

/// Player index within one match.
pub type PlayerId = u32;

/// Minimum delay between two writes to the same cell.
pub const CELL_COOLDOWN_MS: Timestamp = 10_000;
/// Minimum delay between two writes anywhere on one board.
pub const GLOBAL_COOLDOWN_MS: Timestamp = 5_000;
/// Number of power-up slots every player owns.
pub const PUP_SLOT_COUNT: usize = 3;
/// Power-up progress is a percentage.
pub const MAX_PUP_PROGRESS: u8 = 100;

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum MatchStatus {
    /// Lobby waiting for enough players to start.
    #[default]
    Preinit,
    /// Boards are live and accept mutations.
    Ongoing,
    /// Terminal, nothing changes any more.
    Ended,
}

/// Why a match ended.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GameOverReason {
    Forfeit,
    Score,
}

/// Match level counters shared by the controllers.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    pub status: MatchStatus,
    pub phase: u32,
    /// Last allocated power-up id, ids are never reused within a match.
    pub current_pup_id: u64,
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }
    /// Allocate the next power-up id.
    pub fn next_pup_id(&mut self) -> u64 {
        self.current_pup_id += 1;
        self.current_pup_id
    }
}

/// The shared base puzzle every player races on.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    /// Starting values, `0` marks an empty cell. Non-zero cells are fixed.
    pub cells: Vec<u8>,
    pub solution: Vec<u8>,
}

impl Puzzle {
    /// Check the grid shape and digit ranges before anyone plays on it.
    pub fn new(cells: Vec<u8>, solution: Vec<u8>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            cells.len() == solution.len(),
            "puzzle has {} cells but solution has {}",
            cells.len(),
            solution.len()
        );
        anyhow::ensure!(
            objective::Geometry::for_len(cells.len()).is_some(),
            "puzzle of {} cells is not a square grid of square boxes",
            cells.len()
        );
        if let Some(index) = cells.iter().position(|&v| v > cell::MAX_CELL_VALUE) {
            anyhow::bail!("cell {index} holds {}, above {}", cells[index], cell::MAX_CELL_VALUE);
        }
        if let Some(index) = solution
            .iter()
            .position(|v| !(1..=cell::MAX_CELL_VALUE).contains(v))
        {
            anyhow::bail!("solution digit {} at {index} is out of range", solution[index]);
        }
        Ok(Self { cells, solution })
    }
}
