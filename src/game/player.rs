use serde::{Deserialize, Serialize};

use super::{board::AuthoritativeBoard, PlayerId, Puzzle, Timestamp, PUP_SLOT_COUNT};

/// Identity of one scheduled threat countdown, unique within a match.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeoutToken(pub u64);

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PupType {
    /// Sustained threat: using it opens a window that ends either when the
    /// countdown fires or when the victim solves the matching objective.
    Theme,
    /// Resolves as soon as it is used.
    Instant,
}

/// Deferred consequence of a used power-up.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingEffect {
    pub target_id: PlayerId,
    pub timeout_token: Option<TimeoutToken>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PowerUp {
    pub pup_id: u64,
    pub pup_type: PupType,
    pub level: u8,
    /// End of the cooldown / deferred resolution window.
    pub last_cooldown_end: Timestamp,
    pub pending_effect: Option<PendingEffect>,
}

/// What clients learn about a freshly drawn power-up.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PupDescriptor {
    pub slot_index: usize,
    pub pup_id: u64,
    pub pup_type: PupType,
    pub level: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PupSlot {
    pub slot_index: usize,
    /// Reserved for a draw in flight.
    pub locked: bool,
    pub pup: Option<PowerUp>,
}

impl PupSlot {
    fn empty(slot_index: usize) -> Self {
        Self {
            slot_index,
            ..Default::default()
        }
    }

    pub fn is_free(&self) -> bool {
        !self.locked && self.pup.is_none()
    }

    pub fn holds(&self, pup_id: u64) -> bool {
        self.pup.as_ref().is_some_and(|pup| pup.pup_id == pup_id)
    }
}

/// One player's instance of the match puzzle.
#[derive(Debug, Clone)]
pub struct PlayerGameState {
    pub player_id: PlayerId,
    pub board: AuthoritativeBoard,
    solution: Vec<u8>,
    pub pup_progress: u8,
    pub powerups: [PupSlot; PUP_SLOT_COUNT],
}

impl PlayerGameState {
    pub fn new(player_id: PlayerId, puzzle: &Puzzle) -> anyhow::Result<Self> {
        Ok(Self {
            player_id,
            board: AuthoritativeBoard::new(&puzzle.cells)?,
            solution: puzzle.solution.clone(),
            pup_progress: 0,
            powerups: std::array::from_fn(PupSlot::empty),
        })
    }

    pub fn solution(&self) -> &[u8] {
        &self.solution
    }

    pub fn board_progress(&self, now: Timestamp) -> u8 {
        self.board.state().progress(&self.solution, Some(now))
    }

    pub fn slot_by_pup_id(&self, pup_id: u64) -> Option<&PupSlot> {
        self.powerups.iter().find(|slot| slot.holds(pup_id))
    }

    pub fn slot_by_pup_id_mut(&mut self, pup_id: u64) -> Option<&mut PupSlot> {
        self.powerups.iter_mut().find(|slot| slot.holds(pup_id))
    }
}
