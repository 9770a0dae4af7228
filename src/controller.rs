use std::collections::{BTreeMap, BTreeSet};

use rand::{rngs::StdRng, seq::SliceRandom as _, SeedableRng as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::GameConfig,
    game::{
        effect::EffectState,
        objective::ObjectiveType,
        player::{PendingEffect, PlayerGameState, PowerUp, PupDescriptor, PupSlot, PupType},
        MatchState, MatchStatus, PlayerId, Puzzle, Timestamp, MAX_PUP_PROGRESS, PUP_SLOT_COUNT,
    },
    timing::{Action, TimeCoordinator},
};

/// A player's request to write a digit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetCellRequest {
    pub client_time: Timestamp,
    pub cell_index: usize,
    pub value: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub player_id: PlayerId,
    pub progress: u8,
}

/// Things the lifecycle layer reacts to after a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Percentage of the board solved.
    BoardProgress(ProgressEntry),
    /// Power-up progress changed.
    PupProgress(ProgressEntry),
    /// A correct value landed in a cell.
    CellSolved {
        player_id: PlayerId,
        cell_index: usize,
        server_time: Timestamp,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetCellOutcome {
    pub result: bool,
    pub server_time: Option<Timestamp>,
    pub events: Vec<GameEvent>,
}

impl SetCellOutcome {
    fn rejected() -> Self {
        Self::default()
    }
}

/// Owns every player's board and power-ups for one match.
pub struct GameStateController {
    puzzle: Puzzle,
    config: GameConfig,
    time: Box<dyn TimeCoordinator>,
    rng: StdRng,
    match_state: MatchState,
    roster: BTreeSet<PlayerId>,
    players: BTreeMap<PlayerId, PlayerGameState>,
}

impl GameStateController {
    pub fn new(puzzle: Puzzle, config: GameConfig, time: Box<dyn TimeCoordinator>) -> Self {
        Self {
            puzzle,
            config,
            time,
            rng: StdRng::from_entropy(),
            match_state: MatchState::new(),
            roster: BTreeSet::new(),
            players: BTreeMap::new(),
        }
    }

    /// Deterministic slot picks, for replays and tests.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn puzzle(&self) -> &Puzzle {
        &self.puzzle
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn match_state(&self) -> &MatchState {
        &self.match_state
    }

    pub fn status(&self) -> MatchStatus {
        self.match_state.status
    }

    pub fn set_status(&mut self, status: MatchStatus) {
        self.match_state.status = status;
    }

    pub fn phase(&self) -> u32 {
        self.match_state.phase
    }

    /// Move to the next phase, returning it.
    pub fn advance_phase(&mut self) -> u32 {
        self.match_state.phase += 1;
        self.match_state.phase
    }

    pub fn time_mut(&mut self) -> &mut dyn TimeCoordinator {
        self.time.as_mut()
    }

    /// Registered players, in id order.
    pub fn roster(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.roster.iter().copied()
    }

    /// Initialized player states, in id order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerGameState> {
        self.players.values()
    }

    pub fn player_state(&self, player_id: PlayerId) -> Option<&PlayerGameState> {
        self.players.get(&player_id)
    }

    /// Register a player. Only allowed before the match starts.
    pub fn add_player(&mut self, player_id: PlayerId) -> bool {
        if self.match_state.status != MatchStatus::Preinit {
            return false;
        }
        self.roster.insert(player_id)
    }

    /// Drop a player before the match starts.
    pub fn remove_player(&mut self, player_id: PlayerId) -> bool {
        if self.match_state.status != MatchStatus::Preinit {
            return false;
        }
        self.players.remove(&player_id);
        self.roster.remove(&player_id)
    }

    /// Fresh board, solution and power-up slots for every registered player.
    /// Returns the base puzzle values to broadcast.
    pub fn init_game_states(&mut self) -> anyhow::Result<Vec<u8>> {
        for &player_id in &self.roster {
            let state = PlayerGameState::new(player_id, &self.puzzle)?;
            self.players.insert(player_id, state);
        }
        info!("initialized {} player boards", self.players.len());
        Ok(self.puzzle.cells.clone())
    }

    /// Validate and commit one write, returning what changed because of it.
    pub fn set_cell_value(
        &mut self,
        player_id: PlayerId,
        request: SetCellRequest,
    ) -> SetCellOutcome {
        if self.match_state.status != MatchStatus::Ongoing {
            return SetCellOutcome::rejected();
        }
        let Some(player) = self.players.get_mut(&player_id) else {
            debug!(player_id, "set cell from unknown player");
            return SetCellOutcome::rejected();
        };
        let server_time = self.time.assess_timing(player_id, request.client_time);
        if server_time < 0 {
            return SetCellOutcome::rejected();
        }
        let SetCellRequest {
            cell_index, value, ..
        } = request;
        if !player.board.try_set(cell_index, value, server_time) {
            debug!(player_id, cell_index, value, "board rejected write");
            return SetCellOutcome::rejected();
        }
        // clients drop expired effects on the same confirmed writes
        let pruned = player.board.prune_effects(server_time);
        if pruned > 0 {
            debug!(player_id, pruned, "expired effects dropped");
        }
        self.time.update_last_action_time(
            player_id,
            Action::SetCell,
            request.client_time,
            Some(server_time),
        );

        let mut events = vec![GameEvent::BoardProgress(ProgressEntry {
            player_id,
            progress: player.board_progress(server_time),
        })];

        if player.solution().get(cell_index) == Some(&value) {
            let phase = self.match_state.phase;
            let before = player.pup_progress;
            let mut gain = 0u16;
            if player.board.claim_credit(cell_index) {
                gain += self.config.progress_gain(phase) as u16;
            }
            if player.board.take_golden(cell_index) {
                gain += self.config.golden_gain(phase) as u16;
            }
            player.pup_progress = (before as u16 + gain).min(MAX_PUP_PROGRESS as u16) as u8;
            if player.pup_progress != before {
                events.push(GameEvent::PupProgress(ProgressEntry {
                    player_id,
                    progress: player.pup_progress,
                }));
            }
            events.push(GameEvent::CellSolved {
                player_id,
                cell_index,
                server_time,
            });
        }

        SetCellOutcome {
            result: true,
            server_time: Some(server_time),
            events,
        }
    }

    /// Solution digit at `cell_index` for this player's board.
    pub fn get_solution(&self, player_id: PlayerId, cell_index: usize) -> Option<u8> {
        self.players
            .get(&player_id)?
            .solution()
            .get(cell_index)
            .copied()
    }

    /// Sync checksum across all boards. Not a cryptographic hash.
    pub fn compute_hash(&self) -> u64 {
        self.players.values().fold(0u64, |sum, player| {
            let weight = player.player_id as u64 + 1;
            sum.wrapping_add(weight.wrapping_mul(player.board.state().compute_hash()))
        })
    }

    pub fn is_objective_solved_for_cell(
        &self,
        player_id: PlayerId,
        objective: ObjectiveType,
        cell_index: usize,
    ) -> bool {
        self.players
            .get(&player_id)
            .is_some_and(|player| player.board.is_objective_solved(objective, cell_index))
    }

    /// Flag a cell as golden for one player.
    pub fn mark_golden(&mut self, player_id: PlayerId, cell_index: usize) -> bool {
        self.players
            .get_mut(&player_id)
            .is_some_and(|player| player.board.mark_golden(cell_index))
    }

    /// Put an effect on one cell of a player's board.
    pub fn apply_cell_effect(
        &mut self,
        player_id: PlayerId,
        cell_index: usize,
        effect: EffectState,
    ) -> bool {
        self.players
            .get_mut(&player_id)
            .is_some_and(|player| player.board.add_effect(cell_index, effect).is_ok())
    }

    /// Spend full power-up progress on a random free slot. The slot stays
    /// locked until [`Self::draw_random_pup`] fills it.
    pub fn reserve_pup_draw(&mut self, player_id: PlayerId) -> Option<usize> {
        let player = self.players.get_mut(&player_id)?;
        if player.pup_progress < MAX_PUP_PROGRESS {
            return None;
        }
        let free: Vec<usize> = player
            .powerups
            .iter()
            .filter(|slot| slot.is_free())
            .map(|slot| slot.slot_index)
            .collect();
        let &slot_index = free.choose(&mut self.rng)?;
        player.powerups[slot_index].locked = true;
        player.pup_progress = 0;
        debug!(player_id, slot_index, "reserved power-up slot");
        Some(slot_index)
    }

    /// Fill a slot locked by [`Self::reserve_pup_draw`] with a new power-up.
    pub fn draw_random_pup(
        &mut self,
        player_id: PlayerId,
        slot_index: usize,
        pup_type: PupType,
    ) -> Option<PupDescriptor> {
        let level = u8::try_from(self.match_state.phase + 1).unwrap_or(u8::MAX);
        let player = self.players.get_mut(&player_id)?;
        let slot = player.powerups.get_mut(slot_index)?;
        if !slot.locked || slot.pup.is_some() {
            return None;
        }
        let pup_id = self.match_state.next_pup_id();
        slot.pup = Some(PowerUp {
            pup_id,
            pup_type,
            level,
            last_cooldown_end: 0,
            pending_effect: None,
        });
        slot.locked = false;
        Some(PupDescriptor {
            slot_index,
            pup_id,
            pup_type,
            level,
        })
    }

    /// Use a power-up. Theme power-ups stay in their slot behind a resolution
    /// window, instant ones are gone immediately. A power-up whose threat is
    /// still unresolved cannot be used again.
    pub fn consume_pup(
        &mut self,
        action: Action,
        player_id: PlayerId,
        pup_id: u64,
        client_time: Timestamp,
    ) -> Option<Timestamp> {
        let server_time = self.time.assess_timing(player_id, client_time);
        if server_time < 0 || self.match_state.status != MatchStatus::Ongoing {
            return None;
        }
        let challenge = self.config.challenge_duration(self.match_state.phase);
        let slot = self.players.get_mut(&player_id)?.slot_by_pup_id_mut(pup_id)?;
        if slot.locked {
            return None;
        }
        let pup = slot.pup.as_mut()?;
        if server_time < pup.last_cooldown_end || pup.pending_effect.is_some() {
            return None;
        }
        let server_time = self
            .time
            .update_last_action_time(player_id, action, client_time, Some(server_time));
        let pup_type = pup.pup_type;
        match pup_type {
            PupType::Theme => pup.last_cooldown_end = server_time + challenge,
            PupType::Instant => slot.pup = None,
        }
        Some(server_time)
    }

    /// Record or clear the unresolved threat of a power-up.
    pub fn set_pup_pending_effect(
        &mut self,
        player_id: PlayerId,
        pup_id: u64,
        effect: Option<PendingEffect>,
    ) -> bool {
        let Some(pup) = self
            .players
            .get_mut(&player_id)
            .and_then(|player| player.slot_by_pup_id_mut(pup_id))
            .and_then(|slot| slot.pup.as_mut())
        else {
            return false;
        };
        pup.pending_effect = effect;
        true
    }

    /// Take a power-up out of its slot.
    pub fn remove_pup(&mut self, player_id: PlayerId, pup_id: u64) -> bool {
        self.players
            .get_mut(&player_id)
            .and_then(|player| player.slot_by_pup_id_mut(pup_id))
            .map(|slot| slot.pup = None)
            .is_some()
    }

    pub fn find_pup_slot_by_pup_id(&self, player_id: PlayerId, pup_id: u64) -> Option<&PupSlot> {
        self.players.get(&player_id)?.slot_by_pup_id(pup_id)
    }

    pub fn get_player_powerups(&self, player_id: PlayerId) -> Option<&[PupSlot; PUP_SLOT_COUNT]> {
        self.players.get(&player_id).map(|player| &player.powerups)
    }
}
