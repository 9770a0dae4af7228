use std::collections::HashMap;

use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, info, warn};

use crate::{
    controller::{GameEvent, GameStateController, ProgressEntry},
    game::{
        objective::ObjectiveType,
        player::{PendingEffect, TimeoutToken},
        GameOverReason, MatchStatus, PlayerId, Timestamp,
    },
    room::{RatingService, Room, ServerEvent},
};

/// Match state machine: `Preinit -> Ongoing -> Ended`.
///
/// Owns the [`GameStateController`] and decides the match level
/// consequences of what happens on the boards. Timer tasks are owned here
/// too so that ending the match drops (and aborts) all of them.
pub struct LifecycleController<R: Room, E: RatingService> {
    game: GameStateController,
    room: R,
    ratings: E,
    start_timer: Option<AbortOnDropHandle<()>>,
    threat_timers: HashMap<TimeoutToken, AbortOnDropHandle<()>>,
    last_token: u64,
}

impl<R: Room, E: RatingService> LifecycleController<R, E> {
    pub fn new(game: GameStateController, room: R, ratings: E) -> Self {
        Self {
            game,
            room,
            ratings,
            start_timer: None,
            threat_timers: HashMap::new(),
            last_token: 0,
        }
    }

    pub fn game(&self) -> &GameStateController {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameStateController {
        &mut self.game
    }

    pub fn room(&self) -> &R {
        &self.room
    }

    pub fn status(&self) -> MatchStatus {
        self.game.status()
    }

    pub fn start_pending(&self) -> bool {
        self.start_timer.is_some()
    }

    /// Whether a join should schedule the match start.
    pub fn should_schedule_start(&self) -> bool {
        self.status() == MatchStatus::Preinit
            && self.start_timer.is_none()
            && self.room.participants().len() >= 2
    }

    pub fn set_start_timer(&mut self, timer: AbortOnDropHandle<()>) {
        self.start_timer = Some(timer);
    }

    fn clear_start_timer(&mut self) {
        if self.start_timer.take().is_some() {
            debug!("start timer cleared");
        }
    }

    /// Allocate a token for a new threat countdown.
    pub fn next_timeout_token(&mut self) -> TimeoutToken {
        self.last_token += 1;
        TimeoutToken(self.last_token)
    }

    /// Keep a threat countdown alive until its token is resolved.
    pub fn track_threat_timer(&mut self, token: TimeoutToken, timer: AbortOnDropHandle<()>) {
        self.threat_timers.insert(token, timer);
    }

    fn cancel_timers(&mut self) {
        self.clear_start_timer();
        self.threat_timers.clear();
    }

    /// Start the match: boards for every player, then `GameInit`. No-op once started.
    pub fn init_game(&mut self) -> anyhow::Result<()> {
        if self.status() != MatchStatus::Preinit {
            return Ok(());
        }
        self.game.time_mut().start();
        let cell_values = self.game.init_game_states()?;
        self.game.set_status(MatchStatus::Ongoing);
        info!("match started");
        self.room.broadcast(ServerEvent::GameInit { cell_values });
        Ok(())
    }

    /// The deferred start failed: the match can never begin.
    pub fn fail_start(&mut self, err: anyhow::Error) {
        error!("failed to start match: {err:#}");
        self.game.set_status(MatchStatus::Ended);
        self.cancel_timers();
    }

    /// A player left. With exactly two participants the other one wins by forfeit.
    pub async fn on_player_left(&mut self, player_id: PlayerId) {
        if self.status() == MatchStatus::Ended {
            return;
        }
        self.clear_start_timer();
        let participants = self.room.participants();
        if participants.len() != 2 {
            return;
        }
        let Some(remaining) = participants
            .iter()
            .find(|session| self.room.player_for_session(session) != Some(player_id))
        else {
            return;
        };
        let Some(winner) = self.room.player_for_session(remaining) else {
            warn!(player_id, "remaining session {remaining} has no player, no forfeit declared");
            return;
        };
        info!(player_id, winner, "player left, declaring forfeit");
        self.on_game_over(winner, GameOverReason::Forfeit).await;
    }

    /// End the match once, update both ratings and announce the winner.
    pub async fn on_game_over(&mut self, winner_id: PlayerId, reason: GameOverReason) {
        if self.status() == MatchStatus::Ended {
            return;
        }
        self.game.set_status(MatchStatus::Ended);
        self.cancel_timers();
        info!(winner_id, ?reason, "match over");

        let loser_id = self.game.roster().find(|&p| p != winner_id);
        let sessions = loser_id.and_then(|loser_id| {
            Some((
                self.room.session_for_player(winner_id)?,
                self.room.session_for_player(loser_id)?,
            ))
        });
        let Some((winner, loser)) = sessions else {
            warn!(winner_id, "could not resolve both sessions, skipping rating update");
            self.room.broadcast(ServerEvent::GameOver {
                winner_id,
                reason,
                elo_change: 0,
            });
            return;
        };

        let update = self.ratings.calculate_elo_update(winner.elo, loser.elo);
        let (winner_saved, loser_saved) = tokio::join!(
            self.ratings.update_elo(&winner.id, update.new_winner_elo),
            self.ratings.update_elo(&loser.id, update.new_loser_elo),
        );
        for (session, saved) in [(&winner, winner_saved), (&loser, loser_saved)] {
            if let Err(e) = saved {
                error!("failed to persist rating for {}: {e:#}", session.uuid);
            }
        }
        self.room.broadcast(ServerEvent::GameOver {
            winner_id,
            reason,
            elo_change: update.elo_change,
        });
    }

    pub async fn update_progress(&mut self, is_board: bool, entries: &[ProgressEntry]) {
        if self.status() != MatchStatus::Ongoing {
            return;
        }
        for entry in entries {
            self.room.broadcast(ServerEvent::UpdateProgress {
                player_id: entry.player_id,
                is_board,
                progress: entry.progress,
            });
        }
        if !is_board {
            return;
        }
        if let Some(done) = entries.iter().find(|entry| entry.progress >= 100) {
            self.on_game_over(done.player_id, GameOverReason::Score).await;
            return;
        }
        let threshold = self.game.config().next_phase_threshold(self.game.phase());
        if entries.iter().any(|entry| entry.progress as f64 >= threshold) {
            let new_phase = self.game.advance_phase();
            info!(new_phase, "phase transition");
            self.room.broadcast(ServerEvent::PhaseTransition { new_phase });
        }
    }

    /// Route controller events into match level reactions.
    pub async fn handle_events(&mut self, events: &[GameEvent]) {
        for event in events {
            match *event {
                GameEvent::BoardProgress(entry) => self.update_progress(true, &[entry]).await,
                GameEvent::PupProgress(entry) => self.update_progress(false, &[entry]).await,
                GameEvent::CellSolved {
                    player_id,
                    cell_index,
                    server_time,
                } => {
                    self.on_cell_solved(player_id, cell_index, server_time);
                }
            }
        }
    }

    /// Record a pending effect for a used theme power-up and hand back the
    /// token its countdown must present.
    pub fn arm_threat(
        &mut self,
        attacker: PlayerId,
        pup_id: u64,
        target_id: PlayerId,
    ) -> Option<TimeoutToken> {
        let token = self.next_timeout_token();
        let pending = PendingEffect {
            target_id,
            timeout_token: Some(token),
        };
        self.game
            .set_pup_pending_effect(attacker, pup_id, Some(pending))
            .then_some(token)
    }

    /// Broadcast the effect of a power-up that resolves on use.
    pub fn apply_instant(
        &mut self,
        attacker: PlayerId,
        pup_id: u64,
        target_id: PlayerId,
        server_time: Timestamp,
    ) {
        if self.status() != MatchStatus::Ongoing {
            return;
        }
        self.room.broadcast(ServerEvent::ApplyEffect {
            server_time,
            player_id: attacker,
            target_id,
            pup_id,
        });
    }

    /// Attacker side resolution: the countdown ran out. Returns whether the
    /// effect was applied.
    pub fn on_threat_expired(
        &mut self,
        attacker: PlayerId,
        pup_id: u64,
        server_time: Timestamp,
        token: TimeoutToken,
    ) -> bool {
        if self.status() != MatchStatus::Ongoing {
            return false;
        }
        // this timer is done whatever the outcome; when called from the timer
        // itself this aborts a task that is already on its last poll
        self.threat_timers.remove(&token);
        let pending = self
            .game
            .find_pup_slot_by_pup_id(attacker, pup_id)
            .and_then(|slot| slot.pup.as_ref())
            .and_then(|pup| pup.pending_effect);
        let Some(pending) = pending else {
            return false;
        };
        if pending.timeout_token != Some(token) {
            debug!(attacker, pup_id, ?token, "stale threat timer ignored");
            return false;
        }
        info!(attacker, pup_id, target = pending.target_id, "threat expired");
        self.room.broadcast(ServerEvent::ApplyEffect {
            server_time,
            player_id: attacker,
            target_id: pending.target_id,
            pup_id,
        });
        self.game.set_pup_pending_effect(attacker, pup_id, None);
        self.game.remove_pup(attacker, pup_id);
        true
    }

    /// Victim side resolution: solving the threatened objective diffuses
    /// every matching threat and turns it on the solver. Returns how many
    /// threats were diffused.
    pub fn on_cell_solved(
        &mut self,
        player_id: PlayerId,
        cell_index: usize,
        server_time: Timestamp,
    ) -> usize {
        if self.status() != MatchStatus::Ongoing {
            return 0;
        }
        let diffused: Vec<(PlayerId, u64, TimeoutToken)> = self
            .game
            .players()
            .filter(|opponent| opponent.player_id != player_id)
            .flat_map(|opponent| {
                opponent.powerups.iter().filter_map(move |slot| {
                    let pup = slot.pup.as_ref()?;
                    let pending = pup.pending_effect?;
                    if pending.target_id != player_id || server_time >= pup.last_cooldown_end {
                        return None;
                    }
                    let token = pending.timeout_token?;
                    let objective = ObjectiveType::from_slot(slot.slot_index)?;
                    Some((opponent.player_id, pup.pup_id, token, objective))
                })
            })
            .filter(|&(_, _, _, objective)| {
                self.game
                    .is_objective_solved_for_cell(player_id, objective, cell_index)
            })
            .map(|(attacker, pup_id, token, _)| (attacker, pup_id, token))
            .collect();

        for &(attacker, pup_id, token) in &diffused {
            self.room.clear_tracked_timeout(token);
            self.threat_timers.remove(&token);
            info!(attacker, pup_id, player_id, "threat diffused");
            self.room.broadcast(ServerEvent::ApplyEffect {
                server_time,
                player_id: attacker,
                target_id: player_id,
                pup_id,
            });
            self.game.remove_pup(attacker, pup_id);
        }
        diffused.len()
    }

    /// Room closure. Ends the match if it is still running.
    pub fn close(&mut self) {
        if self.status() != MatchStatus::Ended {
            info!("room closed, ending match");
            self.game.set_status(MatchStatus::Ended);
        }
        self.cancel_timers();
        self.room.close_room();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GameConfig,
        controller::{
            tests::{grant_pup, small_puzzle, TrustedClock},
            SetCellRequest,
        },
        game::player::PupType,
        room::{LocalRoom, MemoryRatings, Session},
        timing::Action,
    };

    type Controller = LifecycleController<LocalRoom, MemoryRatings>;

    fn session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            uuid: format!("uuid-{id}"),
            elo: 1_000,
        }
    }

    fn controller(players: &[PlayerId]) -> (Controller, LocalRoom, MemoryRatings) {
        let room = LocalRoom::new();
        let ratings = MemoryRatings::new(40);
        let mut game = GameStateController::new(
            small_puzzle(),
            GameConfig::default(),
            Box::new(TrustedClock::default()),
        )
        .with_rng_seed(1);
        for &p in players {
            game.add_player(p);
            room.join(session(&format!("s{p}")), p);
        }
        (
            LifecycleController::new(game, room.clone(), ratings.clone()),
            room,
            ratings,
        )
    }

    fn ongoing(players: &[PlayerId]) -> (Controller, LocalRoom, MemoryRatings) {
        let (mut ctl, room, ratings) = controller(players);
        ctl.init_game().unwrap();
        (ctl, room, ratings)
    }

    fn game_overs(room: &LocalRoom) -> Vec<ServerEvent> {
        room.history()
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::GameOver { .. }))
            .collect()
    }

    /// Theme power-up for `attacker` in `slot`, used against `target`.
    fn armed_threat(
        ctl: &mut Controller,
        attacker: PlayerId,
        slot: usize,
        target: PlayerId,
    ) -> (u64, TimeoutToken) {
        let pup = grant_pup(ctl.game_mut(), attacker, slot, PupType::Theme);
        ctl.game_mut()
            .consume_pup(Action::UsePowerUp, attacker, pup.pup_id, 1_000)
            .unwrap();
        let token = ctl.arm_threat(attacker, pup.pup_id, target).unwrap();
        (pup.pup_id, token)
    }

    fn solve_second_row(game: &mut GameStateController, player: PlayerId) {
        let mut t = 100_000;
        for (cell, value) in [(4, 3), (5, 4), (6, 1), (7, 2)] {
            let request = SetCellRequest {
                client_time: t,
                cell_index: cell,
                value,
            };
            assert!(game.set_cell_value(player, request).result);
            t += 20_000;
        }
    }

    #[test]
    fn init_game_is_one_shot() {
        let (mut ctl, room, _) = controller(&[0, 1]);
        assert!(ctl.should_schedule_start());
        ctl.init_game().unwrap();
        assert_eq!(ctl.status(), MatchStatus::Ongoing);
        assert!(!ctl.should_schedule_start());
        let request = SetCellRequest {
            client_time: 1_000,
            cell_index: 4,
            value: 3,
        };
        ctl.game_mut().set_cell_value(0, request);
        ctl.init_game().unwrap();
        // boards were not re-initialized
        assert_eq!(ctl.game().player_state(0).unwrap().board.state().cells[4].value, 3);
        let inits = room
            .history()
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::GameInit { .. }))
            .count();
        assert_eq!(inits, 1);
    }

    #[test]
    fn start_needs_two_participants() {
        let (ctl, _, _) = controller(&[0]);
        assert!(!ctl.should_schedule_start());
    }

    #[tokio::test]
    async fn forfeit_when_one_of_last_two_leaves() {
        let (mut ctl, room, ratings) = ongoing(&[0, 1]);
        ctl.on_player_left(0).await;
        assert_eq!(ctl.status(), MatchStatus::Ended);
        assert_eq!(
            game_overs(&room),
            vec![ServerEvent::GameOver {
                winner_id: 1,
                reason: GameOverReason::Forfeit,
                elo_change: 40
            }]
        );
        assert_eq!(ratings.rating(&"s1".to_string()), Some(1_040));
        assert_eq!(ratings.rating(&"s0".to_string()), Some(960));

        ctl.on_player_left(1).await;
        assert_eq!(game_overs(&room).len(), 1);
    }

    #[tokio::test]
    async fn unmapped_remaining_player_leaves_match_open() {
        let (mut ctl, room, _) = ongoing(&[0, 1]);
        room.unmap(&"s1".to_string());
        ctl.on_player_left(0).await;
        assert_eq!(ctl.status(), MatchStatus::Ongoing);
        assert!(game_overs(&room).is_empty());
    }

    #[tokio::test]
    async fn no_forfeit_with_more_players_left() {
        let (mut ctl, room, _) = ongoing(&[0, 1, 2]);
        ctl.on_player_left(0).await;
        assert_eq!(ctl.status(), MatchStatus::Ongoing);
        assert!(game_overs(&room).is_empty());
    }

    #[tokio::test]
    async fn game_over_without_sessions_reports_zero_change() {
        let (mut ctl, room, ratings) = ongoing(&[0, 1]);
        room.disconnect(&"s0".to_string());
        ctl.on_game_over(1, GameOverReason::Score).await;
        assert_eq!(
            game_overs(&room),
            vec![ServerEvent::GameOver {
                winner_id: 1,
                reason: GameOverReason::Score,
                elo_change: 0
            }]
        );
        assert_eq!(ratings.rating(&"s1".to_string()), None);
    }

    #[tokio::test]
    async fn persistence_failure_still_broadcasts_change() {
        let room = LocalRoom::new();
        let mut game = GameStateController::new(
            small_puzzle(),
            GameConfig::default(),
            Box::new(TrustedClock::default()),
        );
        for p in [0, 1] {
            game.add_player(p);
            room.join(session(&format!("s{p}")), p);
        }
        let mut ctl = LifecycleController::new(game, room.clone(), MemoryRatings::failing(40));
        ctl.init_game().unwrap();
        ctl.on_game_over(0, GameOverReason::Score).await;
        assert_eq!(
            game_overs(&room),
            vec![ServerEvent::GameOver {
                winner_id: 0,
                reason: GameOverReason::Score,
                elo_change: 40
            }]
        );
    }

    #[tokio::test]
    async fn first_finished_player_in_batch_wins() {
        let (mut ctl, room, _) = ongoing(&[0, 1, 2]);
        let batch = [
            ProgressEntry { player_id: 2, progress: 50 },
            ProgressEntry { player_id: 1, progress: 100 },
            ProgressEntry { player_id: 0, progress: 100 },
        ];
        ctl.update_progress(true, &batch).await;
        let overs = game_overs(&room);
        assert_eq!(overs.len(), 1);
        assert!(matches!(
            overs[0],
            ServerEvent::GameOver {
                winner_id: 1,
                reason: GameOverReason::Score,
                elo_change: 40
            }
        ));

        // nothing is broadcast after the end
        let before = room.history().len();
        ctl.update_progress(true, &batch).await;
        assert_eq!(room.history().len(), before);
    }

    #[tokio::test]
    async fn phase_advances_one_step_per_update() {
        let (mut ctl, room, _) = ongoing(&[0, 1]);
        ctl.update_progress(true, &[ProgressEntry { player_id: 0, progress: 33 }]).await;
        assert_eq!(ctl.game().phase(), 0);
        ctl.update_progress(true, &[ProgressEntry { player_id: 0, progress: 80 }]).await;
        assert_eq!(ctl.game().phase(), 1);
        ctl.update_progress(true, &[ProgressEntry { player_id: 0, progress: 80 }]).await;
        assert_eq!(ctl.game().phase(), 2);
        ctl.update_progress(true, &[ProgressEntry { player_id: 0, progress: 80 }]).await;
        assert_eq!(ctl.game().phase(), 2);

        // power-up progress never moves phases
        ctl.update_progress(false, &[ProgressEntry { player_id: 1, progress: 100 }]).await;
        assert_eq!(ctl.status(), MatchStatus::Ongoing);

        let transitions: Vec<_> = room
            .history()
            .into_iter()
            .filter_map(|e| match e {
                ServerEvent::PhaseTransition { new_phase } => Some(new_phase),
                _ => None,
            })
            .collect();
        assert_eq!(transitions, vec![1, 2]);
        assert!(room.history().contains(&ServerEvent::UpdateProgress {
            player_id: 1,
            is_board: false,
            progress: 100
        }));
    }

    #[tokio::test]
    async fn progress_ignored_before_start() {
        let (mut ctl, room, _) = controller(&[0, 1]);
        ctl.update_progress(true, &[ProgressEntry { player_id: 0, progress: 100 }]).await;
        assert!(room.history().is_empty());
        assert_eq!(ctl.status(), MatchStatus::Preinit);
    }

    #[test]
    fn threat_expiry_applies_once() {
        let (mut ctl, room, _) = ongoing(&[0, 1]);
        let (pup_id, token) = armed_threat(&mut ctl, 0, 0, 1);

        assert!(!ctl.on_threat_expired(0, pup_id, 31_000, TimeoutToken(token.0 + 100)));
        assert!(ctl.on_threat_expired(0, pup_id, 31_000, token));
        assert!(ctl.game().find_pup_slot_by_pup_id(0, pup_id).is_none());
        assert!(!ctl.on_threat_expired(0, pup_id, 31_000, token));

        let applied: Vec<_> = room
            .history()
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::ApplyEffect { .. }))
            .collect();
        assert_eq!(
            applied,
            vec![ServerEvent::ApplyEffect {
                server_time: 31_000,
                player_id: 0,
                target_id: 1,
                pup_id
            }]
        );
    }

    #[tokio::test]
    async fn stale_timer_is_forgotten() {
        let (mut ctl, _, _) = ongoing(&[0, 1]);
        let (pup_id, token) = armed_threat(&mut ctl, 0, 0, 1);
        let stale = ctl.next_timeout_token();
        ctl.track_threat_timer(stale, AbortOnDropHandle::new(tokio::spawn(async {})));
        ctl.track_threat_timer(token, AbortOnDropHandle::new(tokio::spawn(async {})));

        assert!(!ctl.on_threat_expired(0, pup_id, 31_000, stale));
        assert!(!ctl.threat_timers.contains_key(&stale));
        assert!(ctl.threat_timers.contains_key(&token));

        assert!(ctl.on_threat_expired(0, pup_id, 31_000, token));
        assert!(ctl.threat_timers.is_empty());
    }

    #[test]
    fn diffuse_after_expiry_does_not_clear_timer() {
        let (mut ctl, room, _) = ongoing(&[0, 1]);
        let (pup_id, token) = armed_threat(&mut ctl, 0, 0, 1);
        assert!(ctl.on_threat_expired(0, pup_id, 2_000, token));
        solve_second_row(ctl.game_mut(), 1);
        assert_eq!(ctl.on_cell_solved(1, 4, 2_000), 0);
        assert!(room.cleared_timeouts().is_empty());
    }

    #[test]
    fn solving_the_row_diffuses_row_threat() {
        let (mut ctl, room, _) = ongoing(&[0, 1]);
        let (pup_id, token) = armed_threat(&mut ctl, 0, 0, 1);

        // row 1 not solved yet
        assert_eq!(ctl.on_cell_solved(1, 4, 2_000), 0);
        solve_second_row(ctl.game_mut(), 1);
        assert_eq!(ctl.on_cell_solved(1, 4, 2_000), 1);
        assert_eq!(room.cleared_timeouts(), vec![token]);
        assert!(ctl.game().find_pup_slot_by_pup_id(0, pup_id).is_none());
        assert!(room.history().contains(&ServerEvent::ApplyEffect {
            server_time: 2_000,
            player_id: 0,
            target_id: 1,
            pup_id
        }));

        // the countdown losing the race is a no-op
        assert!(!ctl.on_threat_expired(0, pup_id, 31_000, token));
        assert_eq!(room.cleared_timeouts().len(), 1);
    }

    #[test]
    fn diffuse_requires_open_window_and_matching_objective() {
        let (mut ctl, room, _) = ongoing(&[0, 1]);
        // column threat
        let (pup_id, _) = armed_threat(&mut ctl, 0, 1, 1);
        solve_second_row(ctl.game_mut(), 1);
        // row solved, column of cell 4 is not
        assert_eq!(ctl.on_cell_solved(1, 4, 2_000), 0);
        // window closed
        assert_eq!(ctl.on_cell_solved(1, 4, 31_000), 0);
        // a player never diffuses their own threats
        assert_eq!(ctl.on_cell_solved(0, 4, 2_000), 0);
        assert!(ctl.game().find_pup_slot_by_pup_id(0, pup_id).is_some());
        assert!(room.cleared_timeouts().is_empty());
    }

    #[test]
    fn close_ends_match_and_room() {
        let (mut ctl, room, _) = ongoing(&[0, 1]);
        let (pup_id, token) = armed_threat(&mut ctl, 0, 0, 1);
        ctl.close();
        assert_eq!(ctl.status(), MatchStatus::Ended);
        assert!(room.is_closed());
        assert!(!ctl.on_threat_expired(0, pup_id, 2_000, token));
    }

    #[test]
    fn failed_start_ends_match() {
        let (mut ctl, _, _) = controller(&[0, 1]);
        ctl.fail_start(anyhow::anyhow!("boom"));
        assert_eq!(ctl.status(), MatchStatus::Ended);
        ctl.init_game().unwrap();
        assert_eq!(ctl.status(), MatchStatus::Ended);
    }

    #[tokio::test]
    async fn events_route_to_lifecycle() {
        let (mut ctl, room, _) = ongoing(&[0, 1]);
        let outcome = ctl
            .game_mut()
            .set_cell_value(0, SetCellRequest { client_time: 1_000, cell_index: 4, value: 3 });
        ctl.handle_events(&outcome.events).await;
        assert!(room.history().contains(&ServerEvent::UpdateProgress {
            player_id: 0,
            is_board: true,
            progress: 8
        }));
        assert!(room.history().contains(&ServerEvent::UpdateProgress {
            player_id: 0,
            is_board: false,
            progress: 20
        }));
    }
}
