use std::sync::{Arc, Weak};

use tokio::{
    sync::{Mutex as TokioMutex, MutexGuard},
    time::{sleep, Duration},
};
use tokio_util::task::AbortOnDropHandle;

use crate::{
    controller::{SetCellOutcome, SetCellRequest},
    game::{
        player::{PupDescriptor, PupType},
        PlayerId, Timestamp,
    },
    lifecycle::LifecycleController,
    room::{RatingService, Room},
    timing::Action,
};

type Shared<R, E> = Arc<TokioMutex<LifecycleController<R, E>>>;

/// Holds one match's runtime context. Every entry point from the room
/// (joins, leaves, player messages and timer callbacks) goes through the
/// same lock, so a match never sees two of them interleave.
pub struct MatchHandle<R: Room, E: RatingService> {
    inner: Shared<R, E>,
}

impl<R: Room, E: RatingService> Clone for MatchHandle<R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: Room, E: RatingService> MatchHandle<R, E> {
    pub fn new(controller: LifecycleController<R, E>) -> Self {
        Self {
            inner: Arc::new(TokioMutex::new(controller)),
        }
    }

    /// Direct access to the match, for reads and tests.
    pub async fn lock(&self) -> MutexGuard<'_, LifecycleController<R, E>> {
        self.inner.lock().await
    }

    /// Register a player before the match starts.
    pub async fn add_player(&self, player_id: PlayerId) -> bool {
        self.inner.lock().await.game_mut().add_player(player_id)
    }

    /// Call after the room admitted a participant. Schedules the match start
    /// once two are present. Returns whether a start was scheduled.
    pub async fn on_player_joined(&self) -> bool {
        let mut ctl = self.inner.lock().await;
        if !ctl.should_schedule_start() {
            return false;
        }
        let delay = Duration::from_millis(ctl.game().config().start_delay_ms);
        tracing::info!("match starts in {delay:?}");
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut ctl = inner.lock().await;
            if let Err(e) = ctl.init_game() {
                ctl.fail_start(e);
            }
        });
        ctl.set_start_timer(AbortOnDropHandle::new(task));
        true
    }

    /// Forward a departure to the controller.
    pub async fn on_player_left(&self, player_id: PlayerId) {
        self.inner.lock().await.on_player_left(player_id).await;
    }

    /// Validate and apply a cell write, then let the match react to it.
    pub async fn set_cell_value(
        &self,
        player_id: PlayerId,
        request: SetCellRequest,
    ) -> SetCellOutcome {
        let mut ctl = self.inner.lock().await;
        let outcome = ctl.game_mut().set_cell_value(player_id, request);
        ctl.handle_events(&outcome.events).await;
        outcome
    }

    /// Spend full power-up progress on a new power-up.
    pub async fn draw_power_up(
        &self,
        player_id: PlayerId,
        pup_type: PupType,
    ) -> Option<PupDescriptor> {
        let mut ctl = self.inner.lock().await;
        let game = ctl.game_mut();
        let slot_index = game.reserve_pup_draw(player_id)?;
        game.draw_random_pup(player_id, slot_index, pup_type)
    }

    /// Use a power-up against `target_id`. A theme power-up threatens the
    /// target until its window closes; the target can diffuse it by solving
    /// the slot's objective first. Returns the accepted server time.
    pub async fn use_power_up(
        &self,
        attacker: PlayerId,
        pup_id: u64,
        target_id: PlayerId,
        client_time: Timestamp,
    ) -> Option<Timestamp> {
        let mut ctl = self.inner.lock().await;
        let server_time = ctl
            .game_mut()
            .consume_pup(Action::UsePowerUp, attacker, pup_id, client_time)?;
        let window_end = ctl
            .game()
            .find_pup_slot_by_pup_id(attacker, pup_id)
            .and_then(|slot| slot.pup.as_ref())
            .map(|pup| pup.last_cooldown_end);
        match window_end {
            Some(window_end) => {
                let token = ctl.arm_threat(attacker, pup_id, target_id)?;
                let delay = Duration::from_millis((window_end - server_time).max(0) as u64);
                let weak = Arc::downgrade(&self.inner);
                let timer = spawn_threat_timer(weak, delay, move |ctl| {
                    ctl.on_threat_expired(attacker, pup_id, window_end, token);
                });
                ctl.track_threat_timer(token, timer);
            }
            None => ctl.apply_instant(attacker, pup_id, target_id, server_time),
        }
        Some(server_time)
    }

    /// Tear the match down with its room.
    pub async fn close(&self) {
        self.inner.lock().await.close();
    }
}

fn spawn_threat_timer<R, E, F>(
    weak: Weak<TokioMutex<LifecycleController<R, E>>>,
    delay: Duration,
    fire: F,
) -> AbortOnDropHandle<()>
where
    R: Room,
    E: RatingService,
    F: FnOnce(&mut LifecycleController<R, E>) + Send + 'static,
{
    AbortOnDropHandle::new(tokio::spawn(async move {
        sleep(delay).await;
        if let Some(inner) = weak.upgrade() {
            fire(&mut *inner.lock().await);
        }
    }))
}
