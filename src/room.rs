//! Collaborators a match talks to: the room that owns the connections and
//! the rating service. Both are traits so the transport and persistence
//! layers stay outside this crate. In-memory versions are provided for
//! local play and tests.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::game::{player::TimeoutToken, GameOverReason, PlayerId, Timestamp};

pub type SessionId = String;

/// A connected participant as the room knows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub uuid: String,
    pub elo: i32,
}

/// Payloads broadcast to every participant of a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    GameInit { cell_values: Vec<u8> },
    #[serde(rename_all = "camelCase")]
    GameOver {
        winner_id: PlayerId,
        reason: GameOverReason,
        elo_change: i32,
    },
    #[serde(rename_all = "camelCase")]
    PhaseTransition { new_phase: u32 },
    #[serde(rename_all = "camelCase")]
    UpdateProgress {
        player_id: PlayerId,
        is_board: bool,
        progress: u8,
    },
    #[serde(rename_all = "camelCase")]
    ApplyEffect {
        server_time: Timestamp,
        player_id: PlayerId,
        target_id: PlayerId,
        pup_id: u64,
    },
}

pub trait Room: Send + 'static {
    fn broadcast(&self, event: ServerEvent);
    /// Sessions currently connected to the room.
    fn participants(&self) -> Vec<SessionId>;
    fn player_for_session(&self, session: &SessionId) -> Option<PlayerId>;
    fn session_for_player(&self, player: PlayerId) -> Option<Session>;
    /// The countdown behind `token` no longer needs to fire.
    fn clear_tracked_timeout(&self, token: TimeoutToken);
    fn close_room(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EloUpdate {
    pub new_winner_elo: i32,
    pub new_loser_elo: i32,
    pub elo_change: i32,
}

pub trait RatingService: Send + 'static {
    fn calculate_elo_update(&self, winner_elo: i32, loser_elo: i32) -> EloUpdate;
    /// Persist a new rating for the session's account.
    fn update_elo(
        &self,
        session: &SessionId,
        new_elo: i32,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[derive(Default)]
struct RoomInner {
    participants: Vec<Session>,
    players: HashMap<SessionId, PlayerId>,
    history: Vec<ServerEvent>,
    cleared_timeouts: Vec<TimeoutToken>,
    closed: bool,
}

/// In-process room: keeps every broadcast and fans it out to subscribers.
#[derive(Clone)]
pub struct LocalRoom {
    inner: Arc<Mutex<RoomInner>>,
    events: broadcast::Sender<ServerEvent>,
}

impl Default for LocalRoom {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRoom {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Mutex::new(RoomInner::default())),
            events,
        }
    }

    fn inner(&self) -> MutexGuard<'_, RoomInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect a session as `player`, replacing an earlier connection.
    pub fn join(&self, session: Session, player: PlayerId) {
        let mut inner = self.inner();
        inner.players.insert(session.id.clone(), player);
        inner.participants.retain(|s| s.id != session.id);
        inner.participants.push(session);
    }

    /// Drop the connection but keep the session to player mapping.
    pub fn disconnect(&self, session: &SessionId) {
        self.inner().participants.retain(|s| &s.id != session);
    }

    /// Forget which player a session controls.
    pub fn unmap(&self, session: &SessionId) {
        self.inner().players.remove(session);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Every event broadcast so far, oldest first.
    pub fn history(&self) -> Vec<ServerEvent> {
        self.inner().history.clone()
    }

    pub fn cleared_timeouts(&self) -> Vec<TimeoutToken> {
        self.inner().cleared_timeouts.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner().closed
    }
}

impl Room for LocalRoom {
    fn broadcast(&self, event: ServerEvent) {
        tracing::debug!("broadcast {:?}", event);
        self.inner().history.push(event.clone());
        // nobody listening is fine
        let _ = self.events.send(event);
    }

    fn participants(&self) -> Vec<SessionId> {
        self.inner().participants.iter().map(|s| s.id.clone()).collect()
    }

    fn player_for_session(&self, session: &SessionId) -> Option<PlayerId> {
        self.inner().players.get(session).copied()
    }

    fn session_for_player(&self, player: PlayerId) -> Option<Session> {
        let inner = self.inner();
        let session_id = inner
            .players
            .iter()
            .find_map(|(session, &p)| (p == player).then_some(session))?;
        inner
            .participants
            .iter()
            .find(|s| &s.id == session_id)
            .cloned()
    }

    fn clear_tracked_timeout(&self, token: TimeoutToken) {
        self.inner().cleared_timeouts.push(token);
    }

    fn close_room(&self) {
        self.inner().closed = true;
    }
}

/// Ratings kept in memory with a fixed rating change per match.
#[derive(Clone)]
pub struct MemoryRatings {
    elo_change: i32,
    ratings: Arc<Mutex<HashMap<SessionId, i32>>>,
    fail_writes: bool,
}

impl MemoryRatings {
    pub fn new(elo_change: i32) -> Self {
        Self {
            elo_change,
            ratings: Default::default(),
            fail_writes: false,
        }
    }

    /// Every write fails, for exercising the degraded path.
    pub fn failing(elo_change: i32) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(elo_change)
        }
    }

    pub fn rating(&self, session: &SessionId) -> Option<i32> {
        self.ratings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session)
            .copied()
    }
}

impl RatingService for MemoryRatings {
    fn calculate_elo_update(&self, winner_elo: i32, loser_elo: i32) -> EloUpdate {
        EloUpdate {
            new_winner_elo: winner_elo + self.elo_change,
            new_loser_elo: loser_elo - self.elo_change,
            elo_change: self.elo_change,
        }
    }

    async fn update_elo(&self, session: &SessionId, new_elo: i32) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("rating store unavailable for {session}");
        }
        self.ratings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.clone(), new_elo);
        Ok(())
    }
}
