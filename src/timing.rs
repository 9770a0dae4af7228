use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    game::{PlayerId, Timestamp},
    utils::get_timestamp,
};

/// Player actions the time coordinator keeps track of.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    SetCell,
    UsePowerUp,
}

/// Maps client clock readings onto the server clock.
///
/// A negative result from [`TimeCoordinator::assess_timing`] means the
/// request must be rejected (clock desync or a replayed message).
pub trait TimeCoordinator: Send {
    fn start(&mut self);
    fn assess_timing(&mut self, player: PlayerId, client_time: Timestamp) -> Timestamp;
    fn update_last_action_time(
        &mut self,
        player: PlayerId,
        action: Action,
        client_time: Timestamp,
        server_time: Option<Timestamp>,
    ) -> Timestamp;
    /// Current server time.
    fn server_now(&self) -> Timestamp;
}

/// Source of server time in ms.
pub type Clock = Box<dyn Fn() -> Timestamp + Send>;

#[derive(Debug, Clone, Copy)]
struct PlayerClock {
    offset: Timestamp,
    last_client_time: Option<Timestamp>,
    last_action: Option<(Action, Timestamp)>,
}

/// Per player clock offset tracking.
///
/// The offset between a player's clock and the server is fixed by their
/// first request. Later requests must carry strictly increasing client
/// times and stay within `max_drift` of the server clock.
pub struct ClockSync {
    clock: Clock,
    max_drift: Timestamp,
    started: bool,
    players: HashMap<PlayerId, PlayerClock>,
}

impl ClockSync {
    /// Sync against the system clock.
    pub fn new(max_drift: Timestamp) -> Self {
        Self::with_clock(max_drift, Box::new(get_timestamp))
    }

    pub fn with_clock(max_drift: Timestamp, clock: Clock) -> Self {
        Self {
            clock,
            max_drift,
            started: false,
            players: HashMap::new(),
        }
    }

    /// Last accepted action of a player and its server time.
    pub fn last_action(&self, player: PlayerId) -> Option<(Action, Timestamp)> {
        self.players.get(&player).and_then(|p| p.last_action)
    }
}

impl TimeCoordinator for ClockSync {
    fn start(&mut self) {
        self.started = true;
        self.players.clear();
    }

    fn assess_timing(&mut self, player: PlayerId, client_time: Timestamp) -> Timestamp {
        if !self.started {
            return -1;
        }
        let now = (self.clock)();
        let entry = self.players.entry(player).or_insert(PlayerClock {
            offset: now - client_time,
            last_client_time: None,
            last_action: None,
        });
        if entry.last_client_time.is_some_and(|last| client_time <= last) {
            tracing::debug!(player, client_time, "rejecting replayed client time");
            return -1;
        }
        let server_time = client_time + entry.offset;
        if (server_time - now).abs() > self.max_drift {
            tracing::debug!(player, server_time, now, "rejecting desynced client clock");
            return -1;
        }
        server_time
    }

    fn update_last_action_time(
        &mut self,
        player: PlayerId,
        action: Action,
        client_time: Timestamp,
        server_time: Option<Timestamp>,
    ) -> Timestamp {
        let now = (self.clock)();
        let entry = self.players.entry(player).or_insert(PlayerClock {
            offset: now - client_time,
            last_client_time: None,
            last_action: None,
        });
        let server_time = server_time.unwrap_or(client_time + entry.offset);
        entry.last_client_time = Some(client_time);
        entry.last_action = Some((action, server_time));
        server_time
    }

    fn server_now(&self) -> Timestamp {
        (self.clock)()
    }
}
