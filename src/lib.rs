pub mod client;
pub mod config;
pub mod controller;
pub mod game;
pub mod lifecycle;
pub mod room;
pub mod state;
pub mod timing;
pub mod utils;

pub use config::GameConfig;
pub use controller::{GameEvent, GameStateController, SetCellOutcome, SetCellRequest};
pub use lifecycle::LifecycleController;
pub use room::{LocalRoom, MemoryRatings, RatingService, Room, ServerEvent, Session};
pub use state::MatchHandle;
pub use timing::{ClockSync, TimeCoordinator};

/// Install the global log subscriber.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .pretty()
        .with_ansi(false)
        .init();
}
