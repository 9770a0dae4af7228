use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use anyhow::Context as _;
use puzzle_duel::{
    game::{player::PupType, Puzzle},
    utils::get_timestamp,
    ClockSync, GameConfig, GameStateController, LifecycleController, LocalRoom, MatchHandle,
    MemoryRatings, SetCellRequest, Session,
};
use tokio::time::{sleep, Duration};

/// Scripted two player match on a 4x4 board, driven by a virtual clock so
/// cooldowns do not slow it down.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    puzzle_duel::init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load(&path)?,
        None => GameConfig::default(),
    };
    let start_delay = Duration::from_millis(config.start_delay_ms);

    let solution = vec![1, 2, 3, 4, 3, 4, 1, 2, 2, 1, 4, 3, 4, 3, 2, 1];
    let mut cells = solution.clone();
    for hole in [4, 5, 6, 7, 9, 10, 14] {
        cells[hole] = 0;
    }
    let puzzle = Puzzle::new(cells, solution.clone()).context("demo puzzle")?;

    let now = Arc::new(AtomicI64::new(get_timestamp()));
    let clock = now.clone();
    let time = ClockSync::with_clock(
        config.max_clock_drift_ms,
        Box::new(move || clock.load(Ordering::SeqCst)),
    );

    let room = LocalRoom::new();
    let mut events = room.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => tracing::info!("event: {json}"),
                Err(e) => tracing::warn!("unprintable event: {e}"),
            }
        }
    });

    let game = GameStateController::new(puzzle, config, Box::new(time));
    let lifecycle = LifecycleController::new(game, room.clone(), MemoryRatings::new(16));
    let handle = MatchHandle::new(lifecycle);

    for (player, name) in [(0, "ada"), (1, "bob")] {
        handle.add_player(player).await;
        room.join(
            Session {
                id: name.to_string(),
                uuid: format!("{name}-uuid"),
                elo: 1_200,
            },
            player,
        );
        handle.on_player_joined().await;
    }
    sleep(start_delay + Duration::from_millis(50)).await;

    // bob plays one wrong digit, ada solves her board
    let step = |ms: i64| now.fetch_add(ms, Ordering::SeqCst) + ms;
    let t = step(1_000);
    let outcome = handle
        .set_cell_value(1, SetCellRequest { client_time: t, cell_index: 4, value: 9 })
        .await;
    tracing::info!("bob wrote a 9: accepted={}", outcome.result);

    for cell in [4, 5, 6, 7, 9, 10, 14] {
        let t = step(6_000);
        let request = SetCellRequest {
            client_time: t,
            cell_index: cell,
            value: solution[cell],
        };
        let outcome = handle.set_cell_value(0, request).await;
        tracing::info!("ada solved cell {cell}: accepted={}", outcome.result);
        if let Some(pup) = handle.draw_power_up(0, PupType::Instant).await {
            let t = step(100);
            let used = handle.use_power_up(0, pup.pup_id, 1, t).await;
            tracing::info!("ada used power-up {}: {:?}", pup.pup_id, used);
        }
    }

    let status = handle.lock().await.status();
    tracing::info!("match finished with status {status:?}");
    handle.close().await;
    // let the printer drain
    sleep(Duration::from_millis(50)).await;
    Ok(())
}
