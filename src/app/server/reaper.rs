use std::{sync::Arc, time::Duration};

use crate::app::{
    server::{
        engine::registry::RoomRegistry,
        storage::{interface::lobby::LobbyInterface, Store},
    },
    types::GameConfig,
};

/// Periodic cleanup of state that outlived its players. In-memory rooms are
/// evicted by the registry, stored lobby records are closed in redis so the
/// lobby listing does not fill with dead entries.
pub fn spawn_reaper(
    store: Store,
    rooms: Arc<std::sync::Mutex<RoomRegistry>>,
    tunables: GameConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(tunables.reaper_interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_once(&store, &rooms, &tunables).await;
        }
    })
}

/// One sweep, callable directly so a shutdown path or a test does not have
/// to wait for the interval.
pub async fn run_once(
    store: &Store,
    rooms: &Arc<std::sync::Mutex<RoomRegistry>>,
    tunables: &GameConfig,
) {
    let evicted = {
        let mut rooms = rooms.lock().unwrap();
        rooms.evict_idle_rooms()
    };
    if evicted > 0 {
        tracing::info!(evicted, "evicted idle rooms");
    }

    match store
        .close_stale_lobbies(tunables.stale_lobby_secs * 1000)
        .await
    {
        Ok(0) => {}
        Ok(closed) => tracing::info!(closed, "closed stale lobby records"),
        Err(db_error) => tracing::error!(?db_error, "stale lobby sweep failed"),
    }
}
