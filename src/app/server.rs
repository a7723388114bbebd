pub mod connection;
pub mod engine;
pub mod errors;
pub mod events;
pub mod functions;
pub mod outbox;
pub mod reaper;
pub mod redis_client;
pub mod service;
pub mod sessions;
pub mod storage;
pub mod utils;

use app::server::{outbox::spawn_outbox, reaper::spawn_reaper, utils::create_redis_client};

use crate::app::{self, types};

pub async fn start_server(config: types::ServerConfig, tcp_listener: tokio::net::TcpListener) {
    let formatter = tracing_subscriber::fmt::format()
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::fmt().event_format(formatter).init();

    let redis_client = create_redis_client(config.redis.unwrap_or_default())
        .await
        .unwrap();

    let store = storage::Store::new(redis_client);
    let tunables = config.game.unwrap_or_default();

    let persist = spawn_outbox(store.clone());
    let game_server = service::GameServer::new(sessions::Sessions::new(), persist, tunables.clone());
    let _ = spawn_reaper(store, game_server.rooms.clone(), tunables);

    tracing::info!(
        "Server successfully running on {:?}",
        tcp_listener.local_addr()
    );

    loop {
        match tcp_listener.accept().await {
            Ok((stream, peer)) => {
                let per_connection = game_server.clone();
                tokio::spawn(async move {
                    connection::handle_connection(per_connection, stream, peer).await;
                });
            }
            Err(error) => {
                tracing::warn!(?error, "failed to accept a connection");
            }
        }
    }
}
