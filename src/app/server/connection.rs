use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::mpsc,
};

use crate::app::server::{
    events::{ClientMessage, ServerEvent},
    service::GameServer,
};

/// Drive one client connection. The wire format is one JSON message per
/// line in both directions. Events for this client are funneled through an
/// unbounded channel so handlers can emit from inside a locked section,
/// a dedicated task drains the channel onto the socket.
pub async fn handle_connection(server: GameServer, stream: TcpStream, peer: std::net::SocketAddr) {
    tracing::info!(%peer, "client connected");

    let (read_half, mut write_half) = stream.into_split();
    let (event_sender, mut event_receiver) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = event_receiver.recv().await {
            let mut line = match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(error) => {
                    tracing::error!(?error, "failed to serialize outbound event");
                    continue;
                }
            };
            line.push('\n');
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut bound_user_id: Option<String> = None;
    let mut lines = BufReader::new(read_half).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClientMessage>(line) {
                    Ok(message) => {
                        if let Some(user_id) = server.handle_message(&event_sender, message).await {
                            bound_user_id = Some(user_id);
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%peer, ?error, "unparseable client message");
                        let _ = event_sender.send(ServerEvent::Error {
                            message: "Could not parse that message".to_string(),
                        });
                    }
                }
            }
            Ok(None) => break,
            Err(error) => {
                tracing::warn!(%peer, ?error, "read failed, closing connection");
                break;
            }
        }
    }

    if let Some(user_id) = bound_user_id {
        tracing::info!(%peer, user_id, "client disconnected");
        server.handle_disconnect(&user_id);
    } else {
        tracing::info!(%peer, "client disconnected before joining");
    }

    writer.abort();
}
