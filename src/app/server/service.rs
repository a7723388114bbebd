use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rand::Rng;
use tokio::sync::mpsc::UnboundedSender;

use crate::app::{
    server::{
        engine::{registry::RoomRegistry, room::Room},
        errors::ApiError,
        events::{ClientMessage, ServerEvent},
        functions::{lifecycle, presence},
        outbox::{PersistHandle, PersistJob},
        sessions::Sessions,
        storage::models,
    },
    types::GameConfig,
};

/// Shared state behind every message handler. Handlers take the registry
/// lock, mutate room state, push events and return, durable writes go
/// through the outbox.
#[derive(Clone)]
pub struct GameServer {
    pub rooms: Arc<Mutex<RoomRegistry>>,
    pub sessions: Sessions,
    pub persist: PersistHandle,
    pub tunables: GameConfig,
}

impl GameServer {
    pub fn new(sessions: Sessions, persist: PersistHandle, tunables: GameConfig) -> Self {
        let registry = RoomRegistry::new(
            tunables.max_rooms,
            Duration::from_secs(tunables.eviction_idle_secs),
        );

        Self {
            rooms: Arc::new(Mutex::new(registry)),
            sessions,
            persist,
            tunables,
        }
    }

    /// Synchronous room creation, independent of the realtime channel.
    pub fn create_room(
        &self,
        name: &str,
        host_id: &str,
        max_players: u8,
        round_duration_secs: u64,
        password: Option<String>,
    ) -> Result<String, ApiError> {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("Room name cannot be empty"));
        }
        if !(3..=8).contains(&max_players) {
            return Err(ApiError::bad_request(
                "Room size must be between 3 and 8 players",
            ));
        }
        if !(30..=90).contains(&round_duration_secs) {
            return Err(ApiError::bad_request(
                "Round duration must be between 30 and 90 seconds",
            ));
        }

        let room_id = {
            let mut rooms = self.rooms.lock().unwrap();

            let room_id = loop {
                let candidate = rand::thread_rng().gen_range(100000..1000000).to_string();
                if !rooms.contains(&candidate) {
                    break candidate;
                }
            };

            let room = Room::new(
                room_id.clone(),
                name.trim().to_string(),
                host_id.to_string(),
                max_players,
                round_duration_secs,
                password.clone(),
            );
            rooms.insert_room(room);
            room_id
        };

        let lobby = models::LobbyRecord::new(
            room_id.clone(),
            name.trim().to_string(),
            host_id.to_string(),
            max_players,
            round_duration_secs,
            password.is_some(),
        );
        self.persist.enqueue(PersistJob::CreateLobby(lobby));

        tracing::info!(room_id, host_id, "room created");
        Ok(room_id)
    }

    /// Dispatch one inbound message. Returns the user id bound by a
    /// successful join so the connection can report disconnects later.
    pub async fn handle_message(
        &self,
        session: &UnboundedSender<ServerEvent>,
        message: ClientMessage,
    ) -> Option<String> {
        tracing::info!(?message);

        match message {
            ClientMessage::CreateRoom {
                name,
                user_id,
                max_players,
                round_duration_secs,
                password,
            } => {
                let event = match self.create_room(
                    &name,
                    &user_id,
                    max_players,
                    round_duration_secs,
                    password,
                ) {
                    Ok(room_id) => ServerEvent::RoomCreated { room_id },
                    Err(api_error) => reject(api_error),
                };
                let _ = session.send(event);
                None
            }
            ClientMessage::Join {
                room_id,
                user_id,
                user_name,
                avatar,
                password,
            } => {
                match presence::join(
                    self,
                    &room_id,
                    user_id,
                    user_name,
                    avatar,
                    password,
                    session.clone(),
                ) {
                    Ok(joined_user_id) => Some(joined_user_id),
                    Err(api_error) => {
                        let _ = session.send(reject(api_error));
                        None
                    }
                }
            }
            ClientMessage::Leave { room_id, user_id } => {
                if let Err(api_error) = presence::leave(self, &room_id, &user_id) {
                    self.sessions.send_to_user(&user_id, reject(api_error));
                }
                None
            }
            ClientMessage::ToggleReady {
                room_id,
                user_id,
                ready,
            } => {
                if let Err(api_error) = presence::toggle_ready(self, &room_id, &user_id, ready) {
                    self.sessions.send_to_user(&user_id, reject(api_error));
                }
                None
            }
            ClientMessage::StartGame { room_id, user_id } => {
                if let Err(api_error) = lifecycle::start_game(self, &room_id, &user_id).await {
                    self.sessions.send_to_user(&user_id, reject(api_error));
                }
                None
            }
            ClientMessage::SubmitNumber {
                room_id,
                user_id,
                number,
            } => {
                if let Err(api_error) = lifecycle::submit_number(self, &room_id, &user_id, number) {
                    tracing::warn!(?api_error, user_id, "submission rejected");
                    self.sessions.send_to_user(
                        &user_id,
                        ServerEvent::SubmissionError {
                            message: api_error.to_string(),
                        },
                    );
                }
                None
            }
            ClientMessage::SendMessage {
                room_id,
                user_id,
                text,
            } => {
                if let Err(api_error) = presence::chat(self, &room_id, &user_id, &text) {
                    self.sessions.send_to_user(&user_id, reject(api_error));
                }
                None
            }
        }
    }

    pub fn handle_disconnect(&self, user_id: &str) {
        presence::handle_disconnect(self, user_id);
    }
}

fn reject(api_error: ApiError) -> ServerEvent {
    tracing::warn!(?api_error);
    ServerEvent::Error {
        message: api_error.to_string(),
    }
}
