use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;

use crate::app::{
    server::{
        engine::{
            registry::RoomRegistry,
            room::{Phase, Player},
        },
        errors::ApiError,
        events::ServerEvent,
        outbox::PersistJob,
        service::GameServer,
        storage::models,
    },
    utils,
};

/// Join or rejoin a room. A rejoin keeps score and elimination state, only
/// the connection changes. Registers the session channel and replies with
/// the full room snapshot.
pub fn join(
    server: &GameServer,
    room_id: &str,
    user_id: Option<String>,
    user_name: Option<String>,
    avatar: Option<String>,
    password: Option<String>,
    session: UnboundedSender<ServerEvent>,
) -> Result<String, ApiError> {
    let mut rooms = server.rooms.lock().unwrap();
    let room = rooms.get_mut(room_id).ok_or_else(|| ApiError::RoomNotFound {
        room_id: room_id.to_string(),
    })?;

    if let Some(existing_id) = user_id.clone() {
        if let Some(player) = room.find_player_mut(&existing_id) {
            player.connected = true;
            player.disconnected_at = None;
            room.touch();

            server.sessions.insert_channel(&existing_id, session);
            server.sessions.broadcast_room(
                room,
                &ServerEvent::PlayerReconnected {
                    user_id: existing_id.clone(),
                },
            );
            server.sessions.send_to_user(
                &existing_id,
                ServerEvent::RoomState {
                    room: room.snapshot(),
                },
            );
            server.persist.enqueue(PersistJob::TouchLobby {
                room_id: room.room_id.clone(),
            });

            return Ok(existing_id);
        }
    }

    if room.phase != Phase::Waiting {
        return Err(ApiError::bad_request("Game is already in progress"));
    }
    if let Some(expected) = &room.password {
        if password.as_deref() != Some(expected.as_str()) {
            return Err(ApiError::WrongPassword);
        }
    }
    if room.players.len() >= usize::from(room.max_players) {
        return Err(ApiError::RoomFull {
            room_id: room.room_id.clone(),
        });
    }

    let user_id = user_id.unwrap_or_else(|| utils::generate_time_ordered_id("guest"));
    let user_name = user_name.unwrap_or_else(utils::generate_name);

    let player = Player::new(user_id.clone(), user_name, avatar);
    let player_view = player.view();
    room.players.push(player);
    room.touch();

    server.sessions.insert_channel(&user_id, session);
    server
        .sessions
        .broadcast_room(room, &ServerEvent::PlayerJoined {
            player: player_view,
        });
    server.sessions.send_to_user(
        &user_id,
        ServerEvent::RoomState {
            room: room.snapshot(),
        },
    );

    server.persist.enqueue(PersistJob::SetLobbyPlayers {
        room_id: room.room_id.clone(),
        user_ids: room
            .players
            .iter()
            .map(|player| player.user_id.clone())
            .collect(),
    });

    Ok(user_id)
}

pub fn leave(server: &GameServer, room_id: &str, user_id: &str) -> Result<(), ApiError> {
    let mut rooms = server.rooms.lock().unwrap();

    let room = rooms.get(room_id).ok_or_else(|| ApiError::RoomNotFound {
        room_id: room_id.to_string(),
    })?;
    if room.find_player(user_id).is_none() {
        return Err(ApiError::PlayerNotFound {
            user_id: user_id.to_string(),
        });
    }

    depart(server, &mut rooms, room_id, user_id);
    Ok(())
}

/// Socket dropped without a leave message. Applies the same per-phase
/// semantics to every room the user is part of.
pub fn handle_disconnect(server: &GameServer, user_id: &str) {
    let mut rooms = server.rooms.lock().unwrap();

    let room_ids: Vec<String> = rooms
        .iter_mut()
        .filter(|room| room.find_player(user_id).is_some())
        .map(|room| room.room_id.clone())
        .collect();

    for room_id in room_ids {
        depart(server, &mut rooms, &room_id, user_id);
    }

    server.sessions.remove_channel(user_id);
}

/// Per-phase departure. During an active game the player is marked
/// disconnected and retained so their standing survives a reconnect, the
/// countdown keeps running. Before and after the game they are removed.
fn depart(server: &GameServer, rooms: &mut RoomRegistry, room_id: &str, user_id: &str) {
    let delete_room = {
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };

        if room.phase.is_active_game() {
            if let Some(player) = room.find_player_mut(user_id) {
                player.connected = false;
                player.disconnected_at = Some(Instant::now());
            }
            room.touch();
            server.sessions.remove_channel(user_id);
            server.sessions.broadcast_room(
                room,
                &ServerEvent::PlayerDisconnected {
                    user_id: user_id.to_string(),
                },
            );
            return;
        }

        room.players.retain(|player| player.user_id != user_id);
        room.touch();
        server.sessions.remove_channel(user_id);

        if room.phase == Phase::Waiting && room.players.is_empty() {
            true
        } else {
            let mut host_changed = false;
            if room.phase == Phase::Waiting && room.host_id == user_id {
                if let Some(next_host) = room.players.first() {
                    room.host_id = next_host.user_id.clone();
                    host_changed = true;
                    tracing::info!(room_id, new_host = %room.host_id, "host left, reassigned");
                }
            }

            server.sessions.broadcast_room(
                room,
                &ServerEvent::PlayerLeft {
                    user_id: user_id.to_string(),
                },
            );
            if host_changed {
                server.sessions.broadcast_room(
                    room,
                    &ServerEvent::RoomState {
                        room: room.snapshot(),
                    },
                );
            }
            server.persist.enqueue(PersistJob::SetLobbyPlayers {
                room_id: room.room_id.clone(),
                user_ids: room
                    .players
                    .iter()
                    .map(|player| player.user_id.clone())
                    .collect(),
            });
            false
        }
    };

    if delete_room {
        rooms.delete_room(room_id);
        server.persist.enqueue(PersistJob::SetLobbyStatus {
            room_id: room_id.to_string(),
            status: models::LobbyStatus::Finished,
            game_id: None,
        });
        tracing::info!(room_id, "deleted empty waiting room");
    }
}

pub fn toggle_ready(
    server: &GameServer,
    room_id: &str,
    user_id: &str,
    ready: bool,
) -> Result<(), ApiError> {
    let mut rooms = server.rooms.lock().unwrap();
    let room = rooms.get_mut(room_id).ok_or_else(|| ApiError::RoomNotFound {
        room_id: room_id.to_string(),
    })?;

    if room.phase != Phase::Waiting {
        return Err(ApiError::bad_request(
            "Readiness only matters before the game starts",
        ));
    }

    let player = room
        .find_player_mut(user_id)
        .ok_or_else(|| ApiError::PlayerNotFound {
            user_id: user_id.to_string(),
        })?;
    player.ready = ready;
    room.touch();

    server.sessions.broadcast_room(
        room,
        &ServerEvent::ReadyChanged {
            user_id: user_id.to_string(),
            ready,
        },
    );
    server.persist.enqueue(PersistJob::TouchLobby {
        room_id: room.room_id.clone(),
    });

    Ok(())
}

/// Chat relay, no game state effect beyond the activity timestamp.
pub fn chat(server: &GameServer, room_id: &str, user_id: &str, text: &str) -> Result<(), ApiError> {
    let mut rooms = server.rooms.lock().unwrap();
    let room = rooms.get_mut(room_id).ok_or_else(|| ApiError::RoomNotFound {
        room_id: room_id.to_string(),
    })?;

    let user_name = room
        .find_player(user_id)
        .ok_or_else(|| ApiError::PlayerNotFound {
            user_id: user_id.to_string(),
        })?
        .user_name
        .clone();
    room.touch();

    server.sessions.broadcast_room(
        room,
        &ServerEvent::Chat {
            user_id: user_id.to_string(),
            user_name,
            text: text.to_string(),
        },
    );

    Ok(())
}
