use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::mpsc::UnboundedSender;

use crate::app::server::{engine::room::Room, events::ServerEvent};

type SessionChannel = UnboundedSender<ServerEvent>;

/// The live connections to this instance of the application, keyed by user.
///
/// Channels can be inserted and removed for the same user based on the
/// current interaction. Senders are unbounded so events can be pushed from
/// inside a locked section without awaiting.
#[derive(Clone, Default)]
pub struct Sessions {
    channels: Arc<Mutex<HashMap<String, SessionChannel>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_channel(&self, user_id: &str, channel: SessionChannel) {
        let mut connected_users = self.channels.lock().unwrap();
        connected_users.insert(user_id.to_string(), channel);
    }

    pub fn remove_channel(&self, user_id: &str) {
        let mut connected_users = self.channels.lock().unwrap();
        connected_users.remove(user_id);
    }

    /// Send to one connection. A missing or closed channel is not an error,
    /// the player has simply gone away.
    pub fn send_to_user(&self, user_id: &str, event: ServerEvent) {
        let connected_users = self.channels.lock().unwrap();
        if let Some(channel) = connected_users.get(user_id) {
            if channel.send(event).is_err() {
                log::debug!("dropping event for closed session user_id={user_id}");
            }
        }
    }

    /// Push an event to every connected player of the room.
    pub fn broadcast_room(&self, room: &Room, event: &ServerEvent) {
        let connected_users = self.channels.lock().unwrap();
        for player in room.players.iter().filter(|player| player.connected) {
            if let Some(channel) = connected_users.get(&player.user_id) {
                if channel.send(event.clone()).is_err() {
                    log::debug!(
                        "dropping event for closed session user_id={}",
                        player.user_id
                    );
                }
            }
        }
    }
}
