use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::app::server::engine::room::{Phase, Room};

/// Owns every live room. The ceiling is a soft guard, when it is hit the
/// registry evicts idle waiting rooms and then creates regardless of
/// whether enough space was freed.
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    max_rooms: usize,
    eviction_idle: Duration,
}

impl RoomRegistry {
    pub fn new(max_rooms: usize, eviction_idle: Duration) -> Self {
        Self {
            rooms: HashMap::new(),
            max_rooms,
            eviction_idle,
        }
    }

    pub fn insert_room(&mut self, room: Room) {
        if self.rooms.len() >= self.max_rooms {
            self.evict_idle_rooms();
        }
        self.rooms.insert(room.room_id.clone(), room);
    }

    /// Drop the least recently active waiting rooms that have been idle past
    /// the threshold, until the registry is below 80% of the ceiling or no
    /// candidates remain. Returns the number of rooms dropped.
    pub fn evict_idle_rooms(&mut self) -> usize {
        let target = (self.max_rooms * 4) / 5;
        let now = Instant::now();

        let mut candidates: Vec<(String, Instant)> = self
            .rooms
            .values()
            .filter(|room| {
                room.phase == Phase::Waiting
                    && now.duration_since(room.last_activity) >= self.eviction_idle
            })
            .map(|room| (room.room_id.clone(), room.last_activity))
            .collect();
        candidates.sort_by_key(|(_, last_activity)| *last_activity);

        let mut evicted = 0;
        for (room_id, _) in candidates {
            if self.rooms.len() < target {
                break;
            }
            tracing::warn!(room_id, "evicting idle waiting room at capacity");
            self.rooms.remove(&room_id);
            evicted += 1;
        }
        evicted
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// Idempotent. Dropping the room aborts its timer.
    pub fn delete_room(&mut self, room_id: &str) -> Option<Room> {
        self.rooms.remove(room_id)
    }

    pub fn active_room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Room> {
        self.rooms.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiting_room(room_id: &str) -> Room {
        Room::new(
            room_id.to_string(),
            format!("room {room_id}"),
            "user_host".to_string(),
            8,
            60,
            None,
        )
    }

    #[test]
    fn eviction_frees_idle_waiting_rooms_at_the_ceiling() {
        let mut registry = RoomRegistry::new(5, Duration::ZERO);
        for index in 0..5 {
            registry.insert_room(waiting_room(&format!("10000{index}")));
        }
        assert_eq!(registry.active_room_count(), 5);

        registry.insert_room(waiting_room("200000"));

        // evicted down to below 80% of the ceiling, then inserted
        assert_eq!(registry.active_room_count(), 4);
        assert!(registry.contains("200000"));
    }

    #[test]
    fn active_rooms_are_never_evicted() {
        let mut registry = RoomRegistry::new(2, Duration::ZERO);

        let mut playing = waiting_room("100001");
        playing.phase = Phase::Submission;
        registry.insert_room(playing);
        registry.insert_room(waiting_room("100002"));

        registry.insert_room(waiting_room("100003"));

        // the waiting room went, the active one stayed, and creation still
        // proceeded past the ceiling
        assert!(registry.contains("100001"));
        assert!(registry.contains("100003"));
        assert_eq!(registry.active_room_count(), 2);
    }

    #[test]
    fn delete_room_is_idempotent() {
        let mut registry = RoomRegistry::new(5, Duration::from_secs(600));
        registry.insert_room(waiting_room("100001"));

        assert!(registry.delete_room("100001").is_some());
        assert!(registry.delete_room("100001").is_none());
        assert_eq!(registry.active_room_count(), 0);
    }
}
