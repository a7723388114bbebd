use std::collections::HashMap;

use crate::app::utils;

#[derive(serde::Deserialize, serde::Serialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LobbyStatus {
    Waiting,
    Playing,
    Finished,
}

/// Durable shadow of a room. The in-memory room stays authoritative while
/// a game is live, this record exists for lobby listings and the reaper.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
pub struct LobbyRecord {
    pub room_id: String,
    pub name: String,
    pub host_id: String,
    pub max_players: u8,
    pub round_duration_secs: u64,
    pub has_password: bool,
    pub status: LobbyStatus,
    pub game_id: Option<String>,
    pub pending_user_ids: Vec<String>,
    pub created_at_ms: u64,
    pub last_activity_ms: u64,
}

impl LobbyRecord {
    pub fn new(
        room_id: String,
        name: String,
        host_id: String,
        max_players: u8,
        round_duration_secs: u64,
        has_password: bool,
    ) -> Self {
        let now = utils::epoch_ms();
        Self {
            room_id,
            name,
            host_id,
            max_players,
            round_duration_secs,
            has_password,
            status: LobbyStatus::Waiting,
            game_id: None,
            pending_user_ids: Vec::new(),
            created_at_ms: now,
            last_activity_ms: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity_ms = utils::epoch_ms();
    }

    /// Close out a stale lobby, dropping its pending player associations.
    pub fn close(&mut self) {
        self.status = LobbyStatus::Finished;
        self.pending_user_ids.clear();
        self.game_id = None;
    }
}

#[derive(serde::Deserialize, serde::Serialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Init,
    InProgress,
    End,
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
pub struct GameRecord {
    pub game_id: String,
    pub room_id: String,
    pub user_ids: Vec<String>,
    pub game_status: GameStatus,
    pub winner_id: Option<String>,
    pub rounds_played: u32,
    pub final_scores: HashMap<String, i32>,
}

impl GameRecord {
    pub fn new(room_id: String, user_ids: Vec<String>) -> Self {
        let game_id = utils::generate_time_ordered_id("game");

        Self {
            game_id,
            room_id,
            user_ids,
            game_status: GameStatus::Init,
            winner_id: None,
            rounds_played: 0,
            final_scores: HashMap::new(),
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
pub struct RoundRecord {
    pub round_id: String,
    pub game_id: String,
    pub round_number: u32,
    pub average: f64,
    pub winning_number: f64,
    pub winner_id: Option<String>,
    pub eliminated_user_ids: Vec<String>,
    pub completed: bool,
}

impl RoundRecord {
    pub fn new(game_id: String, round_number: u32) -> Self {
        let round_id = utils::generate_time_ordered_id("round");

        Self {
            round_id,
            game_id,
            round_number,
            average: 0.0,
            winning_number: 0.0,
            winner_id: None,
            eliminated_user_ids: Vec::new(),
            completed: false,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
pub struct ChoiceRecord {
    pub choice_id: String,
    pub round_id: String,
    pub user_id: String,
    pub choice: u8,
    pub submitted_at_ms: u64,
}

impl ChoiceRecord {
    pub fn new(round_id: String, user_id: String, choice: u8) -> Self {
        let choice_id = utils::generate_time_ordered_id("choice");

        Self {
            choice_id,
            round_id,
            user_id,
            choice,
            submitted_at_ms: utils::epoch_ms(),
        }
    }
}

/// Increments applied to a user's lifetime counters at game end.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatsDelta {
    pub games_played: i64,
    pub games_won: i64,
    pub rounds_played: i64,
    pub rounds_survived: i64,
}

impl StatsDelta {
    pub fn as_fields(&self) -> Vec<(&'static str, i64)> {
        vec![
            ("games_played", self.games_played),
            ("games_won", self.games_won),
            ("rounds_played", self.rounds_played),
            ("rounds_survived", self.rounds_survived),
        ]
    }
}
