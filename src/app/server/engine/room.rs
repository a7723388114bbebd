use std::time::Instant;

use tokio::task::JoinHandle;

use crate::app::server::{
    engine::rules::Submission,
    events::{PlayerView, RoomSnapshot},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Submission,
    Reveal,
    Scoring,
    Finished,
}

impl Phase {
    /// Phases in which a disconnect marks the player instead of removing
    /// them.
    pub fn is_active_game(&self) -> bool {
        matches!(self, Phase::Submission | Phase::Reveal | Phase::Scoring)
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub user_id: String,
    pub user_name: String,
    pub avatar: Option<String>,
    pub score: i32,
    pub eliminated: bool,
    pub eliminated_round: Option<u32>,
    pub has_submitted: bool,
    pub current_choice: Option<u8>,
    pub ready: bool,
    pub connected: bool,
    pub disconnected_at: Option<Instant>,
}

impl Player {
    pub fn new(user_id: String, user_name: String, avatar: Option<String>) -> Self {
        Self {
            user_id,
            user_name,
            avatar,
            score: 0,
            eliminated: false,
            eliminated_round: None,
            has_submitted: false,
            current_choice: None,
            ready: false,
            connected: true,
            disconnected_at: None,
        }
    }

    /// Guest identifiers are session scoped and excluded from lifetime
    /// statistics.
    pub fn is_guest(&self) -> bool {
        self.user_id.starts_with("guest_")
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            avatar: self.avatar.clone(),
            score: self.score,
            eliminated: self.eliminated,
            has_submitted: self.has_submitted,
            ready: self.ready,
            connected: self.connected,
        }
    }
}

/// Result of a processed round, held between the reveal and scoring phases.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub round_id: String,
    pub submissions: Vec<Submission>,
    pub average: f64,
    pub winning_number: f64,
    pub winner_id: String,
    pub exact_match: bool,
}

pub struct Room {
    pub room_id: String,
    pub name: String,
    pub host_id: String,
    pub game_id: Option<String>,
    pub players: Vec<Player>,
    pub round: u32,
    pub phase: Phase,
    pub active_rules: Vec<u8>,
    pub elimination_count: u32,
    pub max_players: u8,
    pub password: Option<String>,
    pub round_duration_secs: u64,
    pub time_remaining: u64,
    pub current_round_id: Option<String>,
    pub pending_round: Option<RoundOutcome>,
    pub created_at: Instant,
    pub last_activity: Instant,
    timer: Option<JoinHandle<()>>,
}

impl Room {
    pub fn new(
        room_id: String,
        name: String,
        host_id: String,
        max_players: u8,
        round_duration_secs: u64,
        password: Option<String>,
    ) -> Self {
        Self {
            room_id,
            name,
            host_id,
            game_id: None,
            players: Vec::new(),
            round: 1,
            phase: Phase::Waiting,
            active_rules: Vec::new(),
            elimination_count: 0,
            max_players,
            password,
            round_duration_secs,
            time_remaining: round_duration_secs,
            current_round_id: None,
            pending_round: None,
            created_at: Instant::now(),
            last_activity: Instant::now(),
            timer: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn find_player(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.user_id == user_id)
    }

    pub fn find_player_mut(&mut self, user_id: &str) -> Option<&mut Player> {
        self.players
            .iter_mut()
            .find(|player| player.user_id == user_id)
    }

    /// Install a new timer task, aborting whichever one was running. Every
    /// countdown or phase delay goes through here so a room never has two
    /// timers alive.
    pub fn replace_timer(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.timer.replace(handle) {
            previous.abort();
        }
    }

    pub fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    /// Choices locked in so far this round, used for rule 1 validation.
    pub fn locked_submissions(&self) -> Vec<Submission> {
        self.players
            .iter()
            .filter(|player| !player.eliminated && player.has_submitted)
            .filter_map(|player| {
                player.current_choice.map(|choice| Submission {
                    user_id: player.user_id.clone(),
                    choice,
                })
            })
            .collect()
    }

    /// Submissions that count for round processing, from players still
    /// connected and in the game.
    pub fn collect_submissions(&self) -> Vec<Submission> {
        self.players
            .iter()
            .filter(|player| player.connected && !player.eliminated && player.has_submitted)
            .filter_map(|player| {
                player.current_choice.map(|choice| Submission {
                    user_id: player.user_id.clone(),
                    choice,
                })
            })
            .collect()
    }

    pub fn connected_active_count(&self) -> usize {
        self.players
            .iter()
            .filter(|player| player.connected && !player.eliminated)
            .count()
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            name: self.name.clone(),
            host_id: self.host_id.clone(),
            round: self.round,
            phase: self.phase,
            active_rules: self.active_rules.clone(),
            time_remaining: self.time_remaining,
            round_duration_secs: self.round_duration_secs,
            max_players: self.max_players,
            players: self.players.iter().map(Player::view).collect(),
        }
    }
}

impl Drop for Room {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_room() -> Room {
        Room::new(
            "482913".to_string(),
            "test room".to_string(),
            "user_host".to_string(),
            8,
            60,
            None,
        )
    }

    #[tokio::test]
    async fn replacing_the_timer_aborts_the_previous_task() {
        let mut room = test_room();

        let first = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        room.replace_timer(first);

        let second = tokio::spawn(async {});
        room.replace_timer(second);

        // give the runtime a chance to observe the abort
        tokio::task::yield_now().await;

        room.cancel_timer();
    }

    #[test]
    fn snapshot_reports_explicit_booleans() {
        let mut room = test_room();
        room.players.push(Player::new(
            "guest_abc".to_string(),
            "Visitor".to_string(),
            None,
        ));

        let snapshot = room.snapshot();
        let player = &snapshot.players[0];
        assert!(player.connected);
        assert!(!player.ready);
        assert!(!player.eliminated);
        assert!(!player.has_submitted);
    }

    #[test]
    fn guest_ids_are_detected_by_prefix() {
        let guest = Player::new("guest_123".to_string(), "Visitor".to_string(), None);
        let account = Player::new("user_123".to_string(), "Alice".to_string(), None);
        assert!(guest.is_guest());
        assert!(!account.is_guest());
    }

    #[test]
    fn locked_submissions_skip_eliminated_players() {
        let mut room = test_room();

        let mut alive = Player::new("user_1".to_string(), "Alice".to_string(), None);
        alive.has_submitted = true;
        alive.current_choice = Some(40);
        room.players.push(alive);

        let mut out = Player::new("user_2".to_string(), "Bob".to_string(), None);
        out.eliminated = true;
        out.has_submitted = true;
        out.current_choice = Some(40);
        room.players.push(out);

        let locked = room.locked_submissions();
        assert_eq!(locked.len(), 1);
        assert_eq!(locked[0].user_id, "user_1");
    }
}
