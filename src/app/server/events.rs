//! Inbound and outbound message shapes for the realtime channel. Field
//! names follow the client's camelCase convention.

use crate::app::server::engine::room::Phase;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateRoom {
        name: String,
        user_id: String,
        max_players: u8,
        round_duration_secs: u64,
        password: Option<String>,
    },
    Join {
        room_id: String,
        user_id: Option<String>,
        user_name: Option<String>,
        avatar: Option<String>,
        password: Option<String>,
    },
    Leave {
        room_id: String,
        user_id: String,
    },
    ToggleReady {
        room_id: String,
        user_id: String,
        ready: bool,
    },
    StartGame {
        room_id: String,
        user_id: String,
    },
    SubmitNumber {
        room_id: String,
        user_id: String,
        number: i64,
    },
    SendMessage {
        room_id: String,
        user_id: String,
        text: String,
    },
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub user_id: String,
    pub user_name: String,
    pub avatar: Option<String>,
    pub score: i32,
    pub eliminated: bool,
    pub has_submitted: bool,
    pub ready: bool,
    pub connected: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: String,
    pub name: String,
    pub host_id: String,
    pub round: u32,
    pub phase: Phase,
    pub active_rules: Vec<u8>,
    pub time_remaining: u64,
    pub round_duration_secs: u64,
    pub max_players: u8,
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceView {
    pub user_id: String,
    pub user_name: String,
    pub choice: u8,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDelta {
    pub user_id: String,
    pub delta: i32,
    pub score: i32,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    RoomCreated {
        room_id: String,
    },
    RoomState {
        room: RoomSnapshot,
    },
    PlayerJoined {
        player: PlayerView,
    },
    PlayerLeft {
        user_id: String,
    },
    PlayerDisconnected {
        user_id: String,
    },
    PlayerReconnected {
        user_id: String,
    },
    ReadyChanged {
        user_id: String,
        ready: bool,
    },
    GameStarting {
        game_id: String,
    },
    RoundStart {
        round: u32,
        rules: Vec<u8>,
        duration: u64,
        players: Vec<PlayerView>,
    },
    TimerUpdate {
        remaining: u64,
    },
    PlayerSubmitted {
        user_id: String,
        user_name: String,
    },
    SubmissionConfirmed {
        number: u8,
    },
    SubmissionError {
        message: String,
    },
    RoundReveal {
        round: u32,
        choices: Vec<ChoiceView>,
        average: f64,
        winning_number: f64,
        winner_id: String,
    },
    RoundScored {
        deltas: Vec<ScoreDelta>,
        eliminated: Vec<String>,
        unlocked_rules: Vec<u8>,
    },
    GameOver {
        standings: Vec<PlayerView>,
        winner_id: Option<String>,
    },
    Chat {
        user_id: String,
        user_name: String,
        text: String,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let raw = r#"{"type":"submit_number","roomId":"482913","userId":"user_1","number":42}"#;
        let message: ClientMessage = serde_json::from_str(raw).unwrap();
        match message {
            ClientMessage::SubmitNumber {
                room_id,
                user_id,
                number,
            } => {
                assert_eq!(room_id, "482913");
                assert_eq!(user_id, "user_1");
                assert_eq!(number, 42);
            }
            other => panic!("parsed into {other:?}"),
        }
    }

    #[test]
    fn server_events_serialize_with_camel_case_fields() {
        let event = ServerEvent::TimerUpdate { remaining: 30 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "timer_update");
        assert_eq!(json["remaining"], 30);

        let event = ServerEvent::RoundReveal {
            round: 2,
            choices: vec![],
            average: 20.0,
            winning_number: 16.0,
            winner_id: "user_1".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["winningNumber"], 16.0);
        assert_eq!(json["winnerId"], "user_1");
    }
}
