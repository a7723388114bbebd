#[derive(serde::Deserialize)]
pub struct ServerConfig {
    pub server: Option<Server>,
    pub redis: Option<RedisConfig>,
    pub game: Option<GameConfig>,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Server {
    pub host: String,
    pub port: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: "6969".to_string(),
        }
    }
}

#[derive(serde::Deserialize, Debug)]
pub struct RedisConfig {
    pub username: Option<String>,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

/// Deault impl to connect to redis running locally
impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            username: None,
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
        }
    }
}

/// Tunables for room and round pacing
#[derive(serde::Deserialize, Debug, Clone)]
pub struct GameConfig {
    pub max_rooms: usize,
    pub eviction_idle_secs: u64,
    pub stale_lobby_secs: u64,
    pub reaper_interval_secs: u64,
    pub all_submitted_delay_ms: u64,
    pub reveal_delay_ms: u64,
    pub next_round_delay_ms: u64,
    pub game_over_delay_ms: u64,
    pub room_close_delay_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_rooms: 50,
            eviction_idle_secs: 600,
            stale_lobby_secs: 900,
            reaper_interval_secs: 180,
            all_submitted_delay_ms: 1000,
            reveal_delay_ms: 5000,
            next_round_delay_ms: 5000,
            game_over_delay_ms: 3000,
            room_close_delay_ms: 120_000,
        }
    }
}
