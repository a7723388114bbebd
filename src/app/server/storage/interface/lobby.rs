use crate::app::{
    server::storage::{models, StorageResult, Store},
    utils,
};

const LOBBY_INDEX_KEY: &str = "lobby_index";

fn lobby_key(room_id: &str) -> String {
    format!("lobby_{room_id}")
}

/// Read-only row for the operational activity listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LobbyActivity {
    pub room_id: String,
    pub status: models::LobbyStatus,
    pub player_count: usize,
    pub idle_ms: u64,
}

#[allow(async_fn_in_trait)]
pub trait LobbyInterface {
    async fn insert_lobby(&self, lobby: models::LobbyRecord)
        -> StorageResult<models::LobbyRecord>;
    async fn find_lobby(&self, room_id: &str) -> StorageResult<models::LobbyRecord>;
    async fn update_lobby(&self, lobby: models::LobbyRecord)
        -> StorageResult<models::LobbyRecord>;
    async fn list_lobbies(&self) -> StorageResult<Vec<models::LobbyRecord>>;
    /// Close every waiting lobby idle past the threshold. Idempotent, a
    /// second sweep finds nothing left to close.
    async fn close_stale_lobbies(&self, idle_threshold_ms: u64) -> StorageResult<usize>;
    async fn list_lobby_activity(&self) -> StorageResult<Vec<LobbyActivity>>;
}

impl LobbyInterface for Store {
    async fn insert_lobby(
        &self,
        lobby: models::LobbyRecord,
    ) -> StorageResult<models::LobbyRecord> {
        let mut index = match self
            .redis_client
            .get_and_deserialize::<_, Vec<String>>(LOBBY_INDEX_KEY)
            .await
        {
            Ok(index) => index,
            Err(error) if error.is_not_found() => Vec::new(),
            Err(error) => return Err(error),
        };

        if !index.contains(&lobby.room_id) {
            index.push(lobby.room_id.clone());
            self.redis_client
                .serialize_and_set(LOBBY_INDEX_KEY, index)
                .await?;
        }

        let key = lobby_key(&lobby.room_id);
        self.redis_client.serialize_and_set(key, lobby).await
    }

    async fn find_lobby(&self, room_id: &str) -> StorageResult<models::LobbyRecord> {
        self.redis_client.get_and_deserialize(lobby_key(room_id)).await
    }

    async fn update_lobby(
        &self,
        lobby: models::LobbyRecord,
    ) -> StorageResult<models::LobbyRecord> {
        let key = lobby_key(&lobby.room_id);
        self.redis_client.serialize_and_set(key, lobby).await
    }

    async fn list_lobbies(&self) -> StorageResult<Vec<models::LobbyRecord>> {
        let index = match self
            .redis_client
            .get_and_deserialize::<_, Vec<String>>(LOBBY_INDEX_KEY)
            .await
        {
            Ok(index) => index,
            Err(error) if error.is_not_found() => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };

        if index.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = index.iter().map(|room_id| lobby_key(room_id)).collect();
        self.redis_client.get_multiple_keys(keys).await
    }

    async fn close_stale_lobbies(&self, idle_threshold_ms: u64) -> StorageResult<usize> {
        let now = utils::epoch_ms();
        let lobbies = self.list_lobbies().await?;

        let mut closed = 0;
        for mut lobby in lobbies {
            let idle = now.saturating_sub(lobby.last_activity_ms);
            if lobby.status == models::LobbyStatus::Waiting && idle >= idle_threshold_ms {
                lobby.close();
                self.update_lobby(lobby).await?;
                closed += 1;
            }
        }

        Ok(closed)
    }

    async fn list_lobby_activity(&self) -> StorageResult<Vec<LobbyActivity>> {
        let now = utils::epoch_ms();
        let lobbies = self.list_lobbies().await?;

        Ok(lobbies
            .into_iter()
            .map(|lobby| LobbyActivity {
                idle_ms: now.saturating_sub(lobby.last_activity_ms),
                player_count: lobby.pending_user_ids.len(),
                room_id: lobby.room_id,
                status: lobby.status,
            })
            .collect())
    }
}
