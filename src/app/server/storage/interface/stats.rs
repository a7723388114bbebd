use std::collections::HashMap;

use crate::app::server::storage::{models, StorageResult, Store};

fn stats_key(user_id: &str) -> String {
    format!("stats_{user_id}")
}

#[allow(async_fn_in_trait)]
pub trait StatsInterface {
    async fn increment_user_stats(
        &self,
        user_id: &str,
        delta: models::StatsDelta,
    ) -> StorageResult<()>;
    async fn find_user_stats(&self, user_id: &str) -> StorageResult<HashMap<String, i64>>;
}

impl StatsInterface for Store {
    async fn increment_user_stats(
        &self,
        user_id: &str,
        delta: models::StatsDelta,
    ) -> StorageResult<()> {
        self.redis_client
            .increment_hash_fields(stats_key(user_id), &delta.as_fields())
            .await
    }

    async fn find_user_stats(&self, user_id: &str) -> StorageResult<HashMap<String, i64>> {
        self.redis_client.get_hash_counters(stats_key(user_id)).await
    }
}
