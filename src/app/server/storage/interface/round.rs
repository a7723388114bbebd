use crate::app::server::storage::{models, StorageResult, Store};

#[allow(async_fn_in_trait)]
pub trait RoundInterface {
    async fn insert_round(&self, round: models::RoundRecord)
        -> StorageResult<models::RoundRecord>;
    async fn find_round(&self, round_id: &str) -> StorageResult<models::RoundRecord>;
    async fn update_round(&self, round: models::RoundRecord)
        -> StorageResult<models::RoundRecord>;
    async fn insert_choice(
        &self,
        choice: models::ChoiceRecord,
    ) -> StorageResult<models::ChoiceRecord>;
}

impl RoundInterface for Store {
    async fn insert_round(
        &self,
        round: models::RoundRecord,
    ) -> StorageResult<models::RoundRecord> {
        let round_id = round.round_id.clone();
        self.redis_client.serialize_and_set(round_id, round).await
    }

    async fn find_round(&self, round_id: &str) -> StorageResult<models::RoundRecord> {
        self.redis_client.get_and_deserialize(round_id).await
    }

    async fn update_round(
        &self,
        round: models::RoundRecord,
    ) -> StorageResult<models::RoundRecord> {
        let round_id = round.round_id.clone();
        self.redis_client.serialize_and_set(round_id, round).await
    }

    async fn insert_choice(
        &self,
        choice: models::ChoiceRecord,
    ) -> StorageResult<models::ChoiceRecord> {
        let choice_id = choice.choice_id.clone();
        self.redis_client.serialize_and_set(choice_id, choice).await
    }
}
