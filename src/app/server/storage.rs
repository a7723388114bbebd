use crate::app::server::{
    errors::DbError, redis_client::RedisClient, storage::interface::StorageInterface,
};

pub mod interface;
pub mod models;

/// A store that holds the storage clients for durable records
#[derive(Clone)]
pub struct Store {
    pub redis_client: RedisClient,
}

impl Store {
    pub fn new(redis_client: RedisClient) -> Self {
        Self { redis_client }
    }
}

impl StorageInterface for Store {}

type StorageResult<T> = Result<T, DbError>;
