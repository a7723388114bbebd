use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("The requested resource was not found")]
    NotFound,
    #[error("The value already exists")]
    DuplicateValue,
    #[error("Failed to parse value")]
    ParsingFailure,
    #[error("Unknown Database error")]
    Others(#[from] fred::error::RedisError),
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound)
    }
}
