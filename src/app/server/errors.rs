pub use crate::app::errors::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Room {room_id} was not found")]
    RoomNotFound { room_id: String },
    #[error("Player {user_id} is not in this room")]
    PlayerNotFound { user_id: String },
    #[error("Room {room_id} is full")]
    RoomFull { room_id: String },
    #[error("Incorrect room password")]
    WrongPassword,
    #[error("Only the host can do that")]
    NotHost,
    #[error("{message}")]
    BadRequest { message: String },
    #[error("Something went wrong")]
    InternalServerError,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }
}

/// Lift database results into api errors at the call site.
pub trait ResultExtApp<T> {
    fn to_not_found(self, error: ApiError) -> Result<T, ApiError>;
    fn to_duplicate(self, error: ApiError) -> Result<T, ApiError>;
    fn to_internal_api_error(self) -> Result<T, ApiError>;
}

impl<T> ResultExtApp<T> for Result<T, DbError> {
    fn to_not_found(self, error: ApiError) -> Result<T, ApiError> {
        self.map_err(|db_error| {
            if db_error.is_not_found() {
                error
            } else {
                log::error!("db_error={db_error:?}");
                ApiError::InternalServerError
            }
        })
    }

    fn to_duplicate(self, error: ApiError) -> Result<T, ApiError> {
        self.map_err(|db_error| match db_error {
            DbError::DuplicateValue => error,
            other => {
                log::error!("db_error={other:?}");
                ApiError::InternalServerError
            }
        })
    }

    fn to_internal_api_error(self) -> Result<T, ApiError> {
        self.map_err(|db_error| {
            log::error!("db_error={db_error:?}");
            ApiError::InternalServerError
        })
    }
}
