/// Error types for the social graph service
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("operation targets its own user")]
    SelfReference,

    #[error("a block exists between the two users")]
    Blocked,

    #[error("target profile does not accept new followers")]
    PrivacyDenied,

    #[error("not following this user")]
    NotFollowing,

    #[error("user is not blocked")]
    NotBlocked,

    #[error("no profile for user {0}")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GraphError {
    /// HTTP status the outward handler layer maps this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            GraphError::SelfReference => 400,
            GraphError::Blocked => 403,
            GraphError::PrivacyDenied => 403,
            GraphError::NotFollowing => 400,
            GraphError::NotBlocked => 400,
            GraphError::NotFound(_) => 404,
            GraphError::Database(_) => 500,
        }
    }
}

/// Result type alias for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
