use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Message already linked to a group: {message_id}")]
    AlreadyLinked { message_id: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}
