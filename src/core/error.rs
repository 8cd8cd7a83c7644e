use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Session is not active")]
    SessionNotActive,

    #[error("No private message is pending a choice")]
    StalePrivateChoice,

    #[error("Choice index {0} is out of range (expected 0-2)")]
    InvalidChoice(usize),
}

pub type Result<T> = std::result::Result<T, ChatError>;
