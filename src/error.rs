//! Error types for the rules engine
//!
//! Two tiers: `InvalidAction` is a rule violation the caller recovers from
//! (the action API turns it into a failed `ActionResult`), everything else
//! is an invariant violation or an I/O problem and propagates as `Err`.

use crate::game::WaitingChoice;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MtgError {
    #[error("Invalid card format: {0}")]
    InvalidCardFormat(String),

    #[error("Invalid deck format: {0}")]
    InvalidDeckFormat(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(u32),

    #[error("Invalid game action: {0}")]
    InvalidAction(String),

    #[error("Player input required: {}", .0.prompt)]
    ChoiceRequired(Box<WaitingChoice>),

    #[error("Game state invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MtgError {
    /// Shorthand for a rule violation with a human-readable reason
    pub fn invalid(reason: impl Into<String>) -> Self {
        MtgError::InvalidAction(reason.into())
    }
}

impl From<serde_json::Error> for MtgError {
    fn from(err: serde_json::Error) -> Self {
        MtgError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MtgError>;
