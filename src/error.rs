//! Error types for hard faults
//!
//! Expected domain conditions (a non-player acting, a trade already answered,
//! an out-of-order vote, ...) are never errors. They come back as named
//! failures inside an [`Outcome`](crate::outcome::Outcome). The types here
//! cover collaborator faults and programmer errors only.

use thiserror::Error;
use crate::outcome::UnexpectedFailure;
use crate::types::{PlayerId, TradeId, UserId};

#[derive(Debug, Error)]
pub enum NamesmithError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    UnexpectedFailure(#[from] UnexpectedFailure),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Player not found: {id}")]
    PlayerNotFound { id: PlayerId },

    #[error("Trade not found: {id}")]
    TradeNotFound { id: TradeId },

    #[error("Player {id} cannot give '{characters}': missing '{missing}'")]
    InsufficientCharacters {
        id: PlayerId,
        characters: String,
        missing: String,
    },

    #[error("Rejected write: {0}")]
    Rejected(#[from] ValidationError),

    #[error("Checkpoint error: {reason}")]
    Checkpoint { reason: String },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Ballot of {voter} leaves {missing} empty while a later rank is filled")]
    BallotGap { voter: UserId, missing: String },

    #[error("Ballot of {voter} seats {player} in more than one rank")]
    DuplicateSeat { voter: UserId, player: PlayerId },

    #[error("Trade {id} is between {player} and themselves")]
    SelfTrade { id: TradeId, player: PlayerId },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not parse config: {reason}")]
    Parse { reason: String },

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing required component: {component}")]
    MissingComponent { component: String },
}

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Serialization failed: {reason}")]
    SerializationFailed { reason: String },
}
