//! Request Errors
//!
//! Every command fails with one of five categories. The category picks the
//! HTTP status; the reason is shown to the player verbatim.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::state::PlayError;
use crate::network::auth::AuthError;

/// Failure category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing field, rejected before any mutation.
    Validation,
    /// Unknown nick or wrong password.
    Auth,
    /// Unknown session, or caller not a participant.
    Reference,
    /// Wrong turn, finished game, wrong phase, illegal cell.
    StateConflict,
    /// Stream disconnect.
    Transport,
}

/// Failure of one command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Reference(String),

    #[error("{0}")]
    StateConflict(String),

    #[error("{0}")]
    Transport(String),
}

/// Wire body of a failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
}

impl CommandError {
    /// Validation failure.
    pub fn validation(reason: impl Into<String>) -> Self {
        CommandError::Validation(reason.into())
    }

    /// Unknown session id.
    pub fn unknown_game(id: &str) -> Self {
        CommandError::Reference(format!("unknown game {}", id))
    }

    /// Category of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::Validation(_) => ErrorKind::Validation,
            CommandError::Auth(_) => ErrorKind::Auth,
            CommandError::Reference(_) => ErrorKind::Reference,
            CommandError::StateConflict(_) => ErrorKind::StateConflict,
            CommandError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Human-readable reason.
    pub fn reason(&self) -> &str {
        match self {
            CommandError::Validation(r)
            | CommandError::Auth(r)
            | CommandError::Reference(r)
            | CommandError::StateConflict(r)
            | CommandError::Transport(r) => r,
        }
    }

    /// HTTP status for this category.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Auth => 401,
            ErrorKind::Reference => 404,
            ErrorKind::StateConflict => 409,
            ErrorKind::Transport => 503,
        }
    }

    /// Wire body.
    pub fn body(&self) -> ErrorBody {
        ErrorBody { error: self.reason().to_string(), kind: self.kind() }
    }
}

impl From<PlayError> for CommandError {
    fn from(e: PlayError) -> Self {
        match e {
            PlayError::NotParticipant(_) => CommandError::Reference(e.to_string()),
            PlayError::InvalidBoardSize(_) => CommandError::Validation(e.to_string()),
            _ => CommandError::StateConflict(e.to_string()),
        }
    }
}

impl From<AuthError> for CommandError {
    fn from(e: AuthError) -> Self {
        CommandError::Auth(e.to_string())
    }
}
