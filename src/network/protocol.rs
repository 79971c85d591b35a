//! Protocol Messages
//!
//! Request bodies, replies and the state delta pushed to viewers. All JSON.
//! Cells travel as linear indices `row * size + col`.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::ai::Difficulty;
use crate::game::board::{Cell, Side, Square};
use crate::game::dice::DiceResult;
use crate::game::events::GameEvent;
use crate::game::state::{FirstPlayer, MatchState, MatchStatus, TurnPhase};
use crate::network::error::{CommandError, ErrorBody};
use crate::network::ranking::RankingRow;

/// Nicks with this prefix belong to server-side AI seats.
pub const AI_NICK_PREFIX: &str = "ai:";

// =============================================================================
// REQUESTS
// =============================================================================

/// `register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub nick: String,
    pub password: String,
}

/// `join`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub group: i64,
    pub size: i64,
    /// `blue`, `red` or `random`; defaults to `blue`.
    pub first: Option<String>,
    pub nick: String,
    pub password: String,
}

/// `practice`: a match against a server AI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeRequest {
    pub nick: String,
    pub password: String,
    pub size: i64,
    pub difficulty: String,
    /// `blue` (the player), `red` (the AI) or `random`.
    pub first: Option<String>,
}

/// `roll`, `pass` and `leave`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub nick: String,
    pub password: String,
    pub game: String,
}

/// `notify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub nick: String,
    pub password: String,
    pub game: String,
    pub cell: i64,
}

/// `ranking`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRequest {
    pub group: i64,
    pub size: i64,
}

/// `subscribe` (event stream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub nick: String,
    pub game: String,
}

/// Every command sharing the request → reply contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Register(RegisterRequest),
    Join(JoinRequest),
    Practice(PracticeRequest),
    Roll(TurnRequest),
    Notify(NotifyRequest),
    Pass(TurnRequest),
    Leave(TurnRequest),
    Ranking(RankingRequest),
}

impl Command {
    /// Command name, as used in routes and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Register(_) => "register",
            Command::Join(_) => "join",
            Command::Practice(_) => "practice",
            Command::Roll(_) => "roll",
            Command::Notify(_) => "notify",
            Command::Pass(_) => "pass",
            Command::Leave(_) => "leave",
            Command::Ranking(_) => "ranking",
        }
    }
}

// =============================================================================
// FIELD VALIDATION
// =============================================================================

/// Non-empty nick and password.
pub fn validate_credentials(nick: &str, password: &str) -> Result<(), CommandError> {
    if nick.trim().is_empty() {
        return Err(CommandError::validation("nick is empty"));
    }
    if password.is_empty() {
        return Err(CommandError::validation("password is empty"));
    }
    Ok(())
}

/// Credentials for a human account; the AI prefix is reserved.
pub fn validate_account(nick: &str, password: &str) -> Result<(), CommandError> {
    validate_credentials(nick, password)?;
    if nick.starts_with(AI_NICK_PREFIX) {
        return Err(CommandError::validation(format!(
            "nicks starting with '{}' are reserved",
            AI_NICK_PREFIX
        )));
    }
    Ok(())
}

/// Positive group number.
pub fn validate_group(group: i64) -> Result<u32, CommandError> {
    u32::try_from(group)
        .ok()
        .filter(|g| *g > 0)
        .ok_or_else(|| CommandError::validation(format!("invalid group '{}'", group)))
}

/// Odd board size in 5..=15.
pub fn validate_size(size: i64) -> Result<usize, CommandError> {
    usize::try_from(size)
        .ok()
        .filter(|s| crate::game::board::is_valid_width(*s))
        .ok_or_else(|| CommandError::validation(format!("invalid size '{}'", size)))
}

/// Non-negative cell index. The upper bound is checked against the board.
pub fn validate_cell(cell: i64) -> Result<usize, CommandError> {
    usize::try_from(cell)
        .map_err(|_| CommandError::validation(format!("invalid cell '{}'", cell)))
}

/// First-to-move preference; missing means `blue`.
pub fn parse_first(first: Option<&str>) -> Result<FirstPlayer, CommandError> {
    match first {
        None => Ok(FirstPlayer::Blue),
        Some(s) => FirstPlayer::parse(s)
            .ok_or_else(|| CommandError::validation(format!("invalid first player '{}'", s))),
    }
}

/// AI tier name.
pub fn parse_difficulty(s: &str) -> Result<Difficulty, CommandError> {
    Difficulty::parse(s).ok_or_else(|| CommandError::validation(format!("invalid difficulty '{}'", s)))
}

// =============================================================================
// REPLIES
// =============================================================================

/// Successful command result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    /// `join` / `practice`.
    Game { game: String },
    /// `roll`.
    Roll {
        dice: DiceResult,
        movable: Vec<usize>,
        must_pass: Option<String>,
    },
    /// `ranking`.
    Ranking { ranking: Vec<RankingRow> },
    /// Everything else.
    Ack {},
}

// =============================================================================
// STATE DELTAS
// =============================================================================

/// A piece as viewers see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePiece {
    pub side: Side,
    pub moved: bool,
    pub blessed: bool,
}

/// Pushed to every viewer after each accepted mutation.
///
/// Always carries the full board, so a viewer that missed a delta can
/// resynchronise from the next one and compare `state_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub game: String,
    pub revision: u64,
    /// The change that produced this update; `None` for the subscribe snapshot.
    pub event: Option<GameEvent>,
    pub size: usize,
    pub pieces: Vec<Option<WirePiece>>,
    pub players: BTreeMap<String, Side>,
    pub turn: Option<String>,
    pub phase: TurnPhase,
    pub status: MatchStatus,
    pub dice: Option<DiceResult>,
    pub selected: Option<usize>,
    pub targets: Vec<usize>,
    pub movable: Vec<usize>,
    pub must_pass: Option<String>,
    pub winner: Option<String>,
    pub state_hash: String,
}

impl StateUpdate {
    /// Build from the current match state.
    pub fn from_state(state: &MatchState, event: Option<GameEvent>) -> Self {
        let size = state.size();
        let index = |c: &Cell| c.index(size);

        let pieces = state
            .board
            .squares()
            .iter()
            .map(|sq| match sq {
                Square::Empty => None,
                Square::Occupied(p) => Some(WirePiece {
                    side: p.side,
                    moved: p.has_moved,
                    blessed: p.is_blessed,
                }),
            })
            .collect();

        let movable = if state.selection.is_none() {
            state.movable_origins().iter().map(index).collect()
        } else {
            Vec::new()
        };

        let must_pass = if state.phase == TurnPhase::AwaitingPass {
            state.turn.clone()
        } else {
            None
        };

        Self {
            game: state.id.clone(),
            revision: state.revision,
            event,
            size,
            pieces,
            players: state.players.clone(),
            turn: state.turn.clone(),
            phase: state.phase,
            status: state.status,
            dice: state.dice,
            selected: state.selection.as_ref().map(index),
            targets: state.legal_targets.iter().map(index).collect(),
            movable,
            must_pass,
            winner: state.winner.clone(),
            state_hash: hex::encode(state.state_hash()),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// WEBSOCKET FRAMES
// =============================================================================

/// Frames a WebSocket client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Any command of the shared table.
    Command(Command),
    /// Turn this socket into a delta stream.
    Subscribe(SubscribeRequest),
    /// Keep-alive.
    Ping,
}

impl ClientMessage {
    /// Parse a text frame. Dispatches on the `command` field.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        match value.get("command").and_then(serde_json::Value::as_str) {
            Some("subscribe") => Ok(ClientMessage::Subscribe(serde_json::from_value(value)?)),
            Some("ping") => Ok(ClientMessage::Ping),
            _ => Ok(ClientMessage::Command(serde_json::from_value(value)?)),
        }
    }
}

/// Frames the server sends over a WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Result of a command.
    Reply { command: String, body: Reply },
    /// State delta.
    Update { update: StateUpdate },
    /// Command failure.
    Error(ErrorBody),
    /// Keep-alive answer.
    Pong,
    /// Server is going away.
    Shutdown { reason: String },
}

impl ServerMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
