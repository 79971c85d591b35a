//! Match State
//!
//! One match: participants, board, dice, selection and the turn machine.
//! Every mutation validates first and only then touches state, so a rejected
//! call leaves the match exactly as it was.
//!
//! ```text
//! AwaitingRoll ──roll──> AwaitingOrigin ──notify(origin)──> AwaitingDestination
//!      ^    │                  ^                                  │      │
//!      │    └─no move──> AwaitingPass                 notify(same)│      │notify(target)
//!      │                       │pass                              │      v
//!      └───────────────────────┴──────────────(repeat | hand-off)─┴── move applied
//! ```
//!
//! Any move that empties the opponent's piece set lands in `Finished`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::{StateHash, StateHasher};
use crate::core::rng::DeterministicRng;
use crate::game::board::{is_valid_width, Board, Cell, Move, Side, Square};
use crate::game::dice::{DiceModel, DiceResult};
use crate::game::events::{FinishReason, GameEvent};
use crate::game::moves::MoveGenerator;

// =============================================================================
// ERRORS
// =============================================================================

/// Rejection of a match mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlayError {
    #[error("board size {0} is not an odd number between 5 and 15")]
    InvalidBoardSize(usize),

    #[error("{0} is not a participant of this game")]
    NotParticipant(String),

    #[error("{0} already takes part in this game")]
    AlreadyParticipant(String),

    #[error("game is full")]
    GameFull,

    #[error("game has already finished")]
    GameFinished,

    #[error("game has not started yet")]
    NotStarted,

    #[error("not your turn to play")]
    NotYourTurn,

    #[error("you already rolled the dice")]
    AlreadyRolled,

    #[error("roll the dice first")]
    MustRollFirst,

    #[error("no legal move: you must pass")]
    MustPass,

    #[error("cannot pass while a move or roll is available")]
    CannotPass,

    #[error("cell {0} is outside the board")]
    CellOutOfRange(usize),

    #[error("no piece of yours at {0}")]
    NotYourPiece(Cell),

    #[error("the piece at {0} has no legal move")]
    PieceCannotMove(Cell),

    #[error("{0} is not a legal destination")]
    IllegalDestination(Cell),
}

// =============================================================================
// ENUMS
// =============================================================================

/// Who rolls first once the match starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstPlayer {
    /// The creator (side Blue).
    #[default]
    Blue,
    /// The joiner (side Red).
    Red,
    /// Coin flip at pairing.
    Random,
}

impl FirstPlayer {
    /// Parse the wire value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blue" => Some(FirstPlayer::Blue),
            "red" => Some(FirstPlayer::Red),
            "random" => Some(FirstPlayer::Random),
            _ => None,
        }
    }

    /// Wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            FirstPlayer::Blue => "blue",
            FirstPlayer::Red => "red",
            FirstPlayer::Random => "random",
        }
    }
}

/// Coarse match lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Waiting,
    Playing,
    Finished,
}

/// Fine-grained turn phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    AwaitingRoll,
    AwaitingOrigin,
    AwaitingDestination,
    /// Forced hand-off: only `pass` is accepted.
    AwaitingPass,
    Finished,
}

impl TurnPhase {
    fn tag(self) -> u8 {
        match self {
            TurnPhase::AwaitingRoll => 0,
            TurnPhase::AwaitingOrigin => 1,
            TurnPhase::AwaitingDestination => 2,
            TurnPhase::AwaitingPass => 3,
            TurnPhase::Finished => 4,
        }
    }
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Full state of one match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchState {
    /// Session id.
    pub id: String,
    /// Matchmaking group.
    pub group: u32,
    /// Board contents.
    pub board: Board,
    /// Participant nick → side. At most two entries.
    pub players: BTreeMap<String, Side>,
    /// Creator's first-to-move preference.
    pub first_preference: FirstPlayer,
    /// Nick holding the turn; `None` until the match starts.
    pub turn: Option<String>,
    /// Turn phase.
    pub phase: TurnPhase,
    /// Dice thrown by the turn holder this turn.
    pub dice: Option<DiceResult>,
    /// Selected origin.
    pub selection: Option<Cell>,
    /// Legal destinations for `selection`.
    pub legal_targets: BTreeSet<Cell>,
    /// Lifecycle.
    pub status: MatchStatus,
    /// Set together with `status == Finished` when the match was decided.
    pub winner: Option<String>,
    /// When this match was last mutated.
    pub last_activity: DateTime<Utc>,
    /// Bumped on every accepted mutation.
    pub revision: u64,
    /// Dice and coin-flip source.
    pub rng: DeterministicRng,
}

impl MatchState {
    /// New waiting match with `creator` on side Blue.
    pub fn new(
        id: impl Into<String>,
        group: u32,
        size: usize,
        creator: impl Into<String>,
        first_preference: FirstPlayer,
        now: DateTime<Utc>,
        rng: DeterministicRng,
    ) -> Result<Self, PlayError> {
        if !is_valid_width(size) {
            return Err(PlayError::InvalidBoardSize(size));
        }

        let mut players = BTreeMap::new();
        players.insert(creator.into(), Side::Blue);

        Ok(Self {
            id: id.into(),
            group,
            board: Board::setup(size),
            players,
            first_preference,
            turn: None,
            phase: TurnPhase::AwaitingRoll,
            dice: None,
            selection: None,
            legal_targets: BTreeSet::new(),
            status: MatchStatus::Waiting,
            winner: None,
            last_activity: now,
            revision: 0,
            rng,
        })
    }

    /// Board width.
    #[inline]
    pub fn size(&self) -> usize {
        self.board.width()
    }

    /// Whether the match is over.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// Whether `nick` takes part.
    #[inline]
    pub fn is_participant(&self, nick: &str) -> bool {
        self.players.contains_key(nick)
    }

    /// Side played by `nick`.
    pub fn side_of(&self, nick: &str) -> Option<Side> {
        self.players.get(nick).copied()
    }

    /// Nick playing `side`.
    pub fn nick_of(&self, side: Side) -> Option<&str> {
        self.players
            .iter()
            .find(|(_, s)| **s == side)
            .map(|(n, _)| n.as_str())
    }

    /// The other participant.
    pub fn opponent_of(&self, nick: &str) -> Option<&str> {
        self.players
            .keys()
            .find(|n| n.as_str() != nick)
            .map(String::as_str)
    }

    /// Side holding the turn.
    pub fn turn_side(&self) -> Option<Side> {
        self.turn.as_deref().and_then(|n| self.side_of(n))
    }

    /// Time since the last accepted mutation.
    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity
    }

    /// Origins the turn holder may pick with the pending dice.
    pub fn movable_origins(&self) -> Vec<Cell> {
        match (self.dice, self.turn_side()) {
            (Some(dice), Some(side)) if !dice.consumed => {
                MoveGenerator::new(&self.board).movable_origins(dice.value, side)
            }
            _ => Vec::new(),
        }
    }

    /// Digest over everything a viewer renders.
    pub fn state_hash(&self) -> StateHash {
        let mut h = StateHasher::for_match_state();
        h.update_str(&self.id);
        h.update_u32(self.group);
        h.update_u32(self.size() as u32);
        for sq in self.board.squares() {
            match sq {
                Square::Empty => h.update_u8(0),
                Square::Occupied(p) => {
                    h.update_u8(match p.side {
                        Side::Blue => 1,
                        Side::Red => 2,
                    });
                    h.update_bool(p.has_moved);
                    h.update_bool(p.is_blessed);
                }
            }
        }
        h.update_str(self.turn.as_deref().unwrap_or(""));
        h.update_u8(self.phase.tag());
        h.update_u8(self.dice.map(|d| d.value).unwrap_or(0));
        h.update_u8(self.selection.map(|c| c.row).unwrap_or(u8::MAX));
        h.update_u8(self.selection.map(|c| c.col).unwrap_or(u8::MAX));
        h.update_str(self.winner.as_deref().unwrap_or(""));
        h.update_u64(self.revision);
        h.finalize()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Attach the second player and start play.
    pub fn attach_opponent(
        &mut self,
        nick: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<GameEvent, PlayError> {
        let nick = nick.into();
        if self.is_finished() {
            return Err(PlayError::GameFinished);
        }
        if self.is_participant(&nick) {
            return Err(PlayError::AlreadyParticipant(nick));
        }
        if self.players.len() >= 2 {
            return Err(PlayError::GameFull);
        }

        self.players.insert(nick, Side::Red);

        let first_side = match self.first_preference {
            FirstPlayer::Blue => Side::Blue,
            FirstPlayer::Red => Side::Red,
            FirstPlayer::Random => {
                if self.rng.next_coin() { Side::Blue } else { Side::Red }
            }
        };
        let first = self.nick_of(first_side).unwrap_or_default().to_string();

        self.turn = Some(first.clone());
        self.status = MatchStatus::Playing;
        self.phase = TurnPhase::AwaitingRoll;
        self.touch(now);

        Ok(GameEvent::Started { players: self.players.clone(), turn: first })
    }

    /// `nick` walks away. Cancels a waiting match, forfeits an active one.
    pub fn leave(&mut self, nick: &str, now: DateTime<Utc>) -> Result<GameEvent, PlayError> {
        if !self.is_participant(nick) {
            return Err(PlayError::NotParticipant(nick.to_string()));
        }
        if self.is_finished() {
            return Err(PlayError::GameFinished);
        }

        let event = match self.status {
            MatchStatus::Waiting => self.finish(None, FinishReason::Cancelled),
            _ => {
                let winner = self.opponent_of(nick).map(str::to_string);
                self.finish(winner, FinishReason::Forfeit)
            }
        };
        self.touch(now);
        Ok(event)
    }

    /// Idle forfeit: the turn holder loses. `None` unless playing.
    pub fn forfeit_idle(&mut self, now: DateTime<Utc>) -> Option<GameEvent> {
        if self.status != MatchStatus::Playing {
            return None;
        }
        let loser = self.turn.clone()?;
        let winner = self.opponent_of(&loser).map(str::to_string);
        let event = self.finish(winner, FinishReason::Timeout);
        self.touch(now);
        Some(event)
    }

    // =========================================================================
    // TURN ACTIONS
    // =========================================================================

    /// Throw the sticks.
    pub fn roll(&mut self, nick: &str, now: DateTime<Utc>) -> Result<GameEvent, PlayError> {
        let side = self.check_actor(nick)?;

        if let Some(dice) = self.dice {
            if self.phase == TurnPhase::AwaitingPass {
                return Err(PlayError::MustPass);
            }
            if dice.consumed || !dice.must_repeat {
                return Err(PlayError::AlreadyRolled);
            }
        }

        let dice = DiceModel::roll_once(&mut self.rng);
        let movable = MoveGenerator::new(&self.board).movable_origins(dice.value, side);

        self.dice = Some(dice);
        self.selection = None;
        self.legal_targets.clear();

        let must_pass = if !movable.is_empty() {
            self.phase = TurnPhase::AwaitingOrigin;
            None
        } else if dice.must_repeat {
            self.phase = TurnPhase::AwaitingRoll;
            None
        } else {
            self.phase = TurnPhase::AwaitingPass;
            Some(nick.to_string())
        };
        self.touch(now);

        Ok(GameEvent::Rolled { nick: nick.to_string(), dice, movable, must_pass })
    }

    /// Click on board cell `cell_index` (`row * size + col`).
    ///
    /// Picks an origin, cancels the current selection when clicked twice, or
    /// executes the move when the cell is a legal target. While an origin is
    /// selected every other cell is refused. A winning move yields both the
    /// move and the finish.
    pub fn notify(
        &mut self,
        nick: &str,
        cell_index: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<GameEvent>, PlayError> {
        let side = self.check_actor(nick)?;
        let cell = Cell::from_index(cell_index, self.size())
            .ok_or(PlayError::CellOutOfRange(cell_index))?;

        let dice = match self.dice {
            Some(d) if !d.consumed => d,
            _ => return Err(PlayError::MustRollFirst),
        };
        match self.phase {
            TurnPhase::AwaitingPass => return Err(PlayError::MustPass),
            TurnPhase::AwaitingRoll => return Err(PlayError::MustRollFirst),
            _ => {}
        }

        if self.selection == Some(cell) {
            self.selection = None;
            self.legal_targets.clear();
            self.phase = TurnPhase::AwaitingOrigin;
            self.touch(now);
            return Ok(vec![GameEvent::Deselected {
                nick: nick.to_string(),
                movable: self.movable_origins(),
            }]);
        }

        if self.selection.is_some() {
            if self.legal_targets.contains(&cell) {
                return Ok(self.execute(nick, side, cell, now));
            }
            return Err(PlayError::IllegalDestination(cell));
        }

        let generator = MoveGenerator::new(&self.board);
        match self.board.piece_at(cell) {
            Some(p) if p.side == side => {
                let targets = generator.generate(cell, dice.value, side);
                if targets.is_empty() {
                    return Err(PlayError::PieceCannotMove(cell));
                }
                self.selection = Some(cell);
                self.legal_targets = targets;
                self.phase = TurnPhase::AwaitingDestination;
                self.touch(now);
                Ok(vec![GameEvent::Selected {
                    nick: nick.to_string(),
                    origin: cell,
                    targets: self.legal_targets.iter().copied().collect(),
                }])
            }
            _ => Err(PlayError::NotYourPiece(cell)),
        }
    }

    /// Apply a whole move directly (AI seats and self-play).
    pub fn play_move(
        &mut self,
        nick: &str,
        mv: Move,
        now: DateTime<Utc>,
    ) -> Result<Vec<GameEvent>, PlayError> {
        let mut events = Vec::new();
        if let Some(stale) = self.selection.filter(|c| *c != mv.from) {
            events.extend(self.notify(nick, stale.index(self.size()), now)?);
        }
        if self.selection != Some(mv.from) {
            events.extend(self.notify(nick, mv.from.index(self.size()), now)?);
        }
        if !self.legal_targets.contains(&mv.to) {
            return Err(PlayError::IllegalDestination(mv.to));
        }
        events.extend(self.notify(nick, mv.to.index(self.size()), now)?);
        Ok(events)
    }

    /// Hand the turn over after a roll with no legal move.
    pub fn pass(&mut self, nick: &str, now: DateTime<Utc>) -> Result<GameEvent, PlayError> {
        let side = self.check_actor(nick)?;

        let dice = match self.dice {
            Some(d) => d,
            None => return Err(PlayError::MustRollFirst),
        };
        if self.phase != TurnPhase::AwaitingPass
            || dice.must_repeat
            || MoveGenerator::new(&self.board).has_legal_move(dice.value, side)
        {
            return Err(PlayError::CannotPass);
        }

        let next = self.opponent_of(nick).unwrap_or(nick).to_string();
        self.end_turn(next.clone());
        self.touch(now);

        Ok(GameEvent::Passed { nick: nick.to_string(), next_turn: next })
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Precedence: participant, finished, started, turn.
    fn check_actor(&self, nick: &str) -> Result<Side, PlayError> {
        let side = self
            .side_of(nick)
            .ok_or_else(|| PlayError::NotParticipant(nick.to_string()))?;
        if self.is_finished() {
            return Err(PlayError::GameFinished);
        }
        if self.status != MatchStatus::Playing {
            return Err(PlayError::NotStarted);
        }
        if self.turn.as_deref() != Some(nick) {
            return Err(PlayError::NotYourTurn);
        }
        Ok(side)
    }

    fn execute(&mut self, nick: &str, side: Side, to: Cell, now: DateTime<Utc>) -> Vec<GameEvent> {
        let mut events = Vec::with_capacity(2);
        let Some(from) = self.selection else {
            return events;
        };
        let Some(outcome) = self.board.apply_move(Move { from, to }) else {
            return events;
        };

        let repeat = self.dice.map(|d| d.must_repeat).unwrap_or(false);
        if let Some(d) = self.dice.as_mut() {
            d.consumed = true;
        }

        let won = self.board.count(side.opponent()) == 0;
        let next_turn = if won {
            None
        } else if repeat {
            Some(nick.to_string())
        } else {
            Some(self.opponent_of(nick).unwrap_or(nick).to_string())
        };

        events.push(GameEvent::Moved {
            nick: nick.to_string(),
            from,
            to,
            captured: outcome.captured.is_some(),
            blessed: outcome.newly_blessed,
            next_turn: next_turn.clone(),
        });

        match next_turn {
            Some(next) => self.end_turn(next),
            None => events.push(self.finish(Some(nick.to_string()), FinishReason::Eliminated)),
        }
        self.touch(now);
        events
    }

    fn end_turn(&mut self, next: String) {
        self.turn = Some(next);
        self.dice = None;
        self.selection = None;
        self.legal_targets.clear();
        self.phase = TurnPhase::AwaitingRoll;
    }

    fn finish(&mut self, winner: Option<String>, reason: FinishReason) -> GameEvent {
        self.status = MatchStatus::Finished;
        self.phase = TurnPhase::Finished;
        self.winner = winner.clone();
        self.dice = None;
        self.selection = None;
        self.legal_targets.clear();
        GameEvent::Finished { winner, reason }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        self.revision += 1;
    }
}
