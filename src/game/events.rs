//! Game Events
//!
//! Deltas produced by every accepted match mutation. The network layer wraps
//! each one with a full board snapshot before fanning it out.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::game::board::{Cell, Side};
use crate::game::dice::DiceResult;

/// Why a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The loser has no pieces left.
    Eliminated,
    /// A participant left an active match.
    Forfeit,
    /// The turn holder went idle past the timeout.
    Timeout,
    /// The creator left before anyone joined.
    Cancelled,
}

/// One accepted state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Second player attached; play begins.
    Started {
        players: BTreeMap<String, Side>,
        turn: String,
    },

    /// Sticks thrown.
    Rolled {
        nick: String,
        dice: DiceResult,
        movable: Vec<Cell>,
        /// Set to the roller when the only way forward is `pass`.
        must_pass: Option<String>,
    },

    /// Origin picked; legal destinations revealed.
    Selected {
        nick: String,
        origin: Cell,
        targets: Vec<Cell>,
    },

    /// Origin clicked twice; back to origin selection.
    Deselected {
        nick: String,
        movable: Vec<Cell>,
    },

    /// A move was executed.
    Moved {
        nick: String,
        from: Cell,
        to: Cell,
        captured: bool,
        blessed: bool,
        /// Holder of the next roll, `None` when the move ended the match.
        next_turn: Option<String>,
    },

    /// Forced hand-off after a roll with no legal move.
    Passed {
        nick: String,
        next_turn: String,
    },

    /// Terminal.
    Finished {
        winner: Option<String>,
        reason: FinishReason,
    },
}

impl GameEvent {
    /// Wire name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::Started { .. } => "started",
            GameEvent::Rolled { .. } => "rolled",
            GameEvent::Selected { .. } => "selected",
            GameEvent::Deselected { .. } => "deselected",
            GameEvent::Moved { .. } => "moved",
            GameEvent::Passed { .. } => "passed",
            GameEvent::Finished { .. } => "finished",
        }
    }

    /// Whether this event ends the match.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameEvent::Finished { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let ev = GameEvent::Passed { nick: "ana".into(), next_turn: "rui".into() };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "passed");
        assert_eq!(json["next_turn"], "rui");
        assert_eq!(ev.kind(), "passed");
    }

    #[test]
    fn test_finish_reason_names() {
        let ev = GameEvent::Finished { winner: None, reason: FinishReason::Cancelled };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["reason"], "cancelled");
        assert!(ev.is_terminal());
    }
}
