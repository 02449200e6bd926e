//! Game actions and their records.

use crate::side::Side;
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};

/// One checker movement in absolute numbering (0 and 25 are bar or off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, new)]
pub struct Step {
    /// Origin point.
    pub from: u8,
    /// Destination point.
    pub to: u8,
}

impl Step {
    /// Pips covered by the step.
    pub fn distance(self) -> u8 {
        self.from.abs_diff(self.to)
    }
}

/// Keyword naming an action in text formats.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ActionVerb {
    /// Dice roll.
    Roll,
    /// Checker play.
    Move,
    /// Cube offer.
    Double,
    /// Cube accepted.
    Take,
    /// Cube refused.
    Drop,
    /// Resignation offer.
    Resign,
    /// Resignation accepted.
    Accept,
    /// Resignation refused.
    Reject,
}

/// Something a player does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameAction {
    /// Dice showing these values.
    Roll([u8; 2]),
    /// Checker play; empty when no move is possible.
    Move(Vec<Step>),
    /// Offer to double the cube.
    Double,
    /// Accept a double.
    Take,
    /// Refuse a double, conceding the game.
    Drop,
    /// Offer to resign a single (1), gammon (2) or backgammon (3).
    Resign(u8),
    /// Accept a resignation.
    Accept,
    /// Refuse a resignation.
    Reject,
}

impl GameAction {
    /// Keyword of the action.
    pub fn verb(&self) -> ActionVerb {
        match self {
            Self::Roll(_) => ActionVerb::Roll,
            Self::Move(_) => ActionVerb::Move,
            Self::Double => ActionVerb::Double,
            Self::Take => ActionVerb::Take,
            Self::Drop => ActionVerb::Drop,
            Self::Resign(_) => ActionVerb::Resign,
            Self::Accept => ActionVerb::Accept,
            Self::Reject => ActionVerb::Reject,
        }
    }
}

/// An action taken by one side at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, new)]
pub struct ActionRecord {
    /// Acting side.
    side: Side,
    /// What was done.
    action: GameAction,
    /// Microseconds since the Unix epoch.
    timestamp: i64,
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum EndCause {
    /// The winner bore off all checkers.
    BearOff,
    /// The loser refused a double.
    Drop,
    /// The loser's resignation was accepted.
    Resignation,
}

/// Final result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, new)]
pub struct GameEnd {
    /// Winning side.
    winner: Side,
    /// Points won, cube included.
    points: u32,
    /// How the game ended.
    cause: EndCause,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_are_lowercase() {
        assert_eq!(GameAction::Roll([3, 1]).verb().to_string(), "roll");
        assert_eq!("resign".parse::<ActionVerb>().unwrap(), ActionVerb::Resign);
        assert_eq!(Step::new(24, 18).distance(), 6);
    }
}
