//! Contract-based validation for game actions.
//!
//! Contracts define correctness through preconditions and postconditions.
//! They formalize the Hoare-style reasoning: {P} action {Q}

use crate::action::GameAction;
use crate::error::MatchError;
use crate::invariants::{InvariantSet, PositionInvariants};
use crate::position::Position;
use crate::side::Side;
use strum::IntoEnumIterator;
use tracing::{instrument, warn};

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// A contract defines preconditions and postconditions for state transitions.
///
/// - Precondition: {P(state, action)} - must hold before applying action
/// - Postcondition: {Q(before, after)} - must hold after applying action
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), MatchError>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), MatchError>;
}

// ─────────────────────────────────────────────────────────────
//  Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: it must be the side's turn.
pub struct SidesTurn;

impl SidesTurn {
    /// Fails unless `side` is on turn.
    #[instrument(skip(position))]
    pub fn check(position: &Position, side: Side) -> Result<(), MatchError> {
        if position.turn() == Some(side) {
            Ok(())
        } else {
            Err(MatchError::illegal(format!("{} is not on turn", side)))
        }
    }
}

/// Precondition: no double and no resignation awaits an answer.
pub struct NothingPending;

impl NothingPending {
    /// Fails while an offer is open.
    #[instrument(skip(position))]
    pub fn check(position: &Position) -> Result<(), MatchError> {
        if let Some(doubler) = position.cube_turned() {
            return Err(MatchError::illegal(format!(
                "double by {} awaits an answer",
                doubler
            )));
        }
        if let Some((resigner, _)) = position.resigned() {
            return Err(MatchError::illegal(format!(
                "resignation by {} awaits an answer",
                resigner
            )));
        }
        Ok(())
    }
}

/// Precondition: the opponent of `side` has offered a double.
pub struct DoubleOffered;

impl DoubleOffered {
    /// Fails unless the opponent's double is pending.
    #[instrument(skip(position))]
    pub fn check(position: &Position, side: Side) -> Result<(), MatchError> {
        if position.cube_turned() == Some(side.opponent()) {
            Ok(())
        } else {
            Err(MatchError::illegal("no double to answer"))
        }
    }
}

/// Precondition: the opponent of `side` has offered to resign.
pub struct ResignationOffered;

impl ResignationOffered {
    /// Fails unless the opponent's resignation is pending.
    #[instrument(skip(position))]
    pub fn check(position: &Position, side: Side) -> Result<(), MatchError> {
        match position.resigned() {
            Some((resigner, _)) if resigner == side.opponent() => Ok(()),
            _ => Err(MatchError::illegal("no resignation to answer")),
        }
    }
}

/// Precondition: dice show 1 to 6.
pub struct DiceValid;

impl DiceValid {
    /// Fails on a die outside 1..=6.
    pub fn check(dice: [u8; 2]) -> Result<(), MatchError> {
        if dice.iter().all(|d| (1..=6).contains(d)) {
            Ok(())
        } else {
            Err(MatchError::illegal(format!(
                "dice {} {} out of range",
                dice[0], dice[1]
            )))
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Action Contract (Pre + Post)
// ─────────────────────────────────────────────────────────────

/// Contract for every game action.
///
/// Preconditions depend on the verb (turn, dice, pending offers, doubling
/// rights). Postconditions:
/// - Position invariants hold
/// - No side gains checkers in play
pub struct ActionContract;

impl<'a> Contract<Position, (Side, &'a GameAction)> for ActionContract {
    fn pre(position: &Position, (side, action): &(Side, &'a GameAction)) -> Result<(), MatchError> {
        let side = *side;
        match action {
            GameAction::Roll(dice) => {
                DiceValid::check(*dice)?;
                NothingPending::check(position)?;
                match position.turn() {
                    None => Ok(()),
                    Some(turn) if turn == side && !position.has_dice() => Ok(()),
                    Some(_) if position.has_dice() => {
                        Err(MatchError::illegal("dice already rolled"))
                    }
                    Some(turn) => Err(MatchError::illegal(format!("{} is on roll", turn))),
                }
            }
            GameAction::Move(steps) => {
                if steps.len() > 4 {
                    return Err(MatchError::illegal(format!(
                        "{} steps in one move",
                        steps.len()
                    )));
                }
                SidesTurn::check(position, side)?;
                NothingPending::check(position)?;
                if !position.has_dice() {
                    return Err(MatchError::illegal("move before rolling"));
                }
                Ok(())
            }
            GameAction::Double => {
                SidesTurn::check(position, side)?;
                NothingPending::check(position)?;
                if position.has_dice() {
                    return Err(MatchError::illegal("double after rolling"));
                }
                if !position.may_double()[side.index()] {
                    return Err(MatchError::illegal(format!("{} may not double", side)));
                }
                Ok(())
            }
            GameAction::Take | GameAction::Drop => DoubleOffered::check(position, side),
            GameAction::Resign(value) => {
                if !(1..=3).contains(value) {
                    return Err(MatchError::illegal(format!(
                        "resignation value {} out of range",
                        value
                    )));
                }
                NothingPending::check(position)
            }
            GameAction::Accept | GameAction::Reject => ResignationOffered::check(position, side),
        }
    }

    fn post(before: &Position, after: &Position) -> Result<(), MatchError> {
        PositionInvariants::check_all(after).map_err(|violations| {
            let descriptions = violations
                .iter()
                .map(|v| v.description.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            MatchError::illegal(format!("Postcondition failed: {}", descriptions))
        })?;
        for side in Side::iter() {
            if after.checkers(side) > before.checkers(side) {
                warn!(%side, "Checker count grew");
                return Err(MatchError::illegal(format!(
                    "Postcondition failed: {} gained checkers",
                    side
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_roll_by_either_side() {
        let position = Position::starting(3);
        let roll = GameAction::Roll([3, 1]);
        assert!(ActionContract::pre(&position, &(Side::White, &roll)).is_ok());
        assert!(ActionContract::pre(&position, &(Side::Black, &roll)).is_ok());
    }

    #[test]
    fn move_requires_dice() {
        let position = Position::starting(3).with_dice(Some(Side::White), [0, 0]);
        let action = GameAction::Move(Vec::new());
        assert!(ActionContract::pre(&position, &(Side::White, &action)).is_err());
    }

    #[test]
    fn take_requires_pending_double() {
        let position = Position::starting(0).with_dice(Some(Side::White), [0, 0]);
        assert!(ActionContract::pre(&position, &(Side::Black, &GameAction::Take)).is_err());
        let offered = position.with_cube_turned(Some(Side::White));
        assert!(ActionContract::pre(&offered, &(Side::Black, &GameAction::Take)).is_ok());
        assert!(ActionContract::pre(&offered, &(Side::White, &GameAction::Take)).is_err());
    }

    #[test]
    fn resign_value_bounds() {
        let position = Position::starting(0);
        for value in 1..=3 {
            let action = GameAction::Resign(value);
            assert!(ActionContract::pre(&position, &(Side::White, &action)).is_ok());
        }
        let zero = GameAction::Resign(0);
        assert!(ActionContract::pre(&position, &(Side::White, &zero)).is_err());
    }

    #[test]
    fn post_rejects_new_checkers() {
        let before = Position::starting(0);
        let mut points = *before.points();
        points[0] = 0;
        let fewer = before.clone().with_board(points, [0, 0]);
        assert!(ActionContract::post(&fewer, &before).is_err());
        assert!(ActionContract::post(&before, &fewer).is_ok());
    }
}
