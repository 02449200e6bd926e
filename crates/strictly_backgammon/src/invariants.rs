//! First-class invariants for backgammon positions.
//!
//! Invariants are logical properties that must hold for every position a
//! game passes through. They are checked after each action and can be
//! tested independently.

use crate::position::{CHECKERS, Position};
use crate::side::Side;
use strum::IntoEnumIterator;
use tracing::warn;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        if !I1::holds(state) {
            violations.push(InvariantViolation::new(I1::description()));
        }
        if !I2::holds(state) {
            violations.push(InvariantViolation::new(I2::description()));
        }
        if !I3::holds(state) {
            violations.push(InvariantViolation::new(I3::description()));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Invariant: neither side has more than fifteen checkers in play.
pub struct CheckerLimitInvariant;

impl Invariant<Position> for CheckerLimitInvariant {
    fn holds(position: &Position) -> bool {
        Side::iter().all(|side| {
            let count = position.checkers(side);
            if count > CHECKERS {
                warn!(%side, count, "Too many checkers");
            }
            count <= CHECKERS
        })
    }

    fn description() -> &'static str {
        "Each side has at most fifteen checkers in play"
    }
}

/// Invariant: dice are either both unrolled or both 1..=6.
pub struct DiceRangeInvariant;

impl Invariant<Position> for DiceRangeInvariant {
    fn holds(position: &Position) -> bool {
        let dice = position.dice();
        dice == [0, 0] || dice.iter().all(|d| (1..=6).contains(d))
    }

    fn description() -> &'static str {
        "Dice are unrolled or show 1 to 6"
    }
}

/// Invariant: the cube shows a power of two.
pub struct CubePowerInvariant;

impl Invariant<Position> for CubePowerInvariant {
    fn holds(position: &Position) -> bool {
        position.cube().is_power_of_two()
    }

    fn description() -> &'static str {
        "Cube value is a power of two"
    }
}

/// All position invariants as a composable set.
pub type PositionInvariants = (CheckerLimitInvariant, DiceRangeInvariant, CubePowerInvariant);
