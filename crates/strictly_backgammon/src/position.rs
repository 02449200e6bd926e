//! Board, dice, cube and score state.
//!
//! Point n (1..=24) is stored at `points[n - 1]`; positive counts are White
//! checkers, negative counts Black checkers. Bar and borne-off checkers are
//! kept outside the array.

use crate::side::Side;
use serde::{Deserialize, Serialize};

/// Checkers per side.
pub const CHECKERS: u8 = 15;

/// Standard opening layout.
pub const STARTING_POINTS: [i8; 24] = [
    -2, 0, 0, 0, 0, 5, 0, 3, 0, 0, 0, -5, 5, 0, 0, 0, -3, 0, -5, 0, 0, 0, 0, 2,
];

/// Complete state of a game at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    points: [i8; 24],
    bar: [u8; 2],
    dice: [u8; 2],
    cube: u32,
    may_double: [bool; 2],
    turn: Option<Side>,
    score: [u32; 2],
    match_length: u32,
    cube_turned: Option<Side>,
    resigned: Option<(Side, u8)>,
}

impl Default for Position {
    fn default() -> Self {
        Self::starting(0)
    }
}

impl Position {
    /// Opening position of a match of the given length (0 for money play).
    pub fn starting(match_length: u32) -> Self {
        Self {
            points: STARTING_POINTS,
            bar: [0, 0],
            dice: [0, 0],
            cube: 1,
            may_double: [true, true],
            turn: None,
            score: [0, 0],
            match_length,
            cube_turned: None,
            resigned: None,
        }
    }

    /// Replaces the board.
    pub fn with_board(mut self, points: [i8; 24], bar: [u8; 2]) -> Self {
        self.points = points;
        self.bar = bar;
        self
    }

    /// Replaces the dice and the side on roll.
    pub fn with_dice(mut self, turn: Option<Side>, dice: [u8; 2]) -> Self {
        self.turn = turn;
        self.dice = dice;
        self
    }

    /// Replaces cube value and doubling rights.
    pub fn with_cube(mut self, cube: u32, may_double: [bool; 2]) -> Self {
        self.cube = cube;
        self.may_double = may_double;
        self
    }

    /// Replaces the score.
    pub fn with_score(mut self, white: u32, black: u32) -> Self {
        self.score = [white, black];
        self
    }

    /// Replaces the match length.
    pub fn with_match_length(mut self, match_length: u32) -> Self {
        self.match_length = match_length;
        self
    }

    /// Marks a pending double offered by `side`.
    pub fn with_cube_turned(mut self, side: Option<Side>) -> Self {
        self.cube_turned = side;
        self
    }

    /// Marks a pending resignation.
    pub fn with_resigned(mut self, resigned: Option<(Side, u8)>) -> Self {
        self.resigned = resigned;
        self
    }

    /// Board array, point n at index n - 1.
    pub fn points(&self) -> &[i8; 24] {
        &self.points
    }

    /// Checkers on the bar, indexed by [`Side::index`].
    pub fn bar(&self) -> [u8; 2] {
        self.bar
    }

    /// Dice; `[0, 0]` when not rolled.
    pub fn dice(&self) -> [u8; 2] {
        self.dice
    }

    /// Whether dice are showing.
    pub fn has_dice(&self) -> bool {
        self.dice != [0, 0]
    }

    /// Cube value.
    pub fn cube(&self) -> u32 {
        self.cube
    }

    /// Doubling rights, indexed by [`Side::index`].
    pub fn may_double(&self) -> [bool; 2] {
        self.may_double
    }

    /// Side to act, `None` before the opening roll or after the game ended.
    pub fn turn(&self) -> Option<Side> {
        self.turn
    }

    /// Match score, indexed by [`Side::index`].
    pub fn score(&self) -> [u32; 2] {
        self.score
    }

    /// Match length, 0 for unlimited.
    pub fn match_length(&self) -> u32 {
        self.match_length
    }

    /// Side with a pending double offer.
    pub fn cube_turned(&self) -> Option<Side> {
        self.cube_turned
    }

    /// Pending resignation: resigning side and value.
    pub fn resigned(&self) -> Option<(Side, u8)> {
        self.resigned
    }

    /// Checkers of `side` on absolute point 1..=24.
    pub fn count_at(&self, point: u8, side: Side) -> u8 {
        if !(1..=24).contains(&point) {
            return 0;
        }
        let n = self.points[usize::from(point - 1)];
        if n.signum() == side.sign() {
            n.unsigned_abs()
        } else {
            0
        }
    }

    /// Checkers of `side` on the board and the bar.
    pub fn checkers(&self, side: Side) -> u8 {
        let on_board: u32 = (1..=24).map(|p| u32::from(self.count_at(p, side))).sum();
        u8::try_from(on_board + u32::from(self.bar[side.index()])).unwrap_or(u8::MAX)
    }

    /// Checkers of `side` already borne off.
    pub fn borne_off(&self, side: Side) -> u8 {
        CHECKERS.saturating_sub(self.checkers(side))
    }

    /// Whether every checker of `side` is in its home board or off.
    pub fn all_home(&self, side: Side) -> bool {
        self.bar[side.index()] == 0
            && (7..=24).all(|own| self.count_at(side.to_absolute(own), side) == 0)
    }

    /// Pips `side` needs to bear everything off.
    pub fn pip_count(&self, side: Side) -> u32 {
        let board: u32 = (1..=24)
            .map(|own| u32::from(own) * u32::from(self.count_at(side.to_absolute(own), side)))
            .sum();
        board + 25 * u32::from(self.bar[side.index()])
    }

    /// Whether checkers stand exactly as in another position.
    pub fn same_board(&self, other: &Self) -> bool {
        self.points == other.points && self.bar == other.bar
    }

    /// Equality ignoring the match length.
    pub fn same_state(&self, other: &Self) -> bool {
        let mut other = other.clone();
        other.match_length = self.match_length;
        *self == other
    }

    pub(crate) fn add_checker(&mut self, point: u8, side: Side) {
        self.points[usize::from(point - 1)] += side.sign();
    }

    pub(crate) fn remove_checker(&mut self, point: u8, side: Side) {
        self.points[usize::from(point - 1)] -= side.sign();
    }

    pub(crate) fn set_point(&mut self, point: u8, value: i8) {
        self.points[usize::from(point - 1)] = value;
    }

    pub(crate) fn bar_mut(&mut self) -> &mut [u8; 2] {
        &mut self.bar
    }

    pub(crate) fn set_dice(&mut self, dice: [u8; 2]) {
        self.dice = dice;
    }

    pub(crate) fn set_turn(&mut self, turn: Option<Side>) {
        self.turn = turn;
    }

    pub(crate) fn set_cube(&mut self, cube: u32) {
        self.cube = cube;
    }

    pub(crate) fn set_may_double(&mut self, may_double: [bool; 2]) {
        self.may_double = may_double;
    }

    pub(crate) fn set_cube_turned(&mut self, side: Option<Side>) {
        self.cube_turned = side;
    }

    pub(crate) fn set_resigned(&mut self, resigned: Option<(Side, u8)>) {
        self.resigned = resigned;
    }

    pub(crate) fn add_score(&mut self, side: Side, points: u32) {
        self.score[side.index()] += points;
    }
}
