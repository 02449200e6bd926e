//! The two sides of a backgammon board.

use serde::{Deserialize, Serialize};
use strictly_stn::Color;

/// One of the two players.
///
/// White moves from point 24 down to point 1; Black moves up.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum Side {
    /// Moves 24 to 1, enters from 25, bears off to 0.
    White,
    /// Moves 1 to 24, enters from 0, bears off to 25.
    Black,
}

impl Side {
    /// Index into per-side arrays: White 0, Black 1.
    pub fn index(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 1,
        }
    }

    /// The other side.
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Absolute point number of this side's bar.
    pub fn bar_point(self) -> u8 {
        match self {
            Self::White => 25,
            Self::Black => 0,
        }
    }

    /// Absolute point number this side bears off to.
    pub fn off_point(self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => 25,
        }
    }

    /// Converts a point in this side's own numbering (1 = own ace point,
    /// 25 = bar, 0 = off) to the absolute numbering.
    pub fn to_absolute(self, own: u8) -> u8 {
        match self {
            Self::White => own,
            Self::Black => 25 - own.min(25),
        }
    }

    /// Converts an absolute point to this side's own numbering.
    pub fn to_own(self, absolute: u8) -> u8 {
        self.to_absolute(absolute)
    }

    /// Sign of this side's checkers in the point array.
    pub fn sign(self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_numbering_mirrors_for_black() {
        assert_eq!(Side::White.to_absolute(24), 24);
        assert_eq!(Side::Black.to_absolute(24), 1);
        assert_eq!(Side::Black.to_absolute(25), Side::Black.bar_point());
        assert_eq!(Side::Black.to_absolute(0), Side::Black.off_point());
        assert_eq!(Side::Black.to_own(Side::Black.to_absolute(7)), 7);
    }

    #[test]
    fn names_parse() {
        assert_eq!("White".parse::<Side>().unwrap(), Side::White);
        assert_eq!(Side::Black.to_string(), "Black");
        assert_eq!(Side::from(Color::Black), Side::Black);
    }
}
