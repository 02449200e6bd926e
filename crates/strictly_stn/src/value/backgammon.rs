//! Backgammon points, stones and moves.
//!
//! Points are written as one letter, `a` for 0 through `z` for 25. A regular
//! move is two dice digits followed by up to four from/to letter pairs, e.g.
//! `64mgms`. Cube and resignation actions are spelled out as words.

use crate::error::{StnError, StnErrorKind};
use tracing::instrument;

/// Highest point number on a backgammon board including bar and off.
pub const MAX_POINT: u8 = 25;

/// Most sub-moves a single move can have (doublets).
pub const MAX_SUB_MOVES: usize = 4;

fn point_char(value: u8) -> char {
    char::from(b'a' + value)
}

fn point_from_char(c: char) -> Option<u8> {
    match c {
        'a'..='z' => Some(c as u8 - b'a'),
        _ => None,
    }
}

/// A point on the board, 0..=25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point(u8);

impl Point {
    /// Creates a point, failing with `IllegalPoint` outside 0..=25.
    #[instrument]
    pub fn new(value: u8) -> Result<Self, StnError> {
        if value > MAX_POINT {
            return Err(StnError::new(
                StnErrorKind::IllegalPoint,
                format!("Point {} is off the board", value),
            ));
        }
        Ok(Self(value))
    }

    /// Parses the one-letter form.
    #[instrument]
    pub fn parse(text: &str) -> Result<Self, StnError> {
        let mut chars = text.chars();
        match (chars.next().and_then(point_from_char), chars.next()) {
            (Some(value), None) => Ok(Self(value)),
            _ => Err(StnError::new(
                StnErrorKind::IllegalPoint,
                format!("Invalid point '{}'", text),
            )),
        }
    }

    /// Numeric value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// One-letter form.
    pub fn to_char(self) -> char {
        point_char(self.0)
    }
}

/// A checker placed on a point during setup, 0..=25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stone(u8);

impl Stone {
    /// Creates a stone, failing with `IllegalStone` outside 0..=25.
    #[instrument]
    pub fn new(value: u8) -> Result<Self, StnError> {
        if value > MAX_POINT {
            return Err(StnError::new(
                StnErrorKind::IllegalStone,
                format!("Stone {} is off the board", value),
            ));
        }
        Ok(Self(value))
    }

    /// Parses the one-letter form.
    #[instrument]
    pub fn parse(text: &str) -> Result<Self, StnError> {
        Point::parse(text).map(|p| Self(p.0)).map_err(|_| {
            StnError::new(StnErrorKind::IllegalStone, format!("Invalid stone '{}'", text))
        })
    }

    /// Numeric value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// One-letter form.
    pub fn to_char(self) -> char {
        point_char(self.0)
    }
}

/// A checker movement from one point to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubMove {
    /// Origin.
    pub from: Point,
    /// Destination.
    pub to: Point,
}

/// What a move record does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MoveKind {
    /// Dice roll with the checkers moved for it.
    Regular {
        /// The two dice, each 1..=6.
        dice: [u8; 2],
        /// Zero to four checker movements.
        sub_moves: Vec<SubMove>,
    },
    /// Cube offered.
    Double,
    /// Cube accepted.
    Take,
    /// Cube refused.
    Drop,
    /// Resignation offered for the given value.
    Resign(u32),
    /// Resignation accepted.
    Accept,
    /// Resignation rejected.
    Reject,
}

/// A backgammon move.
///
/// A move cooked from text remembers its spelling when the text used the
/// digit shorthand for points, so the writer reproduces the input.
#[derive(Debug, Clone, Eq)]
pub struct Move {
    kind: MoveKind,
    spelling: Option<String>,
}

impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

fn move_error(message: impl Into<String>) -> StnError {
    StnError::new(StnErrorKind::IllegalMove, message)
}

fn move_point(c: char) -> Option<(u8, bool)> {
    match c {
        'a'..='z' => point_from_char(c).map(|v| (v, false)),
        '0'..='9' => Some((c as u8 - b'0', true)),
        _ => None,
    }
}

impl Move {
    /// Creates a regular move, validating dice and sub-move count.
    #[instrument]
    pub fn regular(dice: [u8; 2], sub_moves: Vec<SubMove>) -> Result<Self, StnError> {
        if dice.iter().any(|d| !(1..=6).contains(d)) {
            return Err(move_error(format!("Invalid dice {}{}", dice[0], dice[1])));
        }
        if sub_moves.len() > MAX_SUB_MOVES {
            return Err(move_error(format!(
                "{} sub-moves exceed the maximum of {}",
                sub_moves.len(),
                MAX_SUB_MOVES
            )));
        }
        Ok(Self {
            kind: MoveKind::Regular { dice, sub_moves },
            spelling: None,
        })
    }

    /// Creates a non-regular move.
    #[instrument]
    pub fn action(kind: MoveKind) -> Result<Self, StnError> {
        match kind {
            MoveKind::Regular { dice, sub_moves } => Self::regular(dice, sub_moves),
            MoveKind::Resign(0) => Err(move_error("Resignation value must be positive")),
            kind => Ok(Self {
                kind,
                spelling: None,
            }),
        }
    }

    /// What the move does.
    pub fn kind(&self) -> &MoveKind {
        &self.kind
    }

    /// Parses the textual form.
    #[instrument]
    pub fn parse(text: &str) -> Result<Self, StnError> {
        match text {
            "double" => return Self::action(MoveKind::Double),
            "take" => return Self::action(MoveKind::Take),
            "drop" => return Self::action(MoveKind::Drop),
            "accept" => return Self::action(MoveKind::Accept),
            "reject" => return Self::action(MoveKind::Reject),
            _ => {}
        }
        if let Some(value) = text.strip_prefix("resign:") {
            let value = value
                .parse::<u32>()
                .map_err(|_| move_error(format!("Invalid resignation '{}'", text)))?;
            return Self::action(MoveKind::Resign(value));
        }

        let chars: Vec<char> = text.chars().collect();
        if chars.len() < 2 {
            return Err(move_error(format!("Invalid move '{}'", text)));
        }
        let mut dice = [0u8; 2];
        for (die, c) in dice.iter_mut().zip(&chars[..2]) {
            *die = c
                .to_digit(10)
                .map(|d| d as u8)
                .ok_or_else(|| move_error(format!("Invalid dice in '{}'", text)))?;
        }

        let rest = &chars[2..];
        if rest.len() % 2 != 0 {
            return Err(move_error(format!("Unpaired point in move '{}'", text)));
        }
        let mut shorthand = false;
        let mut sub_moves = Vec::with_capacity(rest.len() / 2);
        for pair in rest.chunks(2) {
            let (Some((from, a)), Some((to, b))) = (move_point(pair[0]), move_point(pair[1])) else {
                return Err(move_error(format!("Invalid point in move '{}'", text)));
            };
            shorthand |= a || b;
            sub_moves.push(SubMove {
                from: Point(from),
                to: Point(to),
            });
        }

        let mut mv = Self::regular(dice, sub_moves)?;
        if shorthand {
            mv.spelling = Some(text.to_string());
        }
        Ok(mv)
    }

    /// Writes the textual form.
    pub fn format(&self) -> String {
        if let Some(spelling) = &self.spelling {
            return spelling.clone();
        }
        match &self.kind {
            MoveKind::Regular { dice, sub_moves } => {
                let mut out = format!("{}{}", dice[0], dice[1]);
                for sub in sub_moves {
                    out.push(sub.from.to_char());
                    out.push(sub.to.to_char());
                }
                out
            }
            MoveKind::Double => "double".to_string(),
            MoveKind::Take => "take".to_string(),
            MoveKind::Drop => "drop".to_string(),
            MoveKind::Resign(value) => format!("resign:{}", value),
            MoveKind::Accept => "accept".to_string(),
            MoveKind::Reject => "reject".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_cover_bar_and_off() {
        assert_eq!(Point::new(0).unwrap().to_char(), 'a');
        assert_eq!(Point::new(25).unwrap().to_char(), 'z');
        assert_eq!(Point::new(26).unwrap_err().kind, StnErrorKind::IllegalPoint);
        assert_eq!(Point::parse("c").unwrap().value(), 2);
        assert_eq!(Point::parse("cd").unwrap_err().kind, StnErrorKind::IllegalPoint);
        assert_eq!(Stone::new(26).unwrap_err().kind, StnErrorKind::IllegalStone);
        assert_eq!(Stone::parse("A").unwrap_err().kind, StnErrorKind::IllegalStone);
    }

    #[test]
    fn sub_move_counts() {
        let sub = SubMove {
            from: Point::new(13).unwrap(),
            to: Point::new(7).unwrap(),
        };
        for count in 0..=4 {
            assert!(Move::regular([6, 6], vec![sub; count]).is_ok());
        }
        assert_eq!(
            Move::regular([6, 6], vec![sub; 5]).unwrap_err().kind,
            StnErrorKind::IllegalMove
        );
    }

    #[test]
    fn regular_move_text() {
        let mv = Move::parse("64mgms").unwrap();
        let MoveKind::Regular { dice, sub_moves } = mv.kind() else {
            panic!("expected regular move");
        };
        assert_eq!(dice, &[6, 4]);
        assert_eq!(sub_moves.len(), 2);
        assert_eq!(sub_moves[0].from.value(), 12);
        assert_eq!(mv.format(), "64mgms");
    }

    #[test]
    fn digit_shorthand_keeps_spelling() {
        let mv = Move::parse("64a2e3").unwrap();
        assert_eq!(mv.format(), "64a2e3");
        let MoveKind::Regular { sub_moves, .. } = mv.kind() else {
            panic!("expected regular move");
        };
        assert_eq!(sub_moves.len(), 2);
    }

    #[test]
    fn cube_and_resign_words() {
        assert_eq!(Move::parse("double").unwrap().kind(), &MoveKind::Double);
        assert_eq!(Move::parse("resign:2").unwrap().kind(), &MoveKind::Resign(2));
        assert_eq!(Move::parse("resign:2").unwrap().format(), "resign:2");
        assert_eq!(Move::parse("resign:0").unwrap_err().kind, StnErrorKind::IllegalMove);
    }

    #[test]
    fn malformed_moves_are_rejected() {
        for bad in ["", "6", "70", "64a", "64ab!c", "64abcdefghij"] {
            assert_eq!(
                Move::parse(bad).unwrap_err().kind,
                StnErrorKind::IllegalMove,
                "{} should be rejected",
                bad
            );
        }
    }
}
