//! Game results such as `W+7.5R`, `B+`, `0` or `Void`.

use super::number::{format_real, parse_real};
use crate::error::{StnError, StnErrorKind};
use tracing::instrument;

/// Who won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winner {
    /// Black won.
    Black,
    /// White won.
    White,
    /// Nobody won.
    Draw,
    /// The game was annulled.
    Void,
    /// The result is not known.
    Unknown,
}

/// Why the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum ResultCause {
    /// Played to the end.
    #[strum(to_string = "")]
    Normal,
    /// The loser resigned.
    #[strum(to_string = "R", serialize = "Resign")]
    Resignation,
    /// The loser ran out of time.
    #[strum(to_string = "T", serialize = "Time")]
    Time,
    /// The loser forfeited.
    #[strum(to_string = "F", serialize = "Forfeit")]
    Forfeit,
    /// Any other reason.
    #[strum(to_string = "O", serialize = "Other")]
    Other,
}

/// Result of a game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameResult {
    winner: Winner,
    score: f64,
    cause: ResultCause,
}

fn result_error(text: &str) -> StnError {
    StnError::new(StnErrorKind::SemanticError, format!("Invalid result '{}'", text))
}

impl GameResult {
    /// Creates a result; the score must be finite and non-negative.
    #[instrument]
    pub fn new(winner: Winner, score: f64, cause: ResultCause) -> Result<Self, StnError> {
        if !score.is_finite() || score < 0.0 {
            return Err(StnError::new(
                StnErrorKind::InvalidArgument,
                format!("Invalid result score {}", score),
            ));
        }
        Ok(Self {
            winner,
            score,
            cause,
        })
    }

    /// Winner.
    pub fn winner(&self) -> Winner {
        self.winner
    }

    /// Score margin; zero when not given.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Cause of the game end.
    pub fn cause(&self) -> ResultCause {
        self.cause
    }

    /// Parses the textual form.
    ///
    /// Shortcuts: `0` and `Draw` for a draw, `Void`, `?` for unknown, and
    /// `W+Resign`/`B+Time`/`W+Forfeit` spelled out.
    #[instrument]
    pub fn parse(text: &str) -> Result<Self, StnError> {
        match text {
            "0" | "Draw" | "draw" => return Self::new(Winner::Draw, 0.0, ResultCause::Normal),
            "Void" | "void" => return Self::new(Winner::Void, 0.0, ResultCause::Normal),
            "?" => return Self::new(Winner::Unknown, 0.0, ResultCause::Normal),
            _ => {}
        }

        let (winner, rest) = match text.split_at_checked(2) {
            Some(("W+", rest)) => (Winner::White, rest),
            Some(("B+", rest)) => (Winner::Black, rest),
            _ => return Err(result_error(text)),
        };

        let split = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, cause) = rest.split_at(split);
        let score = if number.is_empty() {
            0.0
        } else {
            parse_real(number).map_err(|_| result_error(text))?
        };
        let cause = cause
            .parse::<ResultCause>()
            .map_err(|_| result_error(text))?;
        Self::new(winner, score, cause)
    }

    /// Writes the canonical textual form.
    pub fn format(&self) -> Result<String, StnError> {
        let prefix = match self.winner {
            Winner::Draw => return Ok("0".to_string()),
            Winner::Void => return Ok("Void".to_string()),
            Winner::Unknown => return Ok("?".to_string()),
            Winner::White => "W+",
            Winner::Black => "B+",
        };
        let score = if self.score == 0.0 {
            String::new()
        } else {
            format_real(self.score)?
        };
        Ok(format!("{}{}{}", prefix, score, self.cause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_and_cause_combine() {
        let result = GameResult::parse("W+7.5R").unwrap();
        assert_eq!(result.winner(), Winner::White);
        assert_eq!(result.score(), 7.5);
        assert_eq!(result.cause(), ResultCause::Resignation);
        assert_eq!(result.format().unwrap(), "W+7.5R");
    }

    #[test]
    fn shortcuts_are_understood() {
        assert_eq!(GameResult::parse("0").unwrap().winner(), Winner::Draw);
        assert_eq!(GameResult::parse("Draw").unwrap().winner(), Winner::Draw);
        assert_eq!(GameResult::parse("Void").unwrap().winner(), Winner::Void);
        assert_eq!(GameResult::parse("?").unwrap().winner(), Winner::Unknown);
        let resign = GameResult::parse("B+Resign").unwrap();
        assert_eq!(resign.cause(), ResultCause::Resignation);
        assert_eq!(resign.format().unwrap(), "B+R");
        assert_eq!(GameResult::parse("W+T").unwrap().cause(), ResultCause::Time);
    }

    #[test]
    fn bare_win_has_no_score() {
        let result = GameResult::parse("B+").unwrap();
        assert_eq!(result.score(), 0.0);
        assert_eq!(result.cause(), ResultCause::Normal);
        assert_eq!(result.format().unwrap(), "B+");
    }

    #[test]
    fn garbage_is_rejected() {
        for bad in ["X+1", "W", "W+1.2.3", "W+5Q", ""] {
            assert!(GameResult::parse(bad).is_err(), "{} should be rejected", bad);
        }
    }
}
