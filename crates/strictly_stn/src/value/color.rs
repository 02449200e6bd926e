//! Two-state color values.

use crate::error::{StnError, StnErrorKind};
use tracing::instrument;

/// A side in a two-player game record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, strum::EnumIter)]
pub enum Color {
    /// Black.
    #[display("B")]
    Black,
    /// White.
    #[display("W")]
    White,
}

impl Color {
    /// Parses `B`, `W`, `black` or `white` in any letter case.
    #[instrument]
    pub fn parse(text: &str) -> Result<Self, StnError> {
        match text.to_ascii_lowercase().as_str() {
            "b" | "black" => Ok(Self::Black),
            "w" | "white" => Ok(Self::White),
            _ => Err(StnError::new(
                StnErrorKind::SemanticError,
                format!("Invalid color '{}'", text),
            )),
        }
    }

    /// Returns the other color.
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }
}
