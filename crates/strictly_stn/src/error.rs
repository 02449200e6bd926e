//! Error types for parsing, cooking and writing tree notation.

use derive_more::{Display, Error};
use tracing::instrument;

use crate::tree::Culprit;

/// Category of a tree notation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StnErrorKind {
    /// A collection without game trees cannot be written.
    #[display("empty collection")]
    EmptyCollection,
    /// A property without any value cannot be written.
    #[display("empty property")]
    EmptyProperty,
    /// The flavor does not provide the requested game-specific type.
    #[display("flavor unsupported")]
    FlavorUnsupported,
    /// A variation declares a flavor different from its root tree.
    #[display("flavor mismatch")]
    FlavorMismatch,
    /// Malformed input.
    #[display("syntax error")]
    Syntax,
    /// A property with the same identifier already exists in the node.
    #[display("property exists")]
    PropertyExists,
    /// Broken internal state.
    #[display("internal error")]
    InternalError,
    /// Text that should be a number is not one.
    #[display("invalid number")]
    InvalidNumber,
    /// A real value is NaN.
    #[display("not a number")]
    NotANumber,
    /// More values than the property allows.
    #[display("list too long")]
    ListTooLong,
    /// No values where at least one is required.
    #[display("list empty")]
    ListEmpty,
    /// The value is well-formed but violates a property rule.
    #[display("semantic error")]
    SemanticError,
    /// Malformed or out-of-range move.
    #[display("illegal move")]
    IllegalMove,
    /// Point outside the board.
    #[display("illegal point")]
    IllegalPoint,
    /// Stone outside the board.
    #[display("illegal stone")]
    IllegalStone,
    /// The API was used in a way it does not support.
    #[display("usage error")]
    UsageError,
    /// A point occurs more than once where it must be unique.
    #[display("non-unique point")]
    NonUniquePoint,
    /// A stone occurs more than once where it must be unique.
    #[display("non-unique stone")]
    NonUniqueStone,
    /// A double grade other than 1 or 2.
    #[display("double out of range")]
    DoubleOutOfRange,
    /// Malformed or impossible calendar date.
    #[display("invalid date format")]
    InvalidDateFormat,
    /// Reading or writing the underlying stream failed.
    #[display("I/O error")]
    Io,
    /// Typed constructor received out-of-range data.
    #[display("invalid argument")]
    InvalidArgument,
}

/// Line and column (both 1-based) in the scanned input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{}:{}", line, column)]
pub struct TextLocation {
    /// Line number.
    pub line: usize,
    /// Column number.
    pub column: usize,
}

/// Tree notation error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{}: {}", kind, message)]
pub struct StnError {
    /// Failure category.
    pub kind: StnErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Position in the input, for parse failures.
    pub location: Option<TextLocation>,
    /// Offending token, for parse failures.
    pub token: Option<String>,
    /// Tree component that failed to cook.
    pub culprit: Option<Culprit>,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StnError {
    /// Creates a new error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message), fields(kind = %kind))]
    pub fn new(kind: StnErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            location: None,
            token: None,
            culprit: None,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Creates a syntax error at a position in the input.
    #[track_caller]
    pub fn syntax(location: TextLocation, expected: &str, token: impl Into<String>) -> Self {
        let token = token.into();
        let mut err = Self::new(
            StnErrorKind::Syntax,
            format!("{}: expected {}, got {}", location, expected, token),
        );
        err.location = Some(location);
        err.token = Some(token);
        err
    }

    /// Attaches the component that caused a cook failure, keeping an inner culprit.
    pub fn with_culprit(mut self, culprit: Culprit) -> Self {
        if self.culprit.is_none() {
            self.culprit = Some(culprit);
        }
        self
    }

    /// Returns the failure category.
    pub fn kind(&self) -> StnErrorKind {
        self.kind
    }
}

impl From<std::io::Error> for StnError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(StnErrorKind::Io, format!("I/O error: {}", err))
    }
}
