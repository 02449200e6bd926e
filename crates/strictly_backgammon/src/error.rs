//! Error types for the match model, its file formats and the tracker.

use derive_more::{Display, Error};
use strictly_stn::{StnError, StnErrorKind};
use tracing::instrument;

/// Category of a match failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MatchErrorKind {
    /// Malformed match file.
    #[display("syntax error")]
    Syntax,
    /// The action is not allowed in the current position.
    #[display("illegal action")]
    IllegalAction,
    /// A constructor received out-of-range data.
    #[display("invalid argument")]
    InvalidArgument,
    /// Reading or writing a file failed.
    #[display("I/O error")]
    Io,
    /// Tree notation failure.
    #[display("tree notation: {}", _0)]
    Stn(StnErrorKind),
    /// Configuration could not be loaded.
    #[display("config error")]
    Config,
    /// Work stopped because cancellation was requested.
    #[display("cancelled")]
    Cancelled,
}

/// Match error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{}: {}", kind, message)]
pub struct MatchError {
    /// Failure category.
    pub kind: MatchErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Line of the input file, for reader failures.
    pub line_number: Option<usize>,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl MatchError {
    /// Creates a new error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message), fields(kind = %kind))]
    pub fn new(kind: MatchErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line_number: None,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for an illegal action.
    #[track_caller]
    pub fn illegal(message: impl Into<String>) -> Self {
        Self::new(MatchErrorKind::IllegalAction, message)
    }

    /// Shorthand for a syntax error on an input line.
    #[track_caller]
    pub fn syntax(line_number: usize, message: impl Into<String>) -> Self {
        Self::new(MatchErrorKind::Syntax, message).at_line(line_number)
    }

    /// Attaches an input line number unless one is already set.
    pub fn at_line(mut self, line_number: usize) -> Self {
        if self.line_number.is_none() {
            self.line_number = Some(line_number);
        }
        self
    }

    /// Returns the failure category.
    pub fn kind(&self) -> MatchErrorKind {
        self.kind
    }
}

impl From<StnError> for MatchError {
    #[track_caller]
    fn from(err: StnError) -> Self {
        Self::new(MatchErrorKind::Stn(err.kind), err.message)
    }
}

impl From<std::io::Error> for MatchError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(MatchErrorKind::Io, format!("I/O error: {}", err))
    }
}
