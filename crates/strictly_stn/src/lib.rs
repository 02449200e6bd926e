//! Strictly STN - typed game records in tree notation
//!
//! Parses Standard Tree Notation into an arena tree, cooks raw property
//! values into typed values according to the game flavor, and writes trees
//! back out in a canonical form.
//!
//! # Architecture
//!
//! - **Values**: typed property payloads (numbers, text, dates, moves, points)
//! - **Tree**: collection, game trees, nodes and properties with integer handles
//! - **Parser**: scanner plus state machine, with charset normalization to UTF-8
//! - **Flavors**: per-game property tables and constraints (generic, backgammon)
//! - **Cook**: raw to typed conversion with culprit reporting
//! - **Writer**: canonical output with a fixed property prelude
//!
//! # Example
//!
//! ```
//! use strictly_stn::{WriterOptions, cook, parse, to_string};
//!
//! # fn example() -> Result<(), strictly_stn::StnError> {
//! let mut collection = parse(b"(;FF[4]GM[6];B[64mgms])")?;
//! cook(&mut collection)?;
//! let text = to_string(&collection, &WriterOptions::default())?;
//! assert!(text.contains(";B[64mgms]"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod charset;
mod cook;
mod error;
mod flavor;
mod parser;
mod scanner;
mod text;
mod tree;
mod value;
mod writer;

// Crate-level exports - Errors
pub use error::{StnError, StnErrorKind, TextLocation};

// Crate-level exports - Text helpers
pub use charset::Charset;
pub use text::{TextMode, escape, normalize_spaces, split_compose, unescape};

// Crate-level exports - Values
pub use value::{
    Color, Compose, Date, DateEntry, DoubleGrade, GameResult, ListBuilder, ListOf, MAX_POINT,
    MAX_SUB_MOVES, Move, MoveKind, Point, Raw, ResultCause, Stone, SubMove, Value, ValueKind,
    ValueType, Winner, format_real, parse_number, parse_real,
};

// Crate-level exports - Tree
pub use tree::{Collection, Culprit, GameTree, GameTreeId, Node, NodeId, Property};

// Crate-level exports - Parsing
pub use parser::{parse, parse_reader};
pub use scanner::{Scanner, Token};

// Crate-level exports - Flavors and cooking
pub use cook::{cook, cook_node, flavor_of};
pub use flavor::{
    BACKGAMMON_GAME_ID, BackgammonFlavor, Constraint, ConstraintContext, Flavor,
    GENERIC_GAME_ID, GenericFlavor, PropertyHandler, Verdict, backgammon, flavor_for, generic,
};

// Crate-level exports - Writing
pub use writer::{PRELUDE, WriterOptions, to_bytes, to_string, write_collection};

/// Parses and cooks in one step.
pub fn read(input: &[u8]) -> Result<Collection, StnError> {
    let mut collection = parse(input)?;
    cook(&mut collection)?;
    Ok(collection)
}
