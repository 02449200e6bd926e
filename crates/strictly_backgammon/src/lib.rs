//! Strictly Backgammon - backgammon match records
//!
//! A match model with enforced rules, persistence in the match dump format,
//! readers for legacy transcripts, conversion to and from tree notation, and
//! a tracker that follows live matches from observed positions.
//!
//! # Architecture
//!
//! - **Model**: sides, positions, actions, games and matches
//! - **Rules**: movement legality, the move generator and contracts on every action
//! - **Formats**: match dump (read, write, incremental append), JF and JFibs
//!   (read), tree notation through `strictly_stn`
//! - **Tracker**: reconciles observed positions with the recorded match
//! - **Import**: background worker feeding a message queue
//!
//! # Example
//!
//! ```
//! use strictly_backgammon::{GameAction, Match, Side, to_md_string};
//!
//! # fn example() -> Result<(), strictly_backgammon::MatchError> {
//! let mut record = Match::new("alice", "bob", 5, true);
//! record.append_game()?;
//! record.add_action(Side::White, GameAction::Roll([3, 1]), Some(0))?;
//! let text = to_md_string(&record)?;
//! assert!(text.starts_with("MatchDump"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod action;
mod config;
mod contracts;
mod error;
mod format;
mod game;
mod import;
mod invariants;
mod jf;
mod jfibs;
mod md;
mod position;
mod rules;
mod side;
mod stn;
mod tracker;

// Crate-level exports - Errors
pub use error::{MatchError, MatchErrorKind};

// Crate-level exports - Model
pub use action::{ActionRecord, ActionVerb, EndCause, GameAction, GameEnd, Step};
pub use game::{Game, Match, Rank};
pub use position::{CHECKERS, Position, STARTING_POINTS};
pub use side::Side;

// Crate-level exports - Rules and contracts
pub use contracts::{
    ActionContract, Contract, DiceValid, DoubleOffered, NothingPending, ResignationOffered,
    SidesTurn,
};
pub use invariants::{
    CheckerLimitInvariant, CubePowerInvariant, DiceRangeInvariant, Invariant, InvariantSet,
    InvariantViolation, PositionInvariants,
};
pub use rules::{LegalMove, apply, bear_off_multiplier, legal_moves, play_move, step_target};

// Crate-level exports - Formats
pub use format::{MatchFormat, read_match, write_match};
pub use jf::{JF_MAGIC, read_jf};
pub use jfibs::read_jfibs;
pub use md::{
    MAGIC, MdWriter, VERSION, action_line, read_md, read_md_file, to_md_string, write_md,
};
pub use stn::{collection_to_match, match_to_collection, read_stn, write_stn};

// Crate-level exports - Tracking and import
pub use config::TrackerConfig;
pub use import::{
    CancelFlag, ImportJob, ImportMessage, ImportQueue, run_import, spawn_importer,
};
pub use tracker::{Archive, PlanStep, RenameArchive, TrackOutcome, Tracker, plan};
