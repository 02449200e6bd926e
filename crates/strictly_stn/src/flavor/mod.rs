//! Game flavors: per-game property typing and constraints.
//!
//! A flavor maps property identifiers to a [`PropertyHandler`] (value type
//! plus constraint chain) and supplies the game-specific primitives (moves,
//! points, stones). Flavors live in a process-wide registry that is built on
//! first use and read-only afterwards.

mod backgammon;
mod constraints;
mod generic;

pub use backgammon::BackgammonFlavor;
pub use constraints::{
    Constraint, ConstraintContext, DistinctPoints, IsPositiveNumber, IsRootProperty,
    IsSingleValue, MARKUP, MOVE_ANNOTATIONS, MarkupUnique, MoveAnnotationWithMove,
    NODE_ANNOTATIONS, NumberInRange, OneOf, StonesDisjoint, UniqueInFamily, Verdict,
};
pub use generic::GenericFlavor;

use crate::error::{StnError, StnErrorKind};
use crate::value::{Move, Point, Stone, ValueType};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::LazyLock;
use tracing::{debug, instrument};

/// Game id of the generic flavor.
pub const GENERIC_GAME_ID: i64 = 0;

/// Game id of the backgammon flavor.
pub const BACKGAMMON_GAME_ID: i64 = 6;

/// Value type and constraint chain for one property identifier.
#[derive(Debug, Clone, Copy)]
pub struct PropertyHandler {
    /// Type the raw value is cooked into.
    pub value_type: ValueType,
    /// Rules run in order after construction.
    pub constraints: &'static [&'static dyn Constraint],
}

impl PropertyHandler {
    /// Handler without constraints.
    pub const fn plain(value_type: ValueType) -> Self {
        Self {
            value_type,
            constraints: &[],
        }
    }

    /// Handler with a constraint chain.
    pub const fn checked(
        value_type: ValueType,
        constraints: &'static [&'static dyn Constraint],
    ) -> Self {
        Self {
            value_type,
            constraints,
        }
    }
}

/// Property table keyed by identifier.
pub type HandlerTable = HashMap<&'static str, PropertyHandler>;

#[track_caller]
fn unsupported(what: &str, flavor: &str) -> StnError {
    StnError::new(
        StnErrorKind::FlavorUnsupported,
        format!("The {} flavor has no {}", flavor, what),
    )
}

/// Per-game configuration.
pub trait Flavor: Debug + Send + Sync {
    /// Numeric `GM` value.
    fn game_id(&self) -> i64;

    /// Short name for messages.
    fn name(&self) -> &'static str;

    /// Handler for a property identifier, if the flavor knows it.
    fn handler(&self, id: &str) -> Option<&PropertyHandler>;

    /// Cooks move text.
    fn create_move(&self, _text: &str) -> Result<Move, StnError> {
        Err(unsupported("moves", self.name()))
    }

    /// Cooks point text.
    fn create_point(&self, _text: &str) -> Result<Point, StnError> {
        Err(unsupported("points", self.name()))
    }

    /// Cooks stone text.
    fn create_stone(&self, _text: &str) -> Result<Stone, StnError> {
        Err(unsupported("stones", self.name()))
    }

    /// Whether point lists may be written as `[from:to]` runs.
    fn supports_compressed_lists(&self) -> bool {
        false
    }

    /// Expands a `from:to` run into its points.
    fn append_points(&self, _from: &str, _to: &str) -> Result<Vec<Point>, StnError> {
        Err(unsupported("compressed point lists", self.name()))
    }

    /// Writes a point list with consecutive runs collapsed.
    fn write_compressed_list(&self, _points: &[Point]) -> Result<Vec<String>, StnError> {
        Err(unsupported("compressed point lists", self.name()))
    }
}

/// Looks up a flavor by game id.
#[instrument]
pub fn flavor_for(game_id: i64) -> Option<&'static dyn Flavor> {
    match game_id {
        GENERIC_GAME_ID => Some(generic()),
        BACKGAMMON_GAME_ID => Some(backgammon()),
        _ => None,
    }
}

/// The generic flavor, used when a game tree declares none.
pub fn generic() -> &'static dyn Flavor {
    static GENERIC: LazyLock<GenericFlavor> = LazyLock::new(|| {
        debug!("Building generic property table");
        GenericFlavor::new()
    });
    &*GENERIC
}

/// The backgammon flavor.
pub fn backgammon() -> &'static dyn Flavor {
    static BACKGAMMON: LazyLock<BackgammonFlavor> = LazyLock::new(|| {
        debug!("Building backgammon property table");
        BackgammonFlavor::new()
    });
    &*BACKGAMMON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_both_flavors() {
        assert_eq!(flavor_for(0).unwrap().game_id(), GENERIC_GAME_ID);
        assert_eq!(flavor_for(6).unwrap().game_id(), BACKGAMMON_GAME_ID);
        assert!(flavor_for(1).is_none());
    }

    #[test]
    fn generic_flavor_has_no_moves() {
        let err = generic().create_move("64mgms").unwrap_err();
        assert_eq!(err.kind, StnErrorKind::FlavorUnsupported);
        assert!(!generic().supports_compressed_lists());
    }

    #[test]
    fn backgammon_extends_generic() {
        assert!(backgammon().handler("FF").is_some());
        assert!(backgammon().handler("B").is_some());
        assert!(generic().handler("B").is_none());
    }
}
