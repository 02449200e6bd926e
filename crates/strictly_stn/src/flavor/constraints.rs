//! Constraints run on a property after its value has been constructed.
//!
//! Each constraint is a unit struct with one check, in the same spirit as
//! move preconditions: a chain of small, named rules.

use crate::error::{StnError, StnErrorKind};
use crate::tree::Node;
use crate::value::Value;
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::instrument;

// ─────────────────────────────────────────────────────────────
//  Constraint Trait
// ─────────────────────────────────────────────────────────────

/// What a property is checked against.
#[derive(Debug)]
pub struct ConstraintContext<'a> {
    /// Property identifier.
    pub id: &'a str,
    /// Cooked value about to be stored.
    pub value: &'a Value,
    /// Entry count of the raw source, `None` when re-checking a cooked value.
    pub raw_len: Option<usize>,
    /// Node the property lives in.
    pub node: &'a Node,
    /// Whether the node is the first node of a top-level game tree.
    pub is_root: bool,
}

/// Outcome of a passed constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the property.
    Keep,
    /// Drop the property once the node is cooked; skip later constraints.
    Remove,
}

/// A rule a cooked property must satisfy.
pub trait Constraint: Debug + Send + Sync {
    /// Checks the rule.
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError>;
}

fn semantic(message: String) -> StnError {
    StnError::new(StnErrorKind::SemanticError, message)
}

// ─────────────────────────────────────────────────────────────
//  Value Constraints
// ─────────────────────────────────────────────────────────────

/// The number must be at least 1.
#[derive(Debug)]
pub struct IsPositiveNumber;

impl Constraint for IsPositiveNumber {
    #[instrument(skip(ctx), fields(property = ctx.id))]
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError> {
        match ctx.value.as_number() {
            Some(n) if n >= 1 => Ok(Verdict::Keep),
            _ => Err(semantic(format!("{} must be a positive number", ctx.id))),
        }
    }
}

/// The number must lie in an inclusive range.
#[derive(Debug)]
pub struct NumberInRange {
    /// Lowest allowed value.
    pub min: i64,
    /// Highest allowed value.
    pub max: i64,
}

impl Constraint for NumberInRange {
    #[instrument(skip(ctx), fields(property = ctx.id))]
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError> {
        match ctx.value.as_number() {
            Some(n) if (self.min..=self.max).contains(&n) => Ok(Verdict::Keep),
            _ => Err(semantic(format!(
                "{} must be between {} and {}",
                ctx.id, self.min, self.max
            ))),
        }
    }
}

/// The text must be one of a fixed set of words.
#[derive(Debug)]
pub struct OneOf(pub &'static [&'static str]);

impl Constraint for OneOf {
    #[instrument(skip(ctx), fields(property = ctx.id))]
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError> {
        match ctx.value.as_text() {
            Some(text) if self.0.contains(&text) => Ok(Verdict::Keep),
            _ => Err(semantic(format!(
                "{} must be one of {}",
                ctx.id,
                self.0.join(", ")
            ))),
        }
    }
}

/// The source had exactly one bracketed entry.
#[derive(Debug)]
pub struct IsSingleValue;

impl Constraint for IsSingleValue {
    #[instrument(skip(ctx), fields(property = ctx.id))]
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError> {
        match ctx.raw_len {
            Some(len) if len != 1 => Err(StnError::new(
                StnErrorKind::ListTooLong,
                format!("{} takes a single value, got {}", ctx.id, len),
            )),
            _ => Ok(Verdict::Keep),
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Node Constraints
// ─────────────────────────────────────────────────────────────

/// The property lives in the first node of a top-level game tree.
#[derive(Debug)]
pub struct IsRootProperty;

impl Constraint for IsRootProperty {
    #[instrument(skip(ctx), fields(property = ctx.id))]
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError> {
        if ctx.is_root {
            Ok(Verdict::Keep)
        } else {
            Err(semantic(format!("{} is only allowed in a root node", ctx.id)))
        }
    }
}

/// Identifiers of mutually exclusive move annotations.
pub const MOVE_ANNOTATIONS: &[&str] = &["BM", "DO", "IT", "TE"];

/// Identifiers of mutually exclusive node annotations.
pub const NODE_ANNOTATIONS: &[&str] = &["DM", "GB", "GW", "UC"];

/// Identifiers of the point markup family.
pub const MARKUP: &[&str] = &["CR", "MA", "SL", "SQ", "TR"];

/// At most one identifier of a family is present in the node.
#[derive(Debug)]
pub struct UniqueInFamily(pub &'static [&'static str]);

impl Constraint for UniqueInFamily {
    #[instrument(skip(ctx), fields(property = ctx.id))]
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError> {
        let present: Vec<&str> = self
            .0
            .iter()
            .copied()
            .filter(|id| ctx.node.has_property(id) && !ctx.node.losers().iter().any(|l| l == id))
            .collect();
        if present.len() > 1 {
            return Err(semantic(format!(
                "Properties {} exclude each other",
                present.join(", ")
            )));
        }
        Ok(Verdict::Keep)
    }
}

/// Move annotations only make sense next to a move; without one they are dropped.
#[derive(Debug)]
pub struct MoveAnnotationWithMove;

impl Constraint for MoveAnnotationWithMove {
    #[instrument(skip(ctx), fields(property = ctx.id))]
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError> {
        if ctx.node.has_property("B") || ctx.node.has_property("W") {
            Ok(Verdict::Keep)
        } else {
            Ok(Verdict::Remove)
        }
    }
}

fn point_keys(value: &Value) -> Vec<u8> {
    match value {
        Value::Point(p) => vec![p.value()],
        Value::Stone(s) => vec![s.value()],
        Value::List(list) => list.items().iter().flat_map(point_keys).collect(),
        _ => Vec::new(),
    }
}

/// No point is covered by two markup identifiers of the node.
#[derive(Debug)]
pub struct MarkupUnique;

impl Constraint for MarkupUnique {
    #[instrument(skip(ctx), fields(property = ctx.id))]
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError> {
        let own: BTreeSet<u8> = point_keys(ctx.value).into_iter().collect();
        for other in MARKUP.iter().filter(|id| **id != ctx.id) {
            let Some(value) = ctx.node.value(other) else {
                continue;
            };
            if value.is_raw() {
                continue;
            }
            if let Some(point) = point_keys(value).into_iter().find(|p| own.contains(p)) {
                return Err(StnError::new(
                    StnErrorKind::NonUniquePoint,
                    format!("Point {} marked by both {} and {}", point, ctx.id, other),
                ));
            }
        }
        Ok(Verdict::Keep)
    }
}

/// A point list must not name a point twice.
#[derive(Debug)]
pub struct DistinctPoints;

impl Constraint for DistinctPoints {
    #[instrument(skip(ctx), fields(property = ctx.id))]
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError> {
        let mut seen = BTreeSet::new();
        for point in point_keys(ctx.value) {
            if !seen.insert(point) {
                return Err(StnError::new(
                    StnErrorKind::NonUniquePoint,
                    format!("Point {} occurs twice in {}", point, ctx.id),
                ));
            }
        }
        Ok(Verdict::Keep)
    }
}

/// Black and white setup stones never share a point.
#[derive(Debug)]
pub struct StonesDisjoint;

impl Constraint for StonesDisjoint {
    #[instrument(skip(ctx), fields(property = ctx.id))]
    fn check(&self, ctx: &ConstraintContext<'_>) -> Result<Verdict, StnError> {
        let other = if ctx.id == "AB" { "AW" } else { "AB" };
        let Some(value) = ctx.node.value(other).filter(|v| !v.is_raw()) else {
            return Ok(Verdict::Keep);
        };
        let own: BTreeSet<u8> = point_keys(ctx.value).into_iter().collect();
        if let Some(stone) = point_keys(value).into_iter().find(|s| own.contains(s)) {
            return Err(StnError::new(
                StnErrorKind::NonUniqueStone,
                format!("Point {} has stones of both colors", stone),
            ));
        }
        Ok(Verdict::Keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Collection;
    use crate::value::{ListBuilder, Point, ValueKind};

    fn point_list(points: &[u8]) -> Value {
        let mut builder = ListBuilder::new(ValueKind::Point);
        for p in points {
            builder.append(Value::Point(Point::new(*p).unwrap())).unwrap();
        }
        Value::List(builder.build().unwrap())
    }

    #[test]
    fn positive_number() {
        let mut collection = Collection::new();
        let tree = collection.add_game_tree(None);
        let node = collection.add_node(tree);
        let node = collection.node(node);
        let zero = Value::Number(0);
        let ctx = ConstraintContext {
            id: "CV",
            value: &zero,
            raw_len: Some(1),
            node,
            is_root: true,
        };
        assert_eq!(
            IsPositiveNumber.check(&ctx).unwrap_err().kind,
            StnErrorKind::SemanticError
        );
    }

    #[test]
    fn markup_overlap_is_detected() {
        let mut collection = Collection::new();
        let tree = collection.add_game_tree(None);
        let id = collection.add_node(tree);
        collection
            .node_mut(id)
            .add_property("CR", point_list(&[2, 3]))
            .unwrap();
        let candidate = point_list(&[3, 9]);
        let ctx = ConstraintContext {
            id: "SQ",
            value: &candidate,
            raw_len: Some(2),
            node: collection.node(id),
            is_root: false,
        };
        assert_eq!(
            MarkupUnique.check(&ctx).unwrap_err().kind,
            StnErrorKind::NonUniquePoint
        );
    }

    #[test]
    fn move_annotation_without_move_is_removed() {
        let mut collection = Collection::new();
        let tree = collection.add_game_tree(None);
        let id = collection.add_node(tree);
        let grade = Value::Empty;
        let ctx = ConstraintContext {
            id: "DO",
            value: &grade,
            raw_len: Some(1),
            node: collection.node(id),
            is_root: false,
        };
        assert_eq!(MoveAnnotationWithMove.check(&ctx).unwrap(), Verdict::Remove);
    }

    #[test]
    fn duplicate_points_in_one_list() {
        let mut collection = Collection::new();
        let tree = collection.add_game_tree(None);
        let id = collection.add_node(tree);
        let list = point_list(&[4, 4]);
        let ctx = ConstraintContext {
            id: "AE",
            value: &list,
            raw_len: Some(2),
            node: collection.node(id),
            is_root: false,
        };
        assert_eq!(
            DistinctPoints.check(&ctx).unwrap_err().kind,
            StnErrorKind::NonUniquePoint
        );
    }
}
