//! Backgammon flavor (`GM[6]`): moves, points, stones and compressed point lists.

use super::generic::generic_table;
use super::{
    BACKGAMMON_GAME_ID, Constraint, DistinctPoints, Flavor, HandlerTable, IsPositiveNumber,
    IsSingleValue, MARKUP, MarkupUnique, OneOf, PropertyHandler, StonesDisjoint,
};
use crate::error::{StnError, StnErrorKind};
use crate::value::{Move, Point, Stone, ValueType};
use tracing::instrument;

const POINTS: ValueType = ValueType::List(&ValueType::Point);
const STONES: ValueType = ValueType::List(&ValueType::Stone);
const OPTIONAL_POINTS: ValueType = ValueType::EList(&ValueType::Point);
const LINES: ValueType = ValueType::List(&ValueType::Compose(&ValueType::Point, &ValueType::Point));
const LABELS: ValueType = ValueType::List(&ValueType::Compose(
    &ValueType::Point,
    &ValueType::SimpleText,
));
const MATCH_INFO: ValueType = ValueType::List(&ValueType::Compose(
    &ValueType::SimpleText,
    &ValueType::SimpleText,
));

const SINGLE: &[&dyn Constraint] = &[&IsSingleValue];
const SETUP: &[&dyn Constraint] = &[&StonesDisjoint];
const CLEAR: &[&dyn Constraint] = &[&DistinctPoints];
const MARKUP_RULES: &[&dyn Constraint] = &[&MarkupUnique];
const CUBE: &[&dyn Constraint] = &[&IsSingleValue, &IsPositiveNumber];
const CUBE_OWNER: &[&dyn Constraint] = &[&OneOf(&["b", "w", "c"])];

/// Flavor for backgammon game records.
#[derive(Debug)]
pub struct BackgammonFlavor {
    table: HandlerTable,
}

impl BackgammonFlavor {
    /// Builds the flavor: the generic table plus backgammon properties.
    pub fn new() -> Self {
        let mut table = generic_table();

        table.insert("B", PropertyHandler::checked(ValueType::Move, SINGLE));
        table.insert("W", PropertyHandler::checked(ValueType::Move, SINGLE));

        table.insert("AB", PropertyHandler::checked(STONES, SETUP));
        table.insert("AW", PropertyHandler::checked(STONES, SETUP));
        table.insert("AE", PropertyHandler::checked(POINTS, CLEAR));

        for id in MARKUP {
            table.insert(*id, PropertyHandler::checked(POINTS, MARKUP_RULES));
        }
        table.insert("AR", PropertyHandler::plain(LINES));
        table.insert("LN", PropertyHandler::plain(LINES));
        table.insert("LB", PropertyHandler::plain(LABELS));
        table.insert("DD", PropertyHandler::plain(OPTIONAL_POINTS));
        table.insert("VW", PropertyHandler::plain(OPTIONAL_POINTS));

        table.insert("CV", PropertyHandler::checked(ValueType::Number, CUBE));
        table.insert("CO", PropertyHandler::checked(ValueType::SimpleText, CUBE_OWNER));
        table.insert("DI", PropertyHandler::plain(ValueType::Number));
        table.insert("MI", PropertyHandler::plain(MATCH_INFO));

        Self { table }
    }
}

impl Default for BackgammonFlavor {
    fn default() -> Self {
        Self::new()
    }
}

impl Flavor for BackgammonFlavor {
    fn game_id(&self) -> i64 {
        BACKGAMMON_GAME_ID
    }

    fn name(&self) -> &'static str {
        "backgammon"
    }

    fn handler(&self, id: &str) -> Option<&PropertyHandler> {
        self.table.get(id)
    }

    fn create_move(&self, text: &str) -> Result<Move, StnError> {
        Move::parse(text)
    }

    fn create_point(&self, text: &str) -> Result<Point, StnError> {
        Point::parse(text)
    }

    fn create_stone(&self, text: &str) -> Result<Stone, StnError> {
        Stone::parse(text)
    }

    fn supports_compressed_lists(&self) -> bool {
        true
    }

    #[instrument(skip(self))]
    fn append_points(&self, from: &str, to: &str) -> Result<Vec<Point>, StnError> {
        let first = Point::parse(from)?;
        let last = Point::parse(to)?;
        if first > last {
            return Err(StnError::new(
                StnErrorKind::SemanticError,
                format!("Point range {}:{} runs backwards", from, to),
            ));
        }
        (first.value()..=last.value()).map(Point::new).collect()
    }

    #[instrument(skip(self), fields(count = points.len()))]
    fn write_compressed_list(&self, points: &[Point]) -> Result<Vec<String>, StnError> {
        let mut entries = Vec::new();
        let mut iter = points.iter().copied().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while let Some(next) = iter.peek().copied() {
                if next.value() != end.value() + 1 {
                    break;
                }
                end = next;
                iter.next();
            }
            if start == end {
                entries.push(start.to_char().to_string());
            } else {
                entries.push(format!("{}:{}", start.to_char(), end.to_char()));
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[u8]) -> Vec<Point> {
        values.iter().map(|v| Point::new(*v).unwrap()).collect()
    }

    #[test]
    fn runs_are_collapsed() {
        let flavor = BackgammonFlavor::new();
        let entries = flavor.write_compressed_list(&points(&[2, 3, 4, 7, 8])).unwrap();
        assert_eq!(entries, vec!["c:e", "h:i"]);
        let entries = flavor.write_compressed_list(&points(&[0, 5, 25])).unwrap();
        assert_eq!(entries, vec!["a", "f", "z"]);
    }

    #[test]
    fn ranges_are_expanded() {
        let flavor = BackgammonFlavor::new();
        assert_eq!(flavor.append_points("c", "e").unwrap(), points(&[2, 3, 4]));
        assert_eq!(
            flavor.append_points("e", "c").unwrap_err().kind,
            StnErrorKind::SemanticError
        );
        assert_eq!(
            flavor.append_points("c", "!").unwrap_err().kind,
            StnErrorKind::IllegalPoint
        );
    }

    #[test]
    fn moves_come_from_text() {
        let flavor = BackgammonFlavor::new();
        assert!(flavor.create_move("31hefe").is_ok());
        assert_eq!(
            flavor.create_stone("!").unwrap_err().kind,
            StnErrorKind::IllegalStone
        );
    }
}
