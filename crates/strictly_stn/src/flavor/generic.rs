//! Game-independent properties shared by every flavor.

use super::{
    Constraint, Flavor, GENERIC_GAME_ID, HandlerTable, IsPositiveNumber, IsRootProperty,
    IsSingleValue, MOVE_ANNOTATIONS, MoveAnnotationWithMove, NODE_ANNOTATIONS, NumberInRange,
    PropertyHandler, UniqueInFamily,
};
use crate::value::ValueType;

const SIMPLE_PAIR: ValueType = ValueType::Compose(&ValueType::SimpleText, &ValueType::SimpleText);

const ROOT: &[&dyn Constraint] = &[&IsRootProperty, &IsSingleValue];
const FILE_FORMAT: &[&dyn Constraint] = &[
    &IsRootProperty,
    &IsSingleValue,
    &NumberInRange { min: 1, max: 4 },
];
const GAME: &[&dyn Constraint] = &[&IsRootProperty, &IsSingleValue, &IsPositiveNumber];
const STYLE: &[&dyn Constraint] = &[
    &IsRootProperty,
    &IsSingleValue,
    &NumberInRange { min: 0, max: 3 },
];
const NODE_ANNOTATION: &[&dyn Constraint] = &[&UniqueInFamily(NODE_ANNOTATIONS)];
const MOVE_ANNOTATION: &[&dyn Constraint] =
    &[&MoveAnnotationWithMove, &UniqueInFamily(MOVE_ANNOTATIONS)];

const GAME_INFO_TEXT: &[&str] = &[
    "AN", "BR", "BT", "CP", "EV", "GN", "ON", "OT", "PB", "PC", "PW", "RO", "RU", "SO", "US",
    "WR", "WT",
];

/// Builds the property table every flavor starts from.
pub(crate) fn generic_table() -> HandlerTable {
    let mut table = HandlerTable::new();

    table.insert("AP", PropertyHandler::checked(SIMPLE_PAIR, ROOT));
    table.insert("CA", PropertyHandler::checked(ValueType::SimpleText, ROOT));
    table.insert("FF", PropertyHandler::checked(ValueType::Number, FILE_FORMAT));
    table.insert("GM", PropertyHandler::checked(ValueType::Number, GAME));
    table.insert("ST", PropertyHandler::checked(ValueType::Number, STYLE));

    for id in GAME_INFO_TEXT {
        table.insert(*id, PropertyHandler::plain(ValueType::SimpleText));
    }
    table.insert("GC", PropertyHandler::plain(ValueType::Text));
    table.insert("DT", PropertyHandler::plain(ValueType::Date));
    table.insert("RE", PropertyHandler::plain(ValueType::Result));
    table.insert("TM", PropertyHandler::plain(ValueType::Real));

    table.insert("C", PropertyHandler::plain(ValueType::Text));
    table.insert("N", PropertyHandler::plain(ValueType::SimpleText));
    for id in NODE_ANNOTATIONS {
        table.insert(*id, PropertyHandler::checked(ValueType::Double, NODE_ANNOTATION));
    }
    table.insert("HO", PropertyHandler::plain(ValueType::Double));
    table.insert("V", PropertyHandler::plain(ValueType::Real));

    table.insert("BM", PropertyHandler::checked(ValueType::Double, MOVE_ANNOTATION));
    table.insert("TE", PropertyHandler::checked(ValueType::Double, MOVE_ANNOTATION));
    table.insert("DO", PropertyHandler::checked(ValueType::Empty, MOVE_ANNOTATION));
    table.insert("IT", PropertyHandler::checked(ValueType::Empty, MOVE_ANNOTATION));

    table.insert("BL", PropertyHandler::plain(ValueType::Real));
    table.insert("WL", PropertyHandler::plain(ValueType::Real));
    table.insert("OB", PropertyHandler::plain(ValueType::Number));
    table.insert("OW", PropertyHandler::plain(ValueType::Number));
    table.insert("MN", PropertyHandler::plain(ValueType::Number));
    table.insert("PM", PropertyHandler::plain(ValueType::Number));
    table.insert("PL", PropertyHandler::plain(ValueType::Color));
    table.insert("KO", PropertyHandler::plain(ValueType::Empty));

    table
}

/// Flavor for games without game-specific properties.
#[derive(Debug)]
pub struct GenericFlavor {
    table: HandlerTable,
}

impl GenericFlavor {
    /// Builds the flavor and its property table.
    pub fn new() -> Self {
        Self {
            table: generic_table(),
        }
    }
}

impl Default for GenericFlavor {
    fn default() -> Self {
        Self::new()
    }
}

impl Flavor for GenericFlavor {
    fn game_id(&self) -> i64 {
        GENERIC_GAME_ID
    }

    fn name(&self) -> &'static str {
        "generic"
    }

    fn handler(&self, id: &str) -> Option<&PropertyHandler> {
        self.table.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_properties_are_constrained() {
        let flavor = GenericFlavor::new();
        let ff = flavor.handler("FF").unwrap();
        assert_eq!(ff.value_type, ValueType::Number);
        assert_eq!(ff.constraints.len(), 3);
        assert!(flavor.handler("ZZ").is_none());
    }

    #[test]
    fn move_annotations_check_for_a_move_first() {
        let flavor = GenericFlavor::new();
        let te = flavor.handler("TE").unwrap();
        assert_eq!(te.constraints.len(), 2);
        assert_eq!(flavor.handler("DO").unwrap().value_type, ValueType::Empty);
    }
}
