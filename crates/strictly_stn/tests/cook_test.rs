//! Tests for cooking, culprit reporting and flavor selection.

use strictly_stn::{
    Culprit, GameResult, MoveKind, StnErrorKind, Value, Winner, cook, flavor_of, parse,
};

#[test]
fn test_culprit_can_be_removed_and_recooked() {
    let mut collection = parse(b"(;FF[four])").unwrap();
    let err = cook(&mut collection).unwrap_err();
    assert_eq!(err.kind(), StnErrorKind::InvalidNumber);

    let Some(Culprit::Property { node, id }) = err.culprit.clone() else {
        panic!("expected a property culprit, got {:?}", err.culprit);
    };
    assert_eq!(id, "FF");
    collection.node_mut(node).remove_property(&id);
    cook(&mut collection).unwrap();
    assert!(!collection.node(node).has_property("FF"));
}

#[test]
fn test_flavor_comes_from_root_game() {
    let collection = parse(b"(;GM[6])(;FF[4])(;GM[99])").unwrap();
    let ids: Vec<i64> = collection
        .game_trees()
        .iter()
        .map(|tree| flavor_of(&collection, *tree).unwrap().game_id())
        .collect();
    assert_eq!(ids, vec![6, 0, 0]);
}

#[test]
fn test_generic_flavor_leaves_moves_raw() {
    let mut collection = parse(b"(;FF[4];B[64mgms])").unwrap();
    cook(&mut collection).unwrap();
    let node = collection.game_tree(collection.game_trees()[0]).nodes()[1];
    assert!(collection.node(node).value("B").unwrap().is_raw());
}

#[test]
fn test_game_info_is_typed() {
    let mut collection =
        parse(b"(;GM[6]PW[Alice]PB[Bob]RE[B+3R]MI[length:7][game:2]CV[2]CO[w])").unwrap();
    cook(&mut collection).unwrap();
    let root = collection.node(collection.game_tree(collection.game_trees()[0]).nodes()[0]);
    assert_eq!(root.value("PW"), Some(&Value::SimpleText("Alice".into())));
    let Some(Value::Result(result)) = root.value("RE") else {
        panic!("expected a result");
    };
    assert_eq!(result, &GameResult::parse("B+3Resign").unwrap());
    assert_eq!(result.winner(), Winner::Black);
    let Some(Value::List(info)) = root.value("MI") else {
        panic!("expected match info");
    };
    assert_eq!(info.len(), 2);
    assert_eq!(root.value("CV"), Some(&Value::Number(2)));
}

#[test]
fn test_cube_value_must_be_positive() {
    let mut collection = parse(b"(;GM[6]CV[0])").unwrap();
    assert_eq!(
        cook(&mut collection).unwrap_err().kind(),
        StnErrorKind::SemanticError
    );
    let mut collection = parse(b"(;GM[6]CO[x])").unwrap();
    assert_eq!(
        cook(&mut collection).unwrap_err().kind(),
        StnErrorKind::SemanticError
    );
}

#[test]
fn test_cube_actions_are_moves() {
    let mut collection = parse(b"(;GM[6];W[double];B[take];W[resign:2];B[accept])").unwrap();
    cook(&mut collection).unwrap();
    let nodes = collection.game_tree(collection.game_trees()[0]).nodes().to_vec();
    let kinds: Vec<MoveKind> = nodes[1..]
        .iter()
        .filter_map(|n| {
            let node = collection.node(*n);
            match node.value("W").or(node.value("B")) {
                Some(Value::Move(mv)) => Some(mv.kind().clone()),
                _ => None,
            }
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            MoveKind::Double,
            MoveKind::Take,
            MoveKind::Resign(2),
            MoveKind::Accept
        ]
    );
}

#[test]
fn test_illegal_point_in_markup() {
    let mut collection = parse(b"(;GM[6]CR[A])").unwrap();
    assert_eq!(
        cook(&mut collection).unwrap_err().kind(),
        StnErrorKind::IllegalPoint
    );
}

#[test]
fn test_variation_may_repeat_inherited_game() {
    let mut collection = parse(b"(;GM[6];B[31](;GM[6];W[64])(;W[55]))").unwrap();
    cook(&mut collection).unwrap();

    let mut collection = parse(b"(;GM[6];GM[6];B[31])").unwrap();
    assert_eq!(
        cook(&mut collection).unwrap_err().kind(),
        StnErrorKind::SemanticError
    );
}
