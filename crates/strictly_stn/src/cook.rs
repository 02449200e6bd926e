//! Cooking: replacing raw values with typed ones.
//!
//! Each top-level game tree is cooked with the flavor its root node declares
//! in `GM`; variations inherit it. Properties the flavor does not know stay
//! raw. Cooking an already cooked tree only re-runs the constraints, so the
//! pass is idempotent.

use crate::error::{StnError, StnErrorKind};
use crate::flavor::{ConstraintContext, Flavor, Verdict, flavor_for, generic};
use crate::tree::{Collection, Culprit, GameTreeId, NodeId};
use crate::value::{Value, ValueType};
use tracing::{debug, info, instrument, warn};

/// Game id declared by the first node of a game tree, if any.
fn declared_game_id(collection: &Collection, tree: GameTreeId) -> Result<Option<i64>, StnError> {
    let Some(node) = collection.first_node(tree) else {
        return Ok(None);
    };
    let culprit = Culprit::Property {
        node,
        id: "GM".to_string(),
    };
    match collection.node(node).value("GM") {
        None => Ok(None),
        Some(Value::Raw(raw)) => ValueType::Number
            .cook(raw, generic())
            .map(|v| v.as_number())
            .map_err(|e| e.with_culprit(culprit)),
        Some(Value::Number(n)) => Ok(Some(*n)),
        Some(other) => Err(StnError::new(
            StnErrorKind::InternalError,
            format!("GM holds a {} value", other.kind()),
        )
        .with_culprit(culprit)),
    }
}

/// Flavor a top-level game tree is cooked with.
#[instrument(skip(collection))]
pub fn flavor_of(
    collection: &Collection,
    root: GameTreeId,
) -> Result<&'static dyn Flavor, StnError> {
    let root = collection.root_of(root);
    Ok(match declared_game_id(collection, root)? {
        None => generic(),
        Some(id) => flavor_for(id).unwrap_or_else(|| {
            warn!(game_id = id, "No flavor for game, using generic properties");
            generic()
        }),
    })
}

/// Cooks every game tree of the collection.
///
/// On failure the error's culprit names the offending component; the tree is
/// left as it was before that component, so the caller can remove it and
/// cook again.
#[instrument(skip(collection), fields(game_trees = collection.game_trees().len()))]
pub fn cook(collection: &mut Collection) -> Result<(), StnError> {
    for root in collection.game_trees().to_vec() {
        let flavor = flavor_of(collection, root)?;
        debug!(%root, flavor = flavor.name(), "Cooking game tree");
        for tree in collection.subtrees(root) {
            if tree != root {
                check_variation_flavor(collection, tree, flavor)?;
            }
            for node in collection.game_tree(tree).nodes().to_vec() {
                cook_node(collection, node, flavor)?;
            }
        }
    }
    info!("Collection cooked");
    Ok(())
}

/// A variation may repeat the inherited `GM` but not change it.
///
/// The repeated value passes the root-only check in [`cook_node`].
fn check_variation_flavor(
    collection: &Collection,
    tree: GameTreeId,
    flavor: &dyn Flavor,
) -> Result<(), StnError> {
    if let Some(id) = declared_game_id(collection, tree)?
        && id != flavor.game_id()
        && let Some(node) = collection.first_node(tree)
    {
        return Err(StnError::new(
            StnErrorKind::FlavorMismatch,
            format!(
                "Variation declares game {} inside a {} tree",
                id,
                flavor.name()
            ),
        )
        .with_culprit(Culprit::Property {
            node,
            id: "GM".to_string(),
        }));
    }
    Ok(())
}

/// Cooks the properties of one node in identifier order.
#[instrument(skip(collection, flavor), fields(flavor = flavor.name()))]
pub fn cook_node(
    collection: &mut Collection,
    node_id: NodeId,
    flavor: &dyn Flavor,
) -> Result<(), StnError> {
    let is_root = collection.is_root_node(node_id);
    for id in collection.node(node_id).identifiers() {
        let Some(handler) = flavor.handler(&id) else {
            continue;
        };
        let culprit = || Culprit::Property {
            node: node_id,
            id: id.clone(),
        };

        let node = collection.node(node_id);
        let Some(property) = node.property(&id) else {
            continue;
        };
        let (cooked, raw_len) = match property.value() {
            Value::Raw(raw) => {
                let value = handler
                    .value_type
                    .cook(raw, flavor)
                    .map_err(|e| e.with_culprit(culprit()))?;
                (Some(value), Some(raw.len()))
            }
            _ => (None, None),
        };

        let value = cooked.as_ref().unwrap_or(property.value());
        let repeats_game = id == "GM"
            && collection.is_first_node(node_id)
            && value.as_number() == Some(flavor.game_id());
        let ctx = ConstraintContext {
            id: &id,
            value,
            raw_len,
            node,
            is_root: is_root || repeats_game,
        };
        let mut verdict = Verdict::Keep;
        for constraint in handler.constraints {
            verdict = constraint
                .check(&ctx)
                .map_err(|e| e.with_culprit(culprit()))?;
            if verdict == Verdict::Remove {
                break;
            }
        }

        let node = collection.node_mut(node_id);
        if let Some(value) = cooked {
            node.set_property(&id, value)
                .map_err(|e| e.with_culprit(culprit()))?;
        }
        if verdict == Verdict::Remove {
            node.schedule_removal(&id);
        }
    }

    let removed = collection.node_mut(node_id).flush_losers();
    if !removed.is_empty() {
        warn!(
            node = %node_id,
            removed = ?removed,
            "Dropped properties that do not apply to this node"
        );
    }
    debug!(node = %node_id, "Node cooked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::value::{Move, MoveKind};

    fn first_tree_nodes(collection: &Collection) -> Vec<NodeId> {
        collection
            .game_tree(collection.game_trees()[0])
            .nodes()
            .to_vec()
    }

    #[test]
    fn backgammon_moves_are_cooked() {
        let mut collection = parse(b"(;FF[4]GM[6];B[64a2e3]W[55g6e7e8e9])").unwrap();
        cook(&mut collection).unwrap();
        let nodes = first_tree_nodes(&collection);
        let root = collection.node(nodes[0]);
        assert_eq!(root.value("FF"), Some(&Value::Number(4)));
        let Some(Value::Move(black)) = collection.node(nodes[1]).value("B") else {
            panic!("expected a move");
        };
        let MoveKind::Regular { sub_moves, .. } = black.kind() else {
            panic!("expected a regular move");
        };
        assert_eq!(sub_moves.len(), 2);
        assert_eq!(
            collection.node(nodes[1]).value("W"),
            Some(&Value::Move(Move::parse("55g6e7e8e9").unwrap()))
        );
    }

    #[test]
    fn culprit_points_at_bad_property() {
        let mut collection = parse(b"(;FF[four])").unwrap();
        let err = cook(&mut collection).unwrap_err();
        assert_eq!(err.kind, StnErrorKind::InvalidNumber);
        let node = first_tree_nodes(&collection)[0];
        assert_eq!(
            err.culprit,
            Some(Culprit::Property {
                node,
                id: "FF".to_string()
            })
        );
        collection.node_mut(node).remove_property("FF");
        assert!(cook(&mut collection).is_ok());
    }

    #[test]
    fn unknown_properties_stay_raw() {
        let mut collection = parse(b"(;GM[6]XX[whatever])").unwrap();
        cook(&mut collection).unwrap();
        let node = first_tree_nodes(&collection)[0];
        assert!(collection.node(node).value("XX").unwrap().is_raw());
    }

    #[test]
    fn move_annotation_without_move_is_dropped() {
        let mut collection = parse(b"(;GM[6];TE[1];B[31hefe]TE[2])").unwrap();
        cook(&mut collection).unwrap();
        let nodes = first_tree_nodes(&collection);
        assert!(!collection.node(nodes[1]).has_property("TE"));
        assert!(collection.node(nodes[2]).has_property("TE"));
    }

    #[test]
    fn exclusive_annotations() {
        let mut collection = parse(b"(;GM[6];B[31]BM[1]TE[1])").unwrap();
        assert_eq!(
            cook(&mut collection).unwrap_err().kind,
            StnErrorKind::SemanticError
        );
        let mut collection = parse(b"(;GM[6];GB[1]GW[2])").unwrap();
        assert_eq!(
            cook(&mut collection).unwrap_err().kind,
            StnErrorKind::SemanticError
        );
    }

    #[test]
    fn markup_may_not_overlap() {
        let mut collection = parse(b"(;GM[6];CR[c:e]SQ[e])").unwrap();
        let err = cook(&mut collection).unwrap_err();
        assert_eq!(err.kind, StnErrorKind::NonUniquePoint);
        assert!(matches!(err.culprit, Some(Culprit::Property { ref id, .. }) if id == "SQ"));
    }

    #[test]
    fn setup_stones_may_not_share_points() {
        let mut collection = parse(b"(;GM[6]AB[c][c][d]AW[d])").unwrap();
        assert_eq!(
            cook(&mut collection).unwrap_err().kind,
            StnErrorKind::NonUniqueStone
        );
    }

    #[test]
    fn root_properties_outside_root() {
        let mut collection = parse(b"(;GM[6];FF[4])").unwrap();
        assert_eq!(
            cook(&mut collection).unwrap_err().kind,
            StnErrorKind::SemanticError
        );
    }

    #[test]
    fn file_format_range() {
        let mut collection = parse(b"(;FF[5])").unwrap();
        assert_eq!(
            cook(&mut collection).unwrap_err().kind,
            StnErrorKind::SemanticError
        );
        let mut collection = parse(b"(;FF[4][3])").unwrap();
        assert_eq!(
            cook(&mut collection).unwrap_err().kind,
            StnErrorKind::ListTooLong
        );
    }

    #[test]
    fn variations_inherit_flavor() {
        let mut collection = parse(b"(;GM[6](;B[31hefe])(;GM[1]))").unwrap();
        let err = cook(&mut collection).unwrap_err();
        assert_eq!(err.kind, StnErrorKind::FlavorMismatch);

        let mut collection = parse(b"(;GM[6](;B[31hefe])(;W[42]))").unwrap();
        cook(&mut collection).unwrap();
    }

    #[test]
    fn empty_lists() {
        let mut collection = parse(b"(;GM[6]VW[])").unwrap();
        cook(&mut collection).unwrap();
        let node = first_tree_nodes(&collection)[0];
        let Some(Value::List(list)) = collection.node(node).value("VW") else {
            panic!("expected list");
        };
        assert!(list.is_empty());

        let mut collection = parse(b"(;GM[6]AE[])").unwrap();
        assert_eq!(
            cook(&mut collection).unwrap_err().kind,
            StnErrorKind::ListEmpty
        );
    }

    #[test]
    fn cooking_twice_changes_nothing() {
        let mut collection =
            parse(b"(;FF[4]GM[6]DT[2012-03-15];B[64mgms]C[nice\\] move])").unwrap();
        cook(&mut collection).unwrap();
        let once = collection.clone();
        cook(&mut collection).unwrap();
        assert_eq!(once, collection);
    }
}
