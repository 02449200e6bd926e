//! Untyped tree: collection, game trees, nodes and properties.
//!
//! All game trees and nodes live in arenas owned by the [`Collection`].
//! Parent and previous-node links are integer handles into those arenas, so
//! ownership stays strictly top-down.

use crate::error::{StnError, StnErrorKind};
use crate::value::{Raw, Value};
use derive_more::Display;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Handle of a game tree inside its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("game tree #{}", _0)]
pub struct GameTreeId(usize);

/// Handle of a node inside its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("node #{}", _0)]
pub struct NodeId(usize);

/// Tree component responsible for a cook failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Culprit {
    /// The collection as a whole.
    #[display("collection")]
    Collection,
    /// A game tree.
    #[display("{}", _0)]
    GameTree(GameTreeId),
    /// A node.
    #[display("{}", _0)]
    Node(NodeId),
    /// A property of a node.
    #[display("property {} in {}", id, node)]
    Property {
        /// Node holding the property.
        node: NodeId,
        /// Property identifier.
        id: String,
    },
}

/// Checks that an identifier is one or two uppercase letters.
pub fn validate_identifier(id: &str) -> Result<(), StnError> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(StnError::new(
            StnErrorKind::Syntax,
            format!("Invalid property identifier '{}'", id),
        ));
    }
    if id.len() > 2 {
        return Err(StnError::new(
            StnErrorKind::Syntax,
            format!("Property identifier '{}' is longer than two letters", id),
        ));
    }
    Ok(())
}

/// Identifier plus value, owned by a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    id: String,
    node: NodeId,
    value: Value,
}

impl Property {
    /// Identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Node holding this property.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replaces the value.
    ///
    /// A cooked value keeps its variant: replacing it with a different
    /// non-raw variant fails with `UsageError`.
    #[instrument(skip(self, value), fields(property = %self.id))]
    pub fn set_value(&mut self, value: Value) -> Result<(), StnError> {
        if !self.value.is_raw() && !value.is_raw() && self.value.kind() != value.kind() {
            return Err(StnError::new(
                StnErrorKind::UsageError,
                format!(
                    "Cannot change {} value of {} to {}",
                    self.value.kind(),
                    self.id,
                    value.kind()
                ),
            ));
        }
        self.value = value;
        Ok(())
    }
}

/// A node: properties keyed by identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    tree: GameTreeId,
    previous: Option<NodeId>,
    properties: BTreeMap<String, Property>,
    losers: Vec<String>,
}

impl Node {
    /// Handle of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Game tree containing this node.
    pub fn tree(&self) -> GameTreeId {
        self.tree
    }

    /// Preceding node in the same game tree.
    pub fn previous(&self) -> Option<NodeId> {
        self.previous
    }

    /// Adds a property with the given value.
    ///
    /// Fails with `Syntax` for malformed identifiers and `PropertyExists` for
    /// duplicates.
    #[instrument(skip(self, value), fields(node = %self.id))]
    pub fn add_property(&mut self, id: &str, value: Value) -> Result<&mut Property, StnError> {
        validate_identifier(id)?;
        if self.properties.contains_key(id) {
            return Err(StnError::new(
                StnErrorKind::PropertyExists,
                format!("Property {} already exists in {}", id, self.id),
            ));
        }
        let property = Property {
            id: id.to_string(),
            node: self.id,
            value,
        };
        Ok(self.properties.entry(id.to_string()).or_insert(property))
    }

    /// Adds a property or replaces the value of an existing one.
    pub fn set_property(&mut self, id: &str, value: Value) -> Result<(), StnError> {
        match self.properties.get_mut(id) {
            Some(property) => property.set_value(value),
            None => self.add_property(id, value).map(|_| ()),
        }
    }

    /// Removes a property; absent identifiers are ignored.
    #[instrument(skip(self), fields(node = %self.id))]
    pub fn remove_property(&mut self, id: &str) -> Option<Property> {
        self.properties.remove(id)
    }

    /// Looks up a property.
    pub fn property(&self, id: &str) -> Option<&Property> {
        self.properties.get(id)
    }

    /// Looks up a property for modification.
    pub fn property_mut(&mut self, id: &str) -> Option<&mut Property> {
        self.properties.get_mut(id)
    }

    /// Whether the property exists.
    pub fn has_property(&self, id: &str) -> bool {
        self.properties.contains_key(id)
    }

    /// Value of a property, if present.
    pub fn value(&self, id: &str) -> Option<&Value> {
        self.properties.get(id).map(Property::value)
    }

    /// Properties in ascending identifier order.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Property identifiers in ascending order.
    pub fn identifiers(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    /// Schedules a property for removal when cooking of this node finishes.
    pub fn schedule_removal(&mut self, id: &str) {
        if !self.losers.iter().any(|l| l == id) {
            self.losers.push(id.to_string());
        }
    }

    /// Identifiers scheduled for removal.
    pub fn losers(&self) -> &[String] {
        &self.losers
    }

    /// Removes all scheduled properties, returning their identifiers.
    pub(crate) fn flush_losers(&mut self) -> Vec<String> {
        let losers = std::mem::take(&mut self.losers);
        for id in &losers {
            self.properties.remove(id);
        }
        losers
    }
}

/// A sequence of nodes followed by variations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameTree {
    id: GameTreeId,
    parent: Option<GameTreeId>,
    nodes: Vec<NodeId>,
    children: Vec<GameTreeId>,
}

impl GameTree {
    /// Handle of this game tree.
    pub fn id(&self) -> GameTreeId {
        self.id
    }

    /// Enclosing game tree, `None` for top-level trees.
    pub fn parent(&self) -> Option<GameTreeId> {
        self.parent
    }

    /// Nodes in order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Variations in order.
    pub fn children(&self) -> &[GameTreeId] {
        &self.children
    }
}

/// Ordered sequence of top-level game trees plus the arenas backing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    roots: Vec<GameTreeId>,
    trees: Vec<GameTree>,
    nodes: Vec<Node>,
}

impl Collection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a game tree, top-level if `parent` is `None`.
    #[instrument(skip(self))]
    pub fn add_game_tree(&mut self, parent: Option<GameTreeId>) -> GameTreeId {
        let id = GameTreeId(self.trees.len());
        self.trees.push(GameTree {
            id,
            parent,
            nodes: Vec::new(),
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.trees[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        debug!(%id, "Game tree added");
        id
    }

    /// Appends an empty node to a game tree.
    #[instrument(skip(self))]
    pub fn add_node(&mut self, tree: GameTreeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        let previous = self.trees[tree.0].nodes.last().copied();
        self.nodes.push(Node {
            id,
            tree,
            previous,
            properties: BTreeMap::new(),
            losers: Vec::new(),
        });
        self.trees[tree.0].nodes.push(id);
        id
    }

    /// Top-level game trees in order.
    pub fn game_trees(&self) -> &[GameTreeId] {
        &self.roots
    }

    /// Whether there are no top-level game trees.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Looks up a game tree.
    pub fn game_tree(&self, id: GameTreeId) -> &GameTree {
        &self.trees[id.0]
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Looks up a node for modification.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// First node of a game tree.
    pub fn first_node(&self, tree: GameTreeId) -> Option<NodeId> {
        self.trees[tree.0].nodes.first().copied()
    }

    /// Top-level game tree a game tree belongs to.
    pub fn root_of(&self, mut tree: GameTreeId) -> GameTreeId {
        while let Some(parent) = self.trees[tree.0].parent {
            tree = parent;
        }
        tree
    }

    /// Whether the node is the first node of a top-level game tree.
    pub fn is_root_node(&self, node: NodeId) -> bool {
        let tree = self.nodes[node.0].tree;
        self.trees[tree.0].parent.is_none() && self.first_node(tree) == Some(node)
    }

    /// Whether the node is the first node of its game tree.
    pub fn is_first_node(&self, node: NodeId) -> bool {
        self.first_node(self.nodes[node.0].tree) == Some(node)
    }

    /// All game trees of one top-level tree, depth first, parent first.
    pub fn subtrees(&self, root: GameTreeId) -> Vec<GameTreeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(tree) = stack.pop() {
            out.push(tree);
            stack.extend(self.trees[tree.0].children.iter().rev());
        }
        out
    }

    /// Convenience for building trees by hand: adds a raw property.
    pub fn add_raw(&mut self, node: NodeId, id: &str, entries: &[&str]) -> Result<(), StnError> {
        let raw = Raw::new(entries.iter().map(|e| e.to_string()).collect());
        self.node_mut(node).add_property(id, Value::Raw(raw)).map(|_| ())
    }
}
