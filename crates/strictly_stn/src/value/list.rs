//! Composed pairs and homogeneous lists.

use super::{Value, ValueKind};
use crate::error::{StnError, StnErrorKind};
use tracing::instrument;

/// A `head:tail` pair of cooked values.
#[derive(Debug, Clone, PartialEq)]
pub struct Compose {
    head: Value,
    tail: Value,
}

impl Compose {
    /// Creates a pair.
    pub fn new(head: Value, tail: Value) -> Self {
        Self { head, tail }
    }

    /// Value before the colon.
    pub fn head(&self) -> &Value {
        &self.head
    }

    /// Value after the colon.
    pub fn tail(&self) -> &Value {
        &self.tail
    }
}

/// Non-empty list of values sharing one run-time kind.
///
/// The empty list is a list holding a single [`Value::Empty`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListOf {
    item_kind: ValueKind,
    items: Vec<Value>,
}

impl ListOf {
    /// The empty list.
    pub fn empty() -> Self {
        Self {
            item_kind: ValueKind::Empty,
            items: vec![Value::Empty],
        }
    }

    /// Kind shared by all items.
    pub fn item_kind(&self) -> ValueKind {
        self.item_kind
    }

    /// The items.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this is the empty list.
    pub fn is_empty(&self) -> bool {
        self.item_kind == ValueKind::Empty
    }
}

/// Incremental list construction with kind checking.
#[derive(Debug, Clone)]
pub struct ListBuilder {
    item_kind: ValueKind,
    items: Vec<Value>,
}

impl ListBuilder {
    /// Starts a list of the given item kind.
    pub fn new(item_kind: ValueKind) -> Self {
        Self {
            item_kind,
            items: Vec::new(),
        }
    }

    /// Appends an item; its kind must match the list's.
    #[instrument(skip(self, value), fields(list = %self.item_kind, item = %value.kind()))]
    pub fn append(&mut self, value: Value) -> Result<&mut Self, StnError> {
        if value.kind() != self.item_kind {
            return Err(StnError::new(
                StnErrorKind::UsageError,
                format!("Cannot add {} to a list of {}", value.kind(), self.item_kind),
            ));
        }
        self.items.push(value);
        Ok(self)
    }

    /// Finishes the list; at least one item is required.
    #[instrument(skip(self), fields(count = self.items.len()))]
    pub fn build(self) -> Result<ListOf, StnError> {
        if self.items.is_empty() {
            return Err(StnError::new(
                StnErrorKind::ListEmpty,
                "A list needs at least one item",
            ));
        }
        Ok(ListOf {
            item_kind: self.item_kind,
            items: self.items,
        })
    }
}
