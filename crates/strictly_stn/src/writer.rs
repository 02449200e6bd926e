//! Tree notation writer.
//!
//! Properties are written in ascending identifier order after a fixed
//! prelude. Root nodes of top-level game trees always get `FF`, `CA[UTF-8]`
//! and `AP`; `GM` is added when the options name a default game.

use crate::cook::flavor_of;
use crate::error::{StnError, StnErrorKind};
use crate::flavor::Flavor;
use crate::tree::{Collection, Culprit, GameTreeId, NodeId};
use crate::value::{Compose, Value};
use std::borrow::Cow;
use std::io::Write;
use tracing::{debug, instrument};

/// Identifiers written first, in this order, when present.
pub const PRELUDE: &[&str] = &["FF", "GM", "CA", "AP", "PL", "AE"];

/// File format version written when a root node has none.
pub const FILE_FORMAT: i64 = 4;

/// Settings for [`write_collection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Application name for `AP`.
    pub application: String,
    /// Application version for `AP`.
    pub version: String,
    /// Game id for `GM` when a root node has none.
    pub default_game: Option<i64>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            application: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_game: None,
        }
    }
}

impl WriterOptions {
    /// Options naming a different application.
    pub fn for_application(application: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            version: version.into(),
            default_game: None,
        }
    }

    /// Adds a default game id.
    pub fn with_default_game(mut self, game_id: i64) -> Self {
        self.default_game = Some(game_id);
        self
    }
}

fn prelude_rank(id: &str) -> usize {
    PRELUDE
        .iter()
        .position(|p| *p == id)
        .unwrap_or(PRELUDE.len())
}

struct Writer<'a, W: Write> {
    collection: &'a Collection,
    sink: &'a mut W,
    options: &'a WriterOptions,
    written: usize,
}

impl<W: Write> Writer<'_, W> {
    fn bytes(&mut self, bytes: &[u8]) -> Result<(), StnError> {
        self.sink.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    fn tree(&mut self, tree: GameTreeId, flavor: &dyn Flavor) -> Result<(), StnError> {
        let game_tree = self.collection.game_tree(tree);
        if game_tree.nodes().is_empty() {
            return Err(StnError::new(
                StnErrorKind::UsageError,
                "Cannot write a game tree without nodes",
            )
            .with_culprit(Culprit::GameTree(tree)));
        }
        self.bytes(b"(")?;
        for node in game_tree.nodes() {
            self.node(*node, flavor)?;
        }
        for child in game_tree.children() {
            self.tree(*child, flavor)?;
        }
        self.bytes(b")")
    }

    fn root_defaults(&self) -> Vec<(&'static str, Value)> {
        let mut defaults = vec![
            ("FF", Value::Number(FILE_FORMAT)),
            ("CA", Value::SimpleText("UTF-8".to_string())),
            (
                "AP",
                Value::Compose(Box::new(Compose::new(
                    Value::SimpleText(self.options.application.clone()),
                    Value::SimpleText(self.options.version.clone()),
                ))),
            ),
        ];
        if let Some(game) = self.options.default_game {
            defaults.push(("GM", Value::Number(game)));
        }
        defaults
    }

    fn node(&mut self, node_id: NodeId, flavor: &dyn Flavor) -> Result<(), StnError> {
        let node = self.collection.node(node_id);
        let mut properties: Vec<(Cow<'_, str>, Cow<'_, Value>)> = node
            .properties()
            .map(|p| (Cow::Borrowed(p.id()), Cow::Borrowed(p.value())))
            .collect();

        if self.collection.is_root_node(node_id) {
            for (id, value) in self.root_defaults() {
                match properties.iter_mut().find(|(existing, _)| existing == id) {
                    Some(entry) if id == "CA" => entry.1 = Cow::Owned(value),
                    Some(_) => {}
                    None => properties.push((Cow::Borrowed(id), Cow::Owned(value))),
                }
            }
        }
        properties.sort_by(|(a, _), (b, _)| {
            prelude_rank(a).cmp(&prelude_rank(b)).then_with(|| a.cmp(b))
        });

        self.bytes(b";")?;
        for (id, value) in properties {
            self.bytes(id.as_bytes())?;
            self.written += value.write(&mut *self.sink, flavor).map_err(|mut e| {
                if e.kind == StnErrorKind::EmptyProperty {
                    e.message = format!("Property {} has no value", id);
                }
                e
            })?;
        }
        Ok(())
    }
}

/// Writes a collection, returning the number of bytes written.
///
/// Each top-level game tree is followed by a line feed.
#[instrument(skip(collection, sink), fields(game_trees = collection.game_trees().len()))]
pub fn write_collection<W: Write>(
    collection: &Collection,
    sink: &mut W,
    options: &WriterOptions,
) -> Result<usize, StnError> {
    if collection.is_empty() {
        return Err(StnError::new(
            StnErrorKind::EmptyCollection,
            "Cannot write a collection without game trees",
        ));
    }
    let mut writer = Writer {
        collection,
        sink,
        options,
        written: 0,
    };
    for root in collection.game_trees() {
        let flavor = flavor_of(collection, *root)?;
        writer.tree(*root, flavor)?;
        writer.bytes(b"\n")?;
    }
    writer.sink.flush()?;
    debug!(bytes = writer.written, "Collection written");
    Ok(writer.written)
}

/// Writes a collection into a byte buffer.
pub fn to_bytes(collection: &Collection, options: &WriterOptions) -> Result<Vec<u8>, StnError> {
    let mut out = Vec::new();
    write_collection(collection, &mut out, options)?;
    Ok(out)
}

/// Writes a collection into a string.
pub fn to_string(collection: &Collection, options: &WriterOptions) -> Result<String, StnError> {
    String::from_utf8(to_bytes(collection, options)?).map_err(|e| {
        StnError::new(
            StnErrorKind::InternalError,
            format!("Writer produced invalid UTF-8: {}", e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cook::cook;
    use crate::parser::parse;
    use crate::value::Raw;

    fn options() -> WriterOptions {
        WriterOptions::for_application("test", "1")
    }

    #[test]
    fn prelude_comes_first() {
        let mut collection = parse(b"(;C[hi]AE[a]PL[B]GM[6]FF[4]AB[c])").unwrap();
        cook(&mut collection).unwrap();
        assert_eq!(
            to_string(&collection, &options()).unwrap(),
            "(;FF[4]GM[6]CA[UTF-8]AP[test:1]PL[B]AE[a]AB[c]C[hi])\n"
        );
    }

    #[test]
    fn defaults_fill_bare_root() {
        let collection = parse(b"(;)").unwrap();
        let options = options().with_default_game(6);
        assert_eq!(
            to_string(&collection, &options).unwrap(),
            "(;FF[4]GM[6]CA[UTF-8]AP[test:1])\n"
        );
    }

    #[test]
    fn empty_collection_fails() {
        let err = to_bytes(&Collection::new(), &options()).unwrap_err();
        assert_eq!(err.kind, StnErrorKind::EmptyCollection);
    }

    #[test]
    fn game_tree_without_nodes_fails() {
        let mut collection = Collection::new();
        let tree = collection.add_game_tree(None);
        let err = to_bytes(&collection, &options()).unwrap_err();
        assert_eq!(err.kind, StnErrorKind::UsageError);
        assert_eq!(err.culprit, Some(Culprit::GameTree(tree)));
    }

    #[test]
    fn bad_game_id_fails() {
        let collection = parse(b"(;GM[six])").unwrap();
        let err = to_bytes(&collection, &options()).unwrap_err();
        assert_eq!(err.kind, StnErrorKind::InvalidNumber);
    }

    #[test]
    fn empty_raw_fails() {
        let mut collection = Collection::new();
        let tree = collection.add_game_tree(None);
        let node = collection.add_node(tree);
        collection
            .node_mut(node)
            .add_property("XX", Value::Raw(Raw::default()))
            .unwrap();
        let err = to_bytes(&collection, &options()).unwrap_err();
        assert_eq!(err.kind, StnErrorKind::EmptyProperty);
    }

    #[test]
    fn compressed_point_lists() {
        let mut collection = parse(b"(;GM[6];CR[c][d][e][h][i])").unwrap();
        cook(&mut collection).unwrap();
        let text = to_string(&collection, &options()).unwrap();
        assert!(text.ends_with(";CR[c:e][h:i])\n"), "{}", text);
    }

    #[test]
    fn trees_and_variations() {
        let collection = parse(b"(;GM[6](;B[31])(;B[42]))(;GM[6])").unwrap();
        let text = to_string(&collection, &options()).unwrap();
        assert_eq!(
            text,
            "(;FF[4]GM[6]CA[UTF-8]AP[test:1](;B[31])(;B[42]))\n(;FF[4]GM[6]CA[UTF-8]AP[test:1])\n"
        );
    }
}
