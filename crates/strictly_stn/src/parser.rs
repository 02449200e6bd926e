//! Tree notation parser.
//!
//! A deterministic state machine over the scanner's tokens builds the arena
//! tree. Value bytes are held back until the whole input has been read, then
//! decoded with the charset each top-level game tree declares.

use crate::charset::Charset;
use crate::error::{StnError, StnErrorKind, TextLocation};
use crate::scanner::{Scanner, Token};
use crate::tree::{Collection, GameTreeId, NodeId, validate_identifier};
use crate::value::{Raw, Value};
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info, instrument};

/// Parser states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    ExpectNode,
    ExpectProperty,
    ExpectPropValue,
    InValue,
    ExpectPropClose,
    ExpectAfterValue,
    ExpectAfterProp,
    ExpectGameTrees,
    Done,
}

/// A property whose values are still undecoded bytes.
#[derive(Debug)]
struct PendingProperty {
    node: NodeId,
    id: String,
    entries: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Builder {
    collection: Collection,
    open: Vec<GameTreeId>,
    node: Option<NodeId>,
    pending: Vec<PendingProperty>,
}

impl Builder {
    fn open_tree(&mut self) {
        let parent = self.open.last().copied();
        let tree = self.collection.add_game_tree(parent);
        self.open.push(tree);
        self.node = None;
    }

    fn add_node(&mut self) -> Result<(), StnError> {
        let tree = self.open.last().copied().ok_or_else(|| {
            StnError::new(StnErrorKind::InternalError, "Node outside of a game tree")
        })?;
        self.node = Some(self.collection.add_node(tree));
        Ok(())
    }

    fn start_property(&mut self, id: String, location: TextLocation) -> Result<(), StnError> {
        let node = self.node.ok_or_else(|| {
            StnError::new(StnErrorKind::InternalError, "Property outside of a node")
        })?;
        if let Err(mut err) = validate_identifier(&id) {
            err.location = Some(location);
            err.token = Some(id);
            return Err(err);
        }
        if self.pending.iter().any(|p| p.node == node && p.id == id) {
            let mut err = StnError::new(
                StnErrorKind::PropertyExists,
                format!("{}: property {} occurs twice in one node", location, id),
            );
            err.location = Some(location);
            err.token = Some(id);
            return Err(err);
        }
        self.pending.push(PendingProperty {
            node,
            id,
            entries: Vec::new(),
        });
        Ok(())
    }

    fn push_value(&mut self, bytes: Vec<u8>) -> Result<(), StnError> {
        match self.pending.last_mut() {
            Some(property) => {
                property.entries.push(bytes);
                Ok(())
            }
            None => Err(StnError::new(
                StnErrorKind::InternalError,
                "Value outside of a property",
            )),
        }
    }

    fn close_tree(&mut self) {
        self.open.pop();
        self.node = None;
    }

    /// Decodes pending values with each top-level tree's charset.
    fn finish(mut self) -> Result<Collection, StnError> {
        let mut charsets: HashMap<GameTreeId, Charset> = HashMap::new();
        for property in self.pending.iter_mut() {
            if property.id != "CA" || !self.collection.is_root_node(property.node) {
                continue;
            }
            let tree = self.collection.node(property.node).tree();
            let label = property
                .entries
                .first()
                .map(|bytes| Charset::Ascii.decode(bytes))
                .unwrap_or_default();
            let charset = Charset::from_label_or_default(&label);
            debug!(%tree, %charset, "Charset declared");
            charsets.insert(tree, charset);
            property.entries = vec![Charset::Utf8.to_string().into_bytes()];
        }

        for property in self.pending {
            let root = self
                .collection
                .root_of(self.collection.node(property.node).tree());
            let charset = charsets.get(&root).copied().unwrap_or_default();
            let raw = Raw::new(
                property
                    .entries
                    .iter()
                    .map(|bytes| charset.decode(bytes))
                    .collect(),
            );
            self.collection
                .node_mut(property.node)
                .add_property(&property.id, Value::Raw(raw))?;
        }
        Ok(self.collection)
    }
}

/// Parses a byte buffer into an uncooked collection.
///
/// The first syntax error aborts the parse; no partial tree is returned.
#[instrument(skip(input), fields(bytes = input.len()))]
pub fn parse(input: &[u8]) -> Result<Collection, StnError> {
    let mut scanner = Scanner::new(input);
    let mut builder = Builder::default();
    let mut state = State::Init;
    let mut lookahead = None;

    while state != State::Done {
        if state == State::InValue {
            let (token, _) = scanner.read_value();
            if let Token::Value(bytes) = token {
                builder.push_value(bytes)?;
            }
            state = State::ExpectPropClose;
            continue;
        }

        let (token, location) = match lookahead.take() {
            Some(pending) => pending,
            None => scanner.next_token()?,
        };
        state = match (state, token) {
            (State::Init, Token::Open) => {
                builder.open_tree();
                State::ExpectNode
            }
            (State::Init, token) => {
                return Err(StnError::syntax(location, "'('", token.to_string()));
            }

            (State::ExpectNode, Token::Semicolon) => {
                builder.add_node()?;
                State::ExpectProperty
            }
            (State::ExpectNode, token) => {
                return Err(StnError::syntax(location, "';'", token.to_string()));
            }

            (State::ExpectPropValue, Token::LeftBracket) => State::InValue,
            (State::ExpectPropValue, token) => {
                return Err(StnError::syntax(location, "'['", token.to_string()));
            }

            (State::ExpectPropClose, Token::RightBracket) => State::ExpectAfterValue,
            (State::ExpectPropClose, token) => {
                return Err(StnError::syntax(location, "']'", token.to_string()));
            }

            (State::ExpectAfterValue, Token::LeftBracket) => State::InValue,
            (State::ExpectAfterValue, token) => {
                lookahead = Some((token, location));
                State::ExpectAfterProp
            }

            (State::ExpectProperty | State::ExpectAfterProp, token) => match token {
                Token::PropIdent(id) => {
                    builder.start_property(id, location)?;
                    State::ExpectPropValue
                }
                Token::Semicolon => {
                    builder.add_node()?;
                    State::ExpectProperty
                }
                Token::Open => {
                    builder.open_tree();
                    State::ExpectNode
                }
                Token::Close => {
                    builder.close_tree();
                    State::ExpectGameTrees
                }
                token => {
                    return Err(StnError::syntax(
                        location,
                        "a property, ';', '(' or ')'",
                        token.to_string(),
                    ));
                }
            },

            (State::ExpectGameTrees, Token::Open) => {
                builder.open_tree();
                State::ExpectNode
            }
            (State::ExpectGameTrees, Token::Close) if !builder.open.is_empty() => {
                builder.close_tree();
                State::ExpectGameTrees
            }
            (State::ExpectGameTrees, Token::Eof) if builder.open.is_empty() => State::Done,
            (State::ExpectGameTrees, token) => {
                let expected = if builder.open.is_empty() {
                    "'(' or end of input"
                } else {
                    "'(' or ')'"
                };
                return Err(StnError::syntax(location, expected, token.to_string()));
            }

            (State::InValue | State::Done, _) => {
                return Err(StnError::new(
                    StnErrorKind::InternalError,
                    "Parser state machine out of step",
                ));
            }
        };
    }

    let collection = builder.finish()?;
    info!(game_trees = collection.game_trees().len(), "Collection parsed");
    Ok(collection)
}

/// Reads a stream to the end and parses it.
#[instrument(skip(reader))]
pub fn parse_reader(mut reader: impl Read) -> Result<Collection, StnError> {
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;
    parse(&input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_tree() {
        let collection = parse(b"(;FF[4]GM[6];B[64a2e3])").unwrap();
        assert_eq!(collection.game_trees().len(), 1);
        let tree = collection.game_tree(collection.game_trees()[0]);
        assert_eq!(tree.nodes().len(), 2);
        let root = collection.node(tree.nodes()[0]);
        assert_eq!(root.value("FF"), Some(&Value::Raw(Raw::single("4"))));
    }

    #[test]
    fn variations_nest() {
        let collection = parse(b"(;GM[6](;B[31])(;B[42]))\n(;GM[6])").unwrap();
        assert_eq!(collection.game_trees().len(), 2);
        let first = collection.game_tree(collection.game_trees()[0]);
        assert_eq!(first.children().len(), 2);
    }

    #[test]
    fn multiple_entries() {
        let collection = parse(b"(;AE[a][b]\n  [c])").unwrap();
        let node = collection.node(collection.game_tree(collection.game_trees()[0]).nodes()[0]);
        let Some(Value::Raw(raw)) = node.value("AE") else {
            panic!("expected raw value");
        };
        assert_eq!(raw.entries(), &["a", "b", "c"]);
    }

    #[test]
    fn errors_carry_location() {
        let err = parse(b"(;FF[4]\n;;B 4])").unwrap_err();
        assert_eq!(err.kind, StnErrorKind::Syntax);
        assert_eq!(err.location, Some(TextLocation { line: 2, column: 5 }));
        assert_eq!(err.token.as_deref(), Some("'4'"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(parse(b"  ").unwrap_err().kind, StnErrorKind::Syntax);
        assert_eq!(parse(b"(;)").unwrap().game_trees().len(), 1);
        assert_eq!(parse(b"()").unwrap_err().kind, StnErrorKind::Syntax);
    }

    #[test]
    fn unterminated_input() {
        assert_eq!(parse(b"(;C[open").unwrap_err().kind, StnErrorKind::Syntax);
        assert_eq!(parse(b"(;C[x]").unwrap_err().kind, StnErrorKind::Syntax);
    }

    #[test]
    fn duplicate_properties() {
        let err = parse(b"(;C[a]C[b])").unwrap_err();
        assert_eq!(err.kind, StnErrorKind::PropertyExists);
    }

    #[test]
    fn latin1_is_default() {
        let collection = parse(b"(;C[Gr\xfc\xdfe])").unwrap();
        let node = collection.node(collection.game_tree(collection.game_trees()[0]).nodes()[0]);
        assert_eq!(node.value("C"), Some(&Value::Raw(Raw::single("Grüße"))));
    }

    #[test]
    fn declared_charset_is_honored_and_rewritten() {
        let input = "(;CA[utf-8]C[Grüße];C[ü])".as_bytes();
        let collection = parse(input).unwrap();
        let tree = collection.game_tree(collection.game_trees()[0]);
        let root = collection.node(tree.nodes()[0]);
        assert_eq!(root.value("CA"), Some(&Value::Raw(Raw::single("UTF-8"))));
        assert_eq!(root.value("C"), Some(&Value::Raw(Raw::single("Grüße"))));
        let second = collection.node(tree.nodes()[1]);
        assert_eq!(second.value("C"), Some(&Value::Raw(Raw::single("ü"))));
    }
}
