//! Typed semantic values.
//!
//! Parsing produces [`Value::Raw`]; cooking replaces it with the variant the
//! flavor assigns to the property identifier. A cooked value never changes
//! variant afterwards.

mod backgammon;
mod color;
mod date;
mod list;
mod number;
mod result;

pub use backgammon::{MAX_POINT, MAX_SUB_MOVES, Move, MoveKind, Point, Stone, SubMove};
pub use color::Color;
pub use date::{Date, DateEntry};
pub use list::{Compose, ListBuilder, ListOf};
pub use number::{DoubleGrade, format_real, parse_number, parse_real};
pub use result::{GameResult, ResultCause, Winner};

use crate::error::{StnError, StnErrorKind};
use crate::flavor::Flavor;
use crate::text::{TextMode, escape, normalize_spaces, split_compose, unescape};
use std::io::Write;
use tracing::instrument;

/// Run-time type tag of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ValueKind {
    /// Uncooked text entries.
    Raw,
    /// No payload.
    Empty,
    /// Integer.
    Number,
    /// Floating point.
    Real,
    /// Single-line text.
    SimpleText,
    /// Multi-line text.
    Text,
    /// Black or white.
    Color,
    /// Emphasis grade.
    Double,
    /// Date list.
    Date,
    /// Game result.
    Result,
    /// Backgammon move.
    Move,
    /// Board point.
    Point,
    /// Setup stone.
    Stone,
    /// Pair of values.
    Compose,
    /// Homogeneous list.
    List,
}

/// Uncooked value: one entry per bracketed occurrence, escapes intact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Raw {
    entries: Vec<String>,
}

impl Raw {
    /// Creates a raw value from its entries.
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// Creates a raw value with a single entry.
    pub fn single(entry: impl Into<String>) -> Self {
        Self {
            entries: vec![entry.into()],
        }
    }

    /// All entries.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }
}

/// A typed or raw property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Uncooked entries.
    Raw(Raw),
    /// No payload.
    Empty,
    /// Signed integer.
    Number(i64),
    /// Finite or infinite double; NaN cannot be written.
    Real(f64),
    /// Single-line text, unescaped.
    SimpleText(String),
    /// Multi-line text, unescaped.
    Text(String),
    /// Black or white.
    Color(Color),
    /// Emphasis grade.
    Double(DoubleGrade),
    /// Date list.
    Date(Date),
    /// Game result.
    Result(GameResult),
    /// Backgammon move.
    Move(Move),
    /// Board point.
    Point(Point),
    /// Setup stone.
    Stone(Stone),
    /// `head:tail` pair.
    Compose(Box<Compose>),
    /// Homogeneous list.
    List(ListOf),
}

impl Value {
    /// Run-time type tag.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Raw(_) => ValueKind::Raw,
            Self::Empty => ValueKind::Empty,
            Self::Number(_) => ValueKind::Number,
            Self::Real(_) => ValueKind::Real,
            Self::SimpleText(_) => ValueKind::SimpleText,
            Self::Text(_) => ValueKind::Text,
            Self::Color(_) => ValueKind::Color,
            Self::Double(_) => ValueKind::Double,
            Self::Date(_) => ValueKind::Date,
            Self::Result(_) => ValueKind::Result,
            Self::Move(_) => ValueKind::Move,
            Self::Point(_) => ValueKind::Point,
            Self::Stone(_) => ValueKind::Stone,
            Self::Compose(_) => ValueKind::Compose,
            Self::List(_) => ValueKind::List,
        }
    }

    /// Creates single-line text, normalizing tabs and form feeds.
    ///
    /// Fails with `InvalidArgument` if the text contains a line break.
    #[instrument(skip(text))]
    pub fn simple_text(text: &str) -> Result<Self, StnError> {
        if text.contains(['\n', '\r']) {
            return Err(StnError::new(
                StnErrorKind::InvalidArgument,
                "Simple text cannot contain line breaks",
            ));
        }
        Ok(Self::SimpleText(normalize_spaces(text)))
    }

    /// Creates multi-line text, normalizing tabs and form feeds.
    pub fn text(text: &str) -> Self {
        Self::Text(normalize_spaces(text))
    }

    /// Whether the value is still uncooked.
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    /// Number payload, if any.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text payload of either text variant.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::SimpleText(t) | Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Points covered by a point, a point list or a raw single entry.
    pub fn points(&self) -> Vec<Point> {
        match self {
            Self::Point(p) => vec![*p],
            Self::List(list) => list
                .items()
                .iter()
                .filter_map(|v| match v {
                    Self::Point(p) => Some(*p),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Renders one bracket entry for a scalar value.
    fn entry(&self, in_compose: bool) -> Result<String, StnError> {
        Ok(match self {
            Self::Raw(raw) => match raw.entries() {
                [single] => single.clone(),
                _ => {
                    return Err(StnError::new(
                        StnErrorKind::UsageError,
                        "A raw value inside a composed value must have exactly one entry",
                    ));
                }
            },
            Self::Empty => String::new(),
            Self::Number(n) => n.to_string(),
            Self::Real(r) => format_real(*r)?,
            Self::SimpleText(t) | Self::Text(t) => escape(t, in_compose),
            Self::Color(c) => c.to_string(),
            Self::Double(d) => d.as_number().to_string(),
            Self::Date(d) => d.format(),
            Self::Result(r) => r.format()?,
            Self::Move(m) => m.format(),
            Self::Point(p) => p.to_char().to_string(),
            Self::Stone(s) => s.to_char().to_string(),
            Self::Compose(c) => format!("{}:{}", c.head().entry(true)?, c.tail().entry(true)?),
            Self::List(_) => {
                return Err(StnError::new(
                    StnErrorKind::UsageError,
                    "Lists cannot be nested",
                ));
            }
        })
    }

    /// Renders all bracket entries of the value.
    #[instrument(skip(self, flavor), fields(kind = %self.kind()))]
    pub fn entries(&self, flavor: &dyn Flavor) -> Result<Vec<String>, StnError> {
        match self {
            Self::Raw(raw) => Ok(raw.entries().to_vec()),
            Self::List(list) => {
                let points = self.points();
                if list.item_kind() == ValueKind::Point
                    && points.len() == list.len()
                    && flavor.supports_compressed_lists()
                {
                    return flavor.write_compressed_list(&points);
                }
                list.items().iter().map(|v| v.entry(false)).collect()
            }
            other => Ok(vec![other.entry(false)?]),
        }
    }

    /// Writes the value as `[e1][e2]...`, returning the bytes written.
    #[instrument(skip(self, sink, flavor), fields(kind = %self.kind()))]
    pub fn write(&self, sink: &mut dyn Write, flavor: &dyn Flavor) -> Result<usize, StnError> {
        let entries = self.entries(flavor)?;
        if entries.is_empty() {
            return Err(StnError::new(
                StnErrorKind::EmptyProperty,
                "Property value has no entries",
            ));
        }
        let mut written = 0;
        for entry in entries {
            sink.write_all(b"[")?;
            sink.write_all(entry.as_bytes())?;
            sink.write_all(b"]")?;
            written += entry.len() + 2;
        }
        Ok(written)
    }
}

/// Constructor descriptor: the type a flavor assigns to a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// No payload; the single entry must be empty.
    Empty,
    /// Signed integer.
    Number,
    /// Floating point.
    Real,
    /// Single-line text.
    SimpleText,
    /// Multi-line text.
    Text,
    /// Black or white.
    Color,
    /// Emphasis grade 1 or 2.
    Double,
    /// Date list.
    Date,
    /// Game result.
    Result,
    /// Flavor-specific move.
    Move,
    /// Flavor-specific point.
    Point,
    /// Flavor-specific stone.
    Stone,
    /// `head:tail` pair.
    Compose(&'static ValueType, &'static ValueType),
    /// Non-empty list.
    List(&'static ValueType),
    /// List that may be written as a single empty entry.
    EList(&'static ValueType),
    /// First alternative that cooks wins.
    Either(&'static ValueType, &'static ValueType),
}

fn single_entry(raw: &Raw) -> Result<&str, StnError> {
    match raw.entries() {
        [single] => Ok(single),
        [] => Err(StnError::new(StnErrorKind::ListEmpty, "Value has no entries")),
        entries => Err(StnError::new(
            StnErrorKind::ListTooLong,
            format!("Expected one value, got {}", entries.len()),
        )),
    }
}

impl ValueType {
    /// Cooks a raw value into this type.
    #[instrument(skip(raw, flavor), fields(entries = raw.len()))]
    pub fn cook(&self, raw: &Raw, flavor: &dyn Flavor) -> Result<Value, StnError> {
        match self {
            Self::List(item) | Self::EList(item) => {
                if let [single] = raw.entries()
                    && single.is_empty()
                {
                    return match self {
                        Self::EList(_) => Ok(Value::List(ListOf::empty())),
                        _ => Err(StnError::new(
                            StnErrorKind::ListEmpty,
                            "List requires at least one value",
                        )),
                    };
                }
                let mut builder = ListBuilder::new(item.kind());
                for entry in raw.entries() {
                    if **item == Self::Point
                        && flavor.supports_compressed_lists()
                        && let Some((from, to)) = split_compose(entry)
                    {
                        for point in flavor.append_points(from, to)? {
                            builder.append(Value::Point(point))?;
                        }
                        continue;
                    }
                    builder.append(item.cook_entry(entry, flavor)?)?;
                }
                Ok(Value::List(builder.build()?))
            }
            Self::Either(first, second) => first
                .cook(raw, flavor)
                .or_else(|_| second.cook(raw, flavor)),
            scalar => scalar.cook_entry(single_entry(raw)?, flavor),
        }
    }

    /// Cooks a single bracket entry into this type.
    pub fn cook_entry(&self, entry: &str, flavor: &dyn Flavor) -> Result<Value, StnError> {
        match self {
            Self::Empty => {
                if entry.is_empty() {
                    Ok(Value::Empty)
                } else {
                    Err(StnError::new(
                        StnErrorKind::SemanticError,
                        format!("Expected no value, got '{}'", entry),
                    ))
                }
            }
            Self::Number => parse_number(entry).map(Value::Number),
            Self::Real => parse_real(entry).map(Value::Real),
            Self::SimpleText => Ok(Value::SimpleText(unescape(entry, TextMode::Simple, None).0)),
            Self::Text => Ok(Value::Text(unescape(entry, TextMode::Text, None).0)),
            Self::Color => Color::parse(entry).map(Value::Color),
            Self::Double => DoubleGrade::parse(entry).map(Value::Double),
            Self::Date => Date::parse(entry).map(Value::Date),
            Self::Result => GameResult::parse(entry).map(Value::Result),
            Self::Move => flavor.create_move(entry).map(Value::Move),
            Self::Point => flavor.create_point(entry).map(Value::Point),
            Self::Stone => flavor.create_stone(entry).map(Value::Stone),
            Self::Compose(head, tail) => {
                let Some((h, t)) = split_compose(entry) else {
                    return Err(StnError::new(
                        StnErrorKind::SemanticError,
                        format!("Expected composed value, got '{}'", entry),
                    ));
                };
                Ok(Value::Compose(Box::new(Compose::new(
                    head.cook_entry(h, flavor)?,
                    tail.cook_entry(t, flavor)?,
                ))))
            }
            Self::Either(first, second) => first
                .cook_entry(entry, flavor)
                .or_else(|_| second.cook_entry(entry, flavor)),
            Self::List(_) | Self::EList(_) => Err(StnError::new(
                StnErrorKind::UsageError,
                "Lists cannot be nested",
            )),
        }
    }

    /// Value kind produced by this type.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Empty => ValueKind::Empty,
            Self::Number => ValueKind::Number,
            Self::Real => ValueKind::Real,
            Self::SimpleText => ValueKind::SimpleText,
            Self::Text => ValueKind::Text,
            Self::Color => ValueKind::Color,
            Self::Double => ValueKind::Double,
            Self::Date => ValueKind::Date,
            Self::Result => ValueKind::Result,
            Self::Move => ValueKind::Move,
            Self::Point => ValueKind::Point,
            Self::Stone => ValueKind::Stone,
            Self::Compose(..) => ValueKind::Compose,
            Self::List(_) | Self::EList(_) => ValueKind::List,
            Self::Either(first, _) => first.kind(),
        }
    }
}
