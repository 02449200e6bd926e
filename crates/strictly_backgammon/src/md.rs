//! Match dump (MD): a line-oriented, append-friendly match record.
//!
//! ```text
//! MatchDump 1
//! Player White "alice"
//! Player Black "bob"
//! Length 5
//! Crawford
//! Game
//! White 1700000000000000 roll 3 1
//! White 1700000000000001 move 8/5 6/5
//! ```
//!
//! A bare `Game` line starts a game from the position derived from the
//! previous game; otherwise the line carries the full initial position.

use crate::action::{ActionRecord, ActionVerb, GameAction, Step};
use crate::error::{MatchError, MatchErrorKind};
use crate::game::{Match, Rank};
use crate::position::Position;
use crate::side::Side;
use chrono::DateTime;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument};

/// First token of every match dump.
pub const MAGIC: &str = "MatchDump";

/// Format version written and accepted.
pub const VERSION: u32 = 1;

// ─────────────────────────────────────────────────────────────
//  Quoting
// ─────────────────────────────────────────────────────────────

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Bare(String),
    Quoted(String),
}

impl Field {
    fn text(&self) -> &str {
        match self {
            Self::Bare(s) | Self::Quoted(s) => s,
        }
    }
}

fn split_fields(line: &str, line_number: usize) -> Result<Vec<Field>, MatchError> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c != '"' {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
            fields.push(Field::Bare(word));
            continue;
        }

        chars.next();
        let mut text = String::new();
        loop {
            match chars.next() {
                None => return Err(MatchError::syntax(line_number, "unterminated string")),
                Some('"') => break,
                Some('\\') => match chars.next() {
                    Some('n') => text.push('\n'),
                    Some('r') => text.push('\r'),
                    Some('t') => text.push('\t'),
                    Some('x') => {
                        let hex: String = chars.by_ref().take(2).collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| {
                                MatchError::syntax(line_number, format!("bad escape \\x{}", hex))
                            })?;
                        text.push(code);
                    }
                    Some(c) => text.push(c),
                    None => return Err(MatchError::syntax(line_number, "dangling backslash")),
                },
                Some(c) => text.push(c),
            }
        }
        fields.push(Field::Quoted(text));
    }
    Ok(fields)
}

// ─────────────────────────────────────────────────────────────
//  Writing
// ─────────────────────────────────────────────────────────────

fn point_token(side: Side, point: u8) -> String {
    if point == side.bar_point() {
        "bar".to_string()
    } else if point == side.off_point() {
        "off".to_string()
    } else {
        point.to_string()
    }
}

fn header_lines(record: &Match) -> Vec<String> {
    let mut lines = vec![format!("{} {}", MAGIC, VERSION)];
    for side in Side::iter() {
        lines.push(format!("Player {} {}", side, quote(record.player(side))));
    }
    for side in Side::iter() {
        if let Some(rank) = record.rank(side) {
            lines.push(format!(
                "Rank {} {} {}",
                side,
                rank.rating(),
                rank.experience()
            ));
        }
    }
    if let Some(location) = record.location() {
        lines.push(format!("Location {}", quote(location)));
    }
    if let Some(start) = record.start_time() {
        lines.push(format!("StartTime {}", start.timestamp_micros()));
    }
    lines.push(format!("Length {}", record.length()));
    if *record.crawford() {
        lines.push("Crawford".to_string());
    }
    lines
}

fn position_fields(position: &Position) -> String {
    let points = position
        .points()
        .iter()
        .map(i8::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    let [bar_w, bar_b] = position.bar();
    let [d1, d2] = position.dice();
    let [md_w, md_b] = position.may_double();
    let [score_w, score_b] = position.score();
    let turn = position
        .turn()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "None".to_string());
    format!(
        "Position {} Bar {} {} Dice {} {} Cube {} MayDouble {} {} Score {} {} Turn {}",
        points,
        bar_w,
        bar_b,
        d1,
        d2,
        position.cube(),
        u8::from(md_w),
        u8::from(md_b),
        score_w,
        score_b,
        turn
    )
}

fn game_line(record: &Match, index: usize) -> String {
    let Some(game) = record.games().get(index) else {
        return "Game".to_string();
    };
    let (derived, crawford) = record.derived_initial_at(index);
    if *game.initial() == derived && *game.crawford() == crawford {
        "Game".to_string()
    } else {
        format!("Game {}", position_fields(game.initial()))
    }
}

/// Formats one action record as an MD line without terminator.
pub fn action_line(record: &ActionRecord) -> String {
    let side = *record.side();
    let head = format!("{} {} {}", side, record.timestamp(), record.action().verb());
    match record.action() {
        GameAction::Roll([d1, d2]) => format!("{} {} {}", head, d1, d2),
        GameAction::Move(steps) => {
            let mut line = head;
            for step in steps {
                line.push(' ');
                line.push_str(&point_token(side, step.from));
                line.push('/');
                line.push_str(&point_token(side, step.to));
            }
            line
        }
        GameAction::Resign(value) => format!("{} {}", head, value),
        GameAction::Double
        | GameAction::Take
        | GameAction::Drop
        | GameAction::Accept
        | GameAction::Reject => head,
    }
}

/// Writes a complete match dump.
#[instrument(skip_all, fields(games = record.games().len()))]
pub fn write_md<W: Write>(record: &Match, out: &mut W) -> Result<(), MatchError> {
    for line in header_lines(record) {
        writeln!(out, "{}", line)?;
    }
    for (index, game) in record.games().iter().enumerate() {
        writeln!(out, "{}", game_line(record, index))?;
        for action in game.actions() {
            writeln!(out, "{}", action_line(action))?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Renders a match dump into a string.
pub fn to_md_string(record: &Match) -> Result<String, MatchError> {
    let mut buffer = Vec::new();
    write_md(record, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| MatchError::new(MatchErrorKind::Io, format!("non UTF-8 output: {}", e)))
}

// ─────────────────────────────────────────────────────────────
//  Incremental writer
// ─────────────────────────────────────────────────────────────

/// Appends a growing match to a file, one line per new game or action.
///
/// Every appended action is flushed so the file always reflects the
/// recorded match.
#[derive(Debug)]
pub struct MdWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: Vec<usize>,
}

impl MdWriter {
    /// Creates (or truncates) `path` and writes the whole match.
    #[instrument(skip(path, record), fields(path = %path.as_ref().display()))]
    pub fn create(path: impl AsRef<Path>, record: &Match) -> Result<Self, MatchError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = Self {
            path,
            out: BufWriter::new(file),
            written: Vec::new(),
        };
        for line in header_lines(record) {
            writeln!(writer.out, "{}", line)?;
        }
        writer.sync(record)?;
        writer.out.flush()?;
        info!(path = %writer.path.display(), "Match file created");
        Ok(writer)
    }

    /// Opens an existing file holding `record` for appending.
    #[instrument(skip(path, record), fields(path = %path.as_ref().display()))]
    pub fn open_append(path: impl AsRef<Path>, record: &Match) -> Result<Self, MatchError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().append(true).open(&path)?;
        let written = record.games().iter().map(|g| g.actions().len()).collect();
        debug!(path = %path.display(), "Match file opened for appending");
        Ok(Self {
            path,
            out: BufWriter::new(file),
            written,
        })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends whatever `record` holds beyond what was already written.
    ///
    /// Returns the number of lines appended.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn sync(&mut self, record: &Match) -> Result<usize, MatchError> {
        let mut appended = 0;
        for (index, game) in record.games().iter().enumerate() {
            if index >= self.written.len() {
                writeln!(self.out, "{}", game_line(record, index))?;
                self.out.flush()?;
                self.written.push(0);
                appended += 1;
            }
            for action in game.actions().iter().skip(self.written[index]) {
                self.append_action(action)?;
                self.written[index] += 1;
                appended += 1;
            }
        }
        Ok(appended)
    }

    /// Appends one action line and flushes.
    pub fn append_action(&mut self, action: &ActionRecord) -> Result<(), MatchError> {
        writeln!(self.out, "{}", action_line(action))?;
        self.out.flush()?;
        debug!(verb = %action.action().verb(), "Action appended");
        Ok(())
    }

    /// Flushes and closes the file.
    pub fn close(mut self) -> Result<(), MatchError> {
        self.out.flush()?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
//  Reading
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Magic,
    Header,
    Body,
}

#[derive(Debug, Default)]
struct Header {
    players: [Option<String>; 2],
    ranks: [Option<Rank>; 2],
    location: Option<String>,
    start_time: Option<i64>,
    length: Option<u32>,
    crawford: bool,
}

impl Header {
    fn into_match(self, line_number: usize) -> Result<Match, MatchError> {
        let length = self
            .length
            .ok_or_else(|| MatchError::syntax(line_number, "missing Length record"))?;
        let [white, black] = self.players;
        let mut record = Match::new(
            white.unwrap_or_default(),
            black.unwrap_or_default(),
            length,
            self.crawford,
        );
        for side in Side::iter() {
            if let Some(rank) = self.ranks[side.index()] {
                record = record.with_rank(side, rank);
            }
        }
        if let Some(location) = self.location {
            record = record.with_location(location);
        }
        if let Some(micros) = self.start_time {
            let start = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                MatchError::syntax(line_number, format!("start time {} out of range", micros))
            })?;
            record = record.with_start_time(start);
        }
        Ok(record)
    }
}

fn number<T: std::str::FromStr>(
    fields: &[Field],
    index: usize,
    line_number: usize,
) -> Result<T, MatchError> {
    let text = fields
        .get(index)
        .map(Field::text)
        .ok_or_else(|| MatchError::syntax(line_number, "missing operand"))?;
    text.parse()
        .map_err(|_| MatchError::syntax(line_number, format!("bad number '{}'", text)))
}

fn side_field(fields: &[Field], index: usize, line_number: usize) -> Result<Side, MatchError> {
    let text = fields
        .get(index)
        .map(Field::text)
        .ok_or_else(|| MatchError::syntax(line_number, "missing side"))?;
    text.parse()
        .map_err(|_| MatchError::syntax(line_number, format!("bad side '{}'", text)))
}

fn quoted(fields: &[Field], index: usize, line_number: usize) -> Result<String, MatchError> {
    match fields.get(index) {
        Some(Field::Quoted(text)) => Ok(text.clone()),
        _ => Err(MatchError::syntax(line_number, "expected quoted string")),
    }
}

fn expect_keyword(
    fields: &[Field],
    index: usize,
    keyword: &str,
    line_number: usize,
) -> Result<(), MatchError> {
    match fields.get(index) {
        Some(Field::Bare(word)) if word == keyword => Ok(()),
        _ => Err(MatchError::syntax(line_number, format!("expected '{}'", keyword))),
    }
}

fn parse_position(fields: &[Field], line_number: usize) -> Result<Position, MatchError> {
    expect_keyword(fields, 1, "Position", line_number)?;
    let mut points = [0i8; 24];
    for (i, point) in points.iter_mut().enumerate() {
        *point = number(fields, 2 + i, line_number)?;
    }
    expect_keyword(fields, 26, "Bar", line_number)?;
    let bar = [number(fields, 27, line_number)?, number(fields, 28, line_number)?];
    expect_keyword(fields, 29, "Dice", line_number)?;
    let dice = [number(fields, 30, line_number)?, number(fields, 31, line_number)?];
    expect_keyword(fields, 32, "Cube", line_number)?;
    let cube = number(fields, 33, line_number)?;
    expect_keyword(fields, 34, "MayDouble", line_number)?;
    let may_double = [
        number::<u8>(fields, 35, line_number)? != 0,
        number::<u8>(fields, 36, line_number)? != 0,
    ];
    expect_keyword(fields, 37, "Score", line_number)?;
    let score_w = number(fields, 38, line_number)?;
    let score_b = number(fields, 39, line_number)?;
    expect_keyword(fields, 40, "Turn", line_number)?;
    let turn = match fields.get(41).map(Field::text) {
        Some("None") => None,
        Some(_) => Some(side_field(fields, 41, line_number)?),
        None => return Err(MatchError::syntax(line_number, "missing turn")),
    };
    if fields.len() > 42 {
        return Err(MatchError::syntax(line_number, "trailing fields after position"));
    }
    Ok(Position::starting(0)
        .with_board(points, bar)
        .with_dice(turn, dice)
        .with_cube(cube, may_double)
        .with_score(score_w, score_b))
}

fn parse_point(side: Side, text: &str, line_number: usize) -> Result<u8, MatchError> {
    match text {
        "bar" => Ok(side.bar_point()),
        "off" => Ok(side.off_point()),
        _ => text
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 25)
            .ok_or_else(|| MatchError::syntax(line_number, format!("bad point '{}'", text))),
    }
}

fn parse_action(fields: &[Field], line_number: usize) -> Result<ActionRecord, MatchError> {
    let side = side_field(fields, 0, line_number)?;
    let timestamp: i64 = number(fields, 1, line_number)?;
    let verb_text = fields
        .get(2)
        .map(Field::text)
        .ok_or_else(|| MatchError::syntax(line_number, "missing verb"))?;
    let verb: ActionVerb = verb_text
        .parse()
        .map_err(|_| MatchError::syntax(line_number, format!("unknown verb '{}'", verb_text)))?;
    let operands = &fields[3..];
    let arity = |n: usize| {
        if operands.len() == n {
            Ok(())
        } else {
            Err(MatchError::syntax(
                line_number,
                format!("{} takes {} operands", verb, n),
            ))
        }
    };
    let action = match verb {
        ActionVerb::Roll => {
            arity(2)?;
            GameAction::Roll([number(fields, 3, line_number)?, number(fields, 4, line_number)?])
        }
        ActionVerb::Move => {
            let steps = operands
                .iter()
                .map(|field| {
                    let text = field.text();
                    let (from, to) = text.split_once('/').ok_or_else(|| {
                        MatchError::syntax(line_number, format!("bad step '{}'", text))
                    })?;
                    Ok(Step::new(
                        parse_point(side, from, line_number)?,
                        parse_point(side, to, line_number)?,
                    ))
                })
                .collect::<Result<Vec<_>, MatchError>>()?;
            GameAction::Move(steps)
        }
        ActionVerb::Resign => {
            arity(1)?;
            GameAction::Resign(number(fields, 3, line_number)?)
        }
        ActionVerb::Double => {
            arity(0)?;
            GameAction::Double
        }
        ActionVerb::Take => {
            arity(0)?;
            GameAction::Take
        }
        ActionVerb::Drop => {
            arity(0)?;
            GameAction::Drop
        }
        ActionVerb::Accept => {
            arity(0)?;
            GameAction::Accept
        }
        ActionVerb::Reject => {
            arity(0)?;
            GameAction::Reject
        }
    };
    Ok(ActionRecord::new(side, action, timestamp))
}

/// Reads a match dump.
///
/// Every action is replayed through the rules; an inconsistent dump fails
/// with `IllegalAction` carrying the offending line.
#[instrument(skip_all, fields(bytes = input.len()))]
pub fn read_md(input: &[u8]) -> Result<Match, MatchError> {
    let text = std::str::from_utf8(input)
        .map_err(|e| MatchError::new(MatchErrorKind::Syntax, format!("invalid UTF-8: {}", e)))?;

    let mut state = State::Magic;
    let mut header = Header::default();
    let mut record: Option<Match> = None;
    let mut last_line = 0;

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        last_line = line_number;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = split_fields(line, line_number)?;
        let keyword = fields.first().map(Field::text).unwrap_or_default();

        match state {
            State::Magic => {
                if keyword != MAGIC {
                    return Err(MatchError::syntax(line_number, "not a match dump"));
                }
                let version: u32 = number(&fields, 1, line_number)?;
                if version != VERSION {
                    return Err(MatchError::syntax(
                        line_number,
                        format!("unsupported version {}", version),
                    ));
                }
                state = State::Header;
            }
            State::Header if keyword != "Game" => match keyword {
                "Player" => {
                    let side = side_field(&fields, 1, line_number)?;
                    header.players[side.index()] = Some(quoted(&fields, 2, line_number)?);
                }
                "Rank" => {
                    let side = side_field(&fields, 1, line_number)?;
                    let rank = Rank::new(
                        number(&fields, 2, line_number)?,
                        number(&fields, 3, line_number)?,
                    );
                    header.ranks[side.index()] = Some(rank);
                }
                "Location" => header.location = Some(quoted(&fields, 1, line_number)?),
                "StartTime" => header.start_time = Some(number(&fields, 1, line_number)?),
                "Length" => header.length = Some(number(&fields, 1, line_number)?),
                "Crawford" => header.crawford = true,
                other => {
                    return Err(MatchError::syntax(
                        line_number,
                        format!("unknown header record '{}'", other),
                    ));
                }
            },
            State::Header | State::Body => {
                if state == State::Header {
                    record = Some(std::mem::take(&mut header).into_match(line_number)?);
                    state = State::Body;
                }
                let Some(record) = record.as_mut() else {
                    return Err(MatchError::new(MatchErrorKind::Syntax, "no match header"));
                };
                if keyword == "Game" {
                    let started = if fields.len() == 1 {
                        record.append_game()
                    } else {
                        record.append_game_with(parse_position(&fields, line_number)?)
                    };
                    started.map_err(|e| e.at_line(line_number))?;
                    continue;
                }
                if record.games().is_empty() {
                    return Err(MatchError::syntax(line_number, "action before first Game"));
                }
                let action = parse_action(&fields, line_number)?;
                record
                    .add_action(
                        *action.side(),
                        action.action().clone(),
                        Some(*action.timestamp()),
                    )
                    .map_err(|e| e.at_line(line_number))?;
            }
        }
    }

    let record = match (state, record) {
        (State::Magic, _) => return Err(MatchError::syntax(last_line.max(1), "empty input")),
        (_, Some(record)) => record,
        (_, None) => header.into_match(last_line)?,
    };
    info!(
        games = record.games().len(),
        actions = record.action_count(),
        "Match dump read"
    );
    Ok(record)
}

/// Reads a match dump from a file.
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn read_md_file(path: impl AsRef<Path>) -> Result<Match, MatchError> {
    let bytes = std::fs::read(path.as_ref())?;
    read_md(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_specials() {
        let text = "say \"hi\"\\\n\tok";
        let quoted_text = quote(text);
        assert_eq!(quoted_text, "\"say \\\"hi\\\"\\\\\\n\\tok\"");
        let fields = split_fields(&format!("Player White {}", quoted_text), 1).unwrap();
        assert_eq!(fields[2], Field::Quoted(text.to_string()));
    }

    #[test]
    fn bar_and_off_tokens_depend_on_side() {
        let white = ActionRecord::new(
            Side::White,
            GameAction::Move(vec![Step::new(25, 22), Step::new(3, 0)]),
            5,
        );
        assert_eq!(action_line(&white), "White 5 move bar/22 3/off");
        let black = ActionRecord::new(
            Side::Black,
            GameAction::Move(vec![Step::new(0, 3), Step::new(22, 25)]),
            6,
        );
        assert_eq!(action_line(&black), "Black 6 move bar/3 22/off");
        let fields = split_fields("Black 6 move bar/3 22/off", 1).unwrap();
        assert_eq!(parse_action(&fields, 1).unwrap(), black);
    }

    #[test]
    fn unknown_verb_reports_line() {
        let input = b"MatchDump 1\nLength 1\nGame\nWhite 1 fly 3 1\n";
        let err = read_md(input).unwrap_err();
        assert_eq!(err.kind(), MatchErrorKind::Syntax);
        assert_eq!(err.line_number, Some(4));
    }

    #[test]
    fn position_line_round_trips() {
        let position = Position::starting(0)
            .with_dice(Some(Side::Black), [5, 2])
            .with_cube(4, [true, false])
            .with_score(3, 1);
        let line = format!("Game {}", position_fields(&position));
        let fields = split_fields(&line, 1).unwrap();
        assert_eq!(parse_position(&fields, 1).unwrap(), position);
    }
}
