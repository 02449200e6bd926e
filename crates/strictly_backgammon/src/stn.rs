//! Conversion between matches and backgammon game trees.
//!
//! Each game becomes one top-level game tree. The root node carries the
//! players, the match info list (`MI[length:n][game:k][ws:w][bs:b]`) and
//! the result; every following node carries one move. A roll and the
//! checker play that uses it share a single move such as `W[31ifgf]`.

use crate::action::{EndCause, GameAction, Step};
use crate::error::MatchError;
use crate::game::{Game, Match, Rank};
use crate::position::Position;
use crate::side::Side;
use chrono::{Datelike, NaiveDate};
use strictly_stn::{
    BACKGAMMON_GAME_ID, Collection, Color, Compose, Date, DateEntry, GameResult, GameTreeId,
    ListBuilder, Move, MoveKind, Node, Point, ResultCause, Stone, SubMove, Value, ValueKind,
    Winner, WriterOptions,
};
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn};

fn property_id(side: Side) -> &'static str {
    match side {
        Side::White => "W",
        Side::Black => "B",
    }
}

fn text_pair(head: &str, tail: &str) -> Result<Value, MatchError> {
    Ok(Value::Compose(Box::new(Compose::new(
        Value::simple_text(head)?,
        Value::simple_text(tail)?,
    ))))
}

fn match_info(record: &Match, number: usize, game: &Game) -> Result<Value, MatchError> {
    let [white, black] = game.initial().score();
    let mut list = ListBuilder::new(ValueKind::Compose);
    list.append(text_pair("length", &record.length().to_string())?)?;
    list.append(text_pair("game", &number.to_string())?)?;
    list.append(text_pair("ws", &white.to_string())?)?;
    list.append(text_pair("bs", &black.to_string())?)?;
    Ok(Value::List(list.build()?))
}

fn setup_stones(position: &Position, side: Side) -> Result<Option<Value>, MatchError> {
    let mut list = ListBuilder::new(ValueKind::Stone);
    let mut any = false;
    for point in 1..=24u8 {
        for _ in 0..position.count_at(point, side) {
            list.append(Value::Stone(Stone::new(point)?))?;
            any = true;
        }
    }
    for _ in 0..position.bar()[side.index()] {
        list.append(Value::Stone(Stone::new(side.bar_point())?))?;
        any = true;
    }
    Ok(if any { Some(Value::List(list.build()?)) } else { None })
}

fn add_setup(node: &mut Node, position: &Position) -> Result<(), MatchError> {
    for side in Side::iter() {
        let id = match side {
            Side::White => "AW",
            Side::Black => "AB",
        };
        if let Some(stones) = setup_stones(position, side)? {
            node.add_property(id, stones)?;
        }
    }
    if position.cube() != 1 {
        node.add_property("CV", Value::Number(i64::from(position.cube())))?;
    }
    let owner = match position.may_double() {
        [true, true] => "c",
        [true, false] => "w",
        [false, true] => "b",
        [false, false] => "",
    };
    if !owner.is_empty() {
        node.add_property("CO", Value::simple_text(owner)?)?;
    }
    if let Some(turn) = position.turn() {
        node.add_property("PL", Value::Color(Color::from(turn)))?;
    }
    Ok(())
}

fn result_value(end: &crate::action::GameEnd) -> Result<Value, MatchError> {
    let winner = match end.winner() {
        Side::White => Winner::White,
        Side::Black => Winner::Black,
    };
    let cause = match end.cause() {
        EndCause::BearOff => ResultCause::Normal,
        EndCause::Drop | EndCause::Resignation => ResultCause::Resignation,
    };
    Ok(Value::Result(GameResult::new(
        winner,
        f64::from(*end.points()),
        cause,
    )?))
}

fn sub_moves(steps: &[Step]) -> Result<Vec<SubMove>, MatchError> {
    steps
        .iter()
        .map(|s| {
            Ok(SubMove {
                from: Point::new(s.from)?,
                to: Point::new(s.to)?,
            })
        })
        .collect()
}

/// Records of a game grouped into tree moves.
fn game_moves(game: &Game) -> Result<Vec<(Side, Move)>, MatchError> {
    let mut moves = Vec::new();
    let mut actions = game.actions().iter().peekable();
    while let Some(record) = actions.next() {
        let side = *record.side();
        let mv = match record.action() {
            GameAction::Roll(dice) => {
                let steps = match actions.peek().map(|r| (r.side(), r.action())) {
                    Some((s, GameAction::Move(steps))) if *s == side => {
                        actions.next();
                        sub_moves(steps)?
                    }
                    _ => Vec::new(),
                };
                Move::regular(*dice, steps)?
            }
            GameAction::Move(_) => {
                return Err(MatchError::illegal("move without a preceding roll"));
            }
            GameAction::Double => Move::action(MoveKind::Double)?,
            GameAction::Take => Move::action(MoveKind::Take)?,
            GameAction::Drop => Move::action(MoveKind::Drop)?,
            GameAction::Resign(value) => Move::action(MoveKind::Resign(u32::from(*value)))?,
            GameAction::Accept => Move::action(MoveKind::Accept)?,
            GameAction::Reject => Move::action(MoveKind::Reject)?,
        };
        moves.push((side, mv));
    }
    Ok(moves)
}

/// Builds a cooked backgammon collection holding every game of a match.
#[instrument(skip_all, fields(games = record.games().len()))]
pub fn match_to_collection(record: &Match) -> Result<Collection, MatchError> {
    let mut collection = Collection::new();
    for (index, game) in record.games().iter().enumerate() {
        let tree = collection.add_game_tree(None);
        let root = collection.add_node(tree);
        let node = collection.node_mut(root);
        node.add_property("GM", Value::Number(BACKGAMMON_GAME_ID))?;
        node.add_property("PW", Value::simple_text(record.white())?)?;
        node.add_property("PB", Value::simple_text(record.black())?)?;
        node.add_property("MI", match_info(record, index + 1, game)?)?;
        if *record.crawford() {
            node.add_property("RU", Value::simple_text("Crawford")?)?;
        }
        for side in Side::iter() {
            if let Some(rank) = record.rank(side) {
                let id = match side {
                    Side::White => "WR",
                    Side::Black => "BR",
                };
                let text = format!("{} {}", rank.rating(), rank.experience());
                node.add_property(id, Value::simple_text(&text)?)?;
            }
        }
        if let Some(location) = record.location() {
            node.add_property("PC", Value::simple_text(location)?)?;
        }
        if let Some(start) = record.start_time() {
            let day = start.date_naive();
            let entry = DateEntry::new(
                u16::try_from(day.year()).unwrap_or(0),
                u8::try_from(day.month()).ok(),
                u8::try_from(day.day()).ok(),
            )?;
            node.add_property("DT", Value::Date(Date::new(vec![entry])?))?;
        }
        if let Some(end) = game.end() {
            node.add_property("RE", result_value(end)?)?;
        }
        let (derived, _) = record.derived_initial_at(index);
        if *game.initial() != derived {
            add_setup(node, game.initial())?;
        }

        for (side, mv) in game_moves(game)? {
            let id = collection.add_node(tree);
            collection
                .node_mut(id)
                .add_property(property_id(side), Value::Move(mv))?;
        }
        debug!(game = index + 1, "Game converted");
    }
    Ok(collection)
}

/// Writes a match as tree notation.
pub fn write_stn(record: &Match, options: &WriterOptions) -> Result<Vec<u8>, MatchError> {
    let collection = match_to_collection(record)?;
    Ok(strictly_stn::to_bytes(&collection, options)?)
}

// ─────────────────────────────────────────────────────────────
//  Reading
// ─────────────────────────────────────────────────────────────

fn text<'a>(node: &'a Node, id: &str) -> Option<&'a str> {
    node.value(id).and_then(Value::as_text)
}

fn info_entries(node: &Node) -> Vec<(String, String)> {
    let Some(Value::List(list)) = node.value("MI") else {
        return Vec::new();
    };
    list.items()
        .iter()
        .filter_map(|item| match item {
            Value::Compose(pair) => Some((
                pair.head().as_text()?.to_string(),
                pair.tail().as_text()?.to_string(),
            )),
            _ => None,
        })
        .collect()
}

fn info_number(entries: &[(String, String)], key: &str) -> Option<u32> {
    entries
        .iter()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.parse().ok())
}

fn stones(value: Option<&Value>) -> Vec<u8> {
    match value {
        Some(Value::Stone(stone)) => vec![stone.value()],
        Some(Value::List(list)) => list
            .items()
            .iter()
            .filter_map(|v| match v {
                Value::Stone(stone) => Some(stone.value()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn setup_position(
    node: &Node,
    length: u32,
    score: [u32; 2],
) -> Result<Option<Position>, MatchError> {
    if !node.has_property("AW") && !node.has_property("AB") {
        return Ok(None);
    }
    let mut points = [0i8; 24];
    let mut bar = [0u8; 2];
    for (side, id) in [(Side::White, "AW"), (Side::Black, "AB")] {
        for stone in stones(node.value(id)) {
            if stone == side.bar_point() {
                bar[side.index()] += 1;
            } else if (1..=24).contains(&stone) {
                points[usize::from(stone - 1)] += side.sign();
            } else {
                return Err(MatchError::illegal(format!(
                    "{} stone on point {}",
                    side, stone
                )));
            }
        }
    }
    let cube = node
        .value("CV")
        .and_then(Value::as_number)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(1);
    let may_double = match text(node, "CO") {
        Some("w") => [true, false],
        Some("b") => [false, true],
        Some("c") => [true, true],
        _ => [false, false],
    };
    let turn = match node.value("PL") {
        Some(Value::Color(color)) => Some(Side::from(*color)),
        _ => None,
    };
    Ok(Some(
        Position::starting(length)
            .with_board(points, bar)
            .with_dice(turn, [0, 0])
            .with_cube(cube, may_double)
            .with_score(score[0], score[1]),
    ))
}

fn parse_rank(text: &str) -> Option<Rank> {
    let mut words = text.split_whitespace();
    let rating = words.next()?.parse().ok()?;
    let experience = words.next()?.parse().ok()?;
    Some(Rank::new(rating, experience))
}

fn main_line(collection: &Collection, tree: GameTreeId) -> Vec<&Node> {
    let mut nodes = Vec::new();
    let mut current = Some(tree);
    while let Some(id) = current {
        let game_tree = collection.game_tree(id);
        nodes.extend(game_tree.nodes().iter().map(|&n| collection.node(n)));
        current = game_tree.children().first().copied();
    }
    nodes
}

/// Whether a roll by `side` may stay unplayed given the node after it.
fn roll_may_stand(side: Side, next: Option<&Node>) -> bool {
    let Some(next) = next else {
        return true;
    };
    matches!(
        next.value(property_id(side)),
        Some(Value::Move(mv)) if matches!(mv.kind(), MoveKind::Resign(_) | MoveKind::Double)
    )
}

fn replay_node(
    record: &mut Match,
    node: &Node,
    next: Option<&Node>,
) -> Result<(), MatchError> {
    for side in Side::iter() {
        let Some(Value::Move(mv)) = node.value(property_id(side)) else {
            continue;
        };
        match mv.kind() {
            MoveKind::Regular { dice, sub_moves } => {
                record.add_action(side, GameAction::Roll(*dice), Some(0))?;
                let steps: Vec<Step> = sub_moves
                    .iter()
                    .map(|s| Step::new(s.from.value(), s.to.value()))
                    .collect();
                let empty = steps.is_empty();
                match record.add_action(side, GameAction::Move(steps), Some(0)) {
                    Ok(_) => {}
                    Err(err) if empty && roll_may_stand(side, next) => {
                        debug!(%err, "Roll kept without a move");
                    }
                    Err(err) => return Err(err),
                }
            }
            MoveKind::Double => {
                record.add_action(side, GameAction::Double, Some(0))?;
            }
            MoveKind::Take => {
                record.add_action(side, GameAction::Take, Some(0))?;
            }
            MoveKind::Drop => {
                record.add_action(side, GameAction::Drop, Some(0))?;
            }
            MoveKind::Resign(value) => {
                if *value > 3 {
                    warn!(value, "Resignation value clamped to backgammon");
                }
                let value = u8::try_from((*value).min(3)).unwrap_or(3);
                record.add_action(side, GameAction::Resign(value), Some(0))?;
            }
            MoveKind::Accept => {
                record.add_action(side, GameAction::Accept, Some(0))?;
            }
            MoveKind::Reject => {
                record.add_action(side, GameAction::Reject, Some(0))?;
            }
        }
    }
    Ok(())
}

/// Builds a match from a cooked backgammon collection.
///
/// Players, length and settings come from the first game tree. Only the
/// main line of each tree is replayed; variations are ignored.
#[instrument(skip_all, fields(trees = collection.game_trees().len()))]
pub fn collection_to_match(collection: &Collection) -> Result<Match, MatchError> {
    let trees = collection.game_trees();
    let first = trees
        .first()
        .and_then(|&t| collection.first_node(t))
        .map(|n| collection.node(n))
        .ok_or_else(|| MatchError::syntax(1, "no game trees"))?;

    let entries = info_entries(first);
    let length = info_number(&entries, "length").unwrap_or(0);
    let crawford = text(first, "RU").is_some_and(|r| r.contains("Crawford"));
    let mut record = Match::new(
        text(first, "PW").unwrap_or_default(),
        text(first, "PB").unwrap_or_default(),
        length,
        crawford,
    );
    for (side, id) in [(Side::White, "WR"), (Side::Black, "BR")] {
        if let Some(rank) = text(first, id).and_then(parse_rank) {
            record = record.with_rank(side, rank);
        }
    }
    if let Some(location) = text(first, "PC") {
        record = record.with_location(location);
    }
    if let Some(Value::Date(date)) = first.value("DT")
        && let Some(entry) = date.entries().first()
        && let Some(day) = NaiveDate::from_ymd_opt(
            i32::from(entry.year()),
            u32::from(entry.month().unwrap_or(1)),
            u32::from(entry.day().unwrap_or(1)),
        )
        && let Some(start) = day.and_hms_opt(0, 0, 0)
    {
        record = record.with_start_time(start.and_utc());
    }

    for &tree in trees {
        let nodes = main_line(collection, tree);
        let Some(root) = nodes.first() else {
            continue;
        };
        let entries = info_entries(root);
        let derived = record.derived_initial().0;
        let score = [
            info_number(&entries, "ws").unwrap_or(derived.score()[0]),
            info_number(&entries, "bs").unwrap_or(derived.score()[1]),
        ];
        match setup_position(root, length, score)? {
            Some(position) => {
                record.append_game_with(position)?;
            }
            None if score != derived.score() => {
                let may_double = derived.may_double();
                let position = derived
                    .with_score(score[0], score[1])
                    .with_cube(1, may_double);
                record.append_game_with(position)?;
            }
            None => {
                record.append_game()?;
            }
        }
        for (i, node) in nodes.iter().enumerate() {
            replay_node(&mut record, node, nodes.get(i + 1).copied())?;
        }
    }
    info!(games = record.games().len(), "Match built from game trees");
    Ok(record)
}

/// Reads tree notation into a match.
pub fn read_stn(input: &[u8]) -> Result<Match, MatchError> {
    let collection = strictly_stn::read(input)?;
    collection_to_match(&collection)
}
