//! Reader for the JF event log.
//!
//! ```text
//! JF 1
//! m1:1:-:start of match:3 crawford;
//! m1:2:-:opponents:alice,bob;
//! m1:3:-:score:0,0;
//! m1:4:alice:roll:3 1;
//! m1:5:alice:move:8-5 6-5;
//! ```
//!
//! Moves use the mover's own numbering (25 is the bar, 0 is off). Results
//! claimed by `win game` and `win match` are checked against the replayed
//! match.

use crate::action::{GameAction, Step};
use crate::error::MatchError;
use crate::game::Match;
use crate::side::Side;
use tracing::{debug, info, instrument, warn};

/// First line of every JF log.
pub const JF_MAGIC: &str = "JF 1";

#[derive(Debug, Default)]
struct Prolog {
    length: Option<u32>,
    crawford: bool,
    names: Option<(String, String)>,
}

struct Event<'a> {
    id: &'a str,
    seq: u64,
    player: &'a str,
    verb: &'a str,
    operands: &'a str,
}

fn split_event(line: &str, line_number: usize) -> Result<Event<'_>, MatchError> {
    let body = line
        .strip_suffix(';')
        .ok_or_else(|| MatchError::syntax(line_number, "missing ';'"))?;
    let mut parts = body.splitn(5, ':');
    let mut next = |what: &str| {
        parts
            .next()
            .ok_or_else(|| MatchError::syntax(line_number, format!("missing {}", what)))
    };
    let id = next("match id")?;
    let seq_text = next("sequence number")?;
    let player = next("player")?;
    let verb = next("verb")?;
    let operands = parts.next().unwrap_or("");
    let seq = seq_text
        .trim()
        .parse()
        .map_err(|_| MatchError::syntax(line_number, format!("bad sequence '{}'", seq_text)))?;
    Ok(Event {
        id,
        seq,
        player: player.trim(),
        verb: verb.trim(),
        operands: operands.trim(),
    })
}

fn pair<T: std::str::FromStr>(
    text: &str,
    separator: char,
    line_number: usize,
) -> Result<(T, T), MatchError> {
    let bad = || MatchError::syntax(line_number, format!("bad operands '{}'", text));
    let (a, b) = text.split_once(separator).ok_or_else(bad)?;
    Ok((
        a.trim().parse().map_err(|_| bad())?,
        b.trim().parse().map_err(|_| bad())?,
    ))
}

fn player_side(record: &Match, name: &str, line_number: usize) -> Result<Side, MatchError> {
    if name == record.white() {
        Ok(Side::White)
    } else if name == record.black() {
        Ok(Side::Black)
    } else {
        Err(MatchError::syntax(line_number, format!("unknown player '{}'", name)))
    }
}

fn parse_steps(side: Side, text: &str, line_number: usize) -> Result<Vec<Step>, MatchError> {
    text.split_whitespace()
        .map(|token| {
            let (from, to): (u8, u8) = pair(token, '-', line_number)?;
            if from > 25 || to > 25 {
                return Err(MatchError::syntax(line_number, format!("bad step '{}'", token)));
            }
            Ok(Step::new(side.to_absolute(from), side.to_absolute(to)))
        })
        .collect()
}

fn current_match(record: &mut Option<Match>, line_number: usize) -> Result<&mut Match, MatchError> {
    record
        .as_mut()
        .ok_or_else(|| MatchError::syntax(line_number, "event before the first score"))
}

/// Reads a JF log.
#[instrument(skip_all, fields(bytes = input.len()))]
pub fn read_jf(input: &[u8]) -> Result<Match, MatchError> {
    let text = String::from_utf8_lossy(input);
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    match lines.find(|(_, l)| !l.is_empty()) {
        Some((_, JF_MAGIC)) => {}
        Some((line_number, _)) => return Err(MatchError::syntax(line_number, "not a JF log")),
        None => return Err(MatchError::syntax(1, "empty input")),
    }

    let mut prolog = Prolog::default();
    let mut record: Option<Match> = None;
    let mut match_id: Option<String> = None;
    let mut last_seq = 0;

    for (line_number, line) in lines {
        if line.is_empty() {
            continue;
        }
        let event = split_event(line, line_number)?;
        match &match_id {
            None => match_id = Some(event.id.to_string()),
            Some(id) if id != event.id => {
                return Err(MatchError::syntax(
                    line_number,
                    format!("match id '{}' differs from '{}'", event.id, id),
                ));
            }
            Some(_) => {}
        }
        if event.seq <= last_seq {
            return Err(MatchError::syntax(line_number, "sequence numbers must increase"));
        }
        last_seq = event.seq;

        let at = |e: MatchError| e.at_line(line_number);
        match event.verb {
            "start of match" => {
                let mut words = event.operands.split_whitespace();
                let length = words
                    .next()
                    .and_then(|w| w.parse().ok())
                    .ok_or_else(|| MatchError::syntax(line_number, "bad match length"))?;
                prolog.length = Some(length);
                prolog.crawford = words.next() == Some("crawford");
            }
            "opponents" => {
                let (white, black) = event
                    .operands
                    .split_once(',')
                    .ok_or_else(|| MatchError::syntax(line_number, "bad opponents"))?;
                prolog.names = Some((white.trim().to_string(), black.trim().to_string()));
            }
            "score" => {
                let (white, black): (u32, u32) = pair(event.operands, ',', line_number)?;
                if record.is_none() {
                    let length = prolog
                        .length
                        .ok_or_else(|| {
                            MatchError::syntax(line_number, "score before start of match")
                        })?;
                    let (white_name, black_name) = prolog
                        .names
                        .take()
                        .ok_or_else(|| MatchError::syntax(line_number, "score before opponents"))?;
                    record = Some(Match::new(white_name, black_name, length, prolog.crawford));
                }
                let current = current_match(&mut record, line_number)?;
                if current.score() != [white, black] {
                    return Err(MatchError::illegal(format!(
                        "score {},{} does not match replayed {:?}",
                        white,
                        black,
                        current.score()
                    ))
                    .at_line(line_number));
                }
                current.append_game().map_err(at)?;
            }
            "win match" => {
                let current = current_match(&mut record, line_number)?;
                let side = player_side(current, event.player, line_number)?;
                let score = current.score();
                let won =
                    current.is_over() && score[side.index()] >= score[side.opponent().index()];
                if !won {
                    return Err(MatchError::illegal(format!("{} has not won the match", side))
                        .at_line(line_number));
                }
            }
            "win game" => {
                let current = current_match(&mut record, line_number)?;
                let side = player_side(current, event.player, line_number)?;
                let points: u32 = event
                    .operands
                    .parse()
                    .map_err(|_| MatchError::syntax(line_number, "bad points"))?;
                let end = current.current_game().and_then(|g| *g.end());
                match end {
                    Some(end) if *end.winner() == side && *end.points() == points => {}
                    _ => {
                        return Err(MatchError::illegal(format!(
                            "{} did not win {} points",
                            side, points
                        ))
                        .at_line(line_number));
                    }
                }
            }
            verb => {
                let current = current_match(&mut record, line_number)?;
                let side = player_side(current, event.player, line_number)?;
                let action = match verb {
                    "roll" => {
                        let mut dice = [0u8; 2];
                        let mut words = event.operands.split_whitespace();
                        for die in &mut dice {
                            *die = words
                                .next()
                                .and_then(|w| w.parse().ok())
                                .ok_or_else(|| MatchError::syntax(line_number, "bad dice"))?;
                        }
                        GameAction::Roll(dice)
                    }
                    "move" => GameAction::Move(parse_steps(side, event.operands, line_number)?),
                    "cube" => {
                        let value: u32 = event
                            .operands
                            .parse()
                            .map_err(|_| MatchError::syntax(line_number, "bad cube value"))?;
                        let cube = current.position().map(|p| p.cube()).unwrap_or(1);
                        if value != cube * 2 {
                            return Err(MatchError::illegal(format!(
                                "cube to {} from {}",
                                value, cube
                            ))
                            .at_line(line_number));
                        }
                        GameAction::Double
                    }
                    "take" => GameAction::Take,
                    "drop" => GameAction::Drop,
                    "accept" => GameAction::Accept,
                    "reject" => GameAction::Reject,
                    "resign" => {
                        let value: u32 = event
                            .operands
                            .parse()
                            .map_err(|_| MatchError::syntax(line_number, "bad resignation"))?;
                        if value == 0 {
                            return Err(MatchError::illegal("resignation of zero points")
                                .at_line(line_number));
                        }
                        if value > 3 {
                            warn!(value, "Resignation value clamped to backgammon");
                        }
                        GameAction::Resign(u8::try_from(value.min(3)).unwrap_or(3))
                    }
                    other => {
                        return Err(MatchError::syntax(
                            line_number,
                            format!("unknown verb '{}'", other),
                        ));
                    }
                };
                debug!(line_number, verb, %side, "Event");
                current.add_action(side, action, Some(0)).map_err(at)?;
            }
        }
    }

    let record = match record {
        Some(record) => record,
        None => {
            let length = prolog.length.unwrap_or(0);
            let (white, black) = prolog.names.unwrap_or_default();
            Match::new(white, black, length, prolog.crawford)
        }
    };
    info!(games = record.games().len(), "JF log read");
    Ok(record)
}
