//! Reader for tabular JFibs transcripts.
//!
//! ```text
//!  3 point match
//!
//!  Game 1
//!  alice : 0                             bob : 0
//!   1)                                   31: 8/5 6/5
//!   2) 64: 24/18 13/9                    Doubles => 2
//!   3)  Drops                            Wins 1 point
//! ```
//!
//! The left column is White and the right column Black. The column split is
//! taken from where the right player's name starts on the score line.

use crate::action::{GameAction, Step};
use crate::error::MatchError;
use crate::game::Match;
use crate::side::Side;
use tracing::{debug, info, instrument};

fn parse_point(side: Side, text: &str, line_number: usize) -> Result<u8, MatchError> {
    let own = match text {
        "bar" => 25,
        "off" => 0,
        _ => text
            .parse::<u8>()
            .ok()
            .filter(|p| (1..=24).contains(p))
            .ok_or_else(|| MatchError::syntax(line_number, format!("bad point '{}'", text)))?,
    };
    Ok(side.to_absolute(own))
}

/// Expands one notation token such as `24/18*`, `13/9(2)` or `24/18/13`.
fn parse_step_token(side: Side, token: &str, line_number: usize) -> Result<Vec<Step>, MatchError> {
    let (body, repeat) = match token.strip_suffix(')').and_then(|t| t.rsplit_once('(')) {
        Some((body, count)) => {
            let count: usize = count.parse().map_err(|_| {
                MatchError::syntax(line_number, format!("bad repeat in '{}'", token))
            })?;
            (body, count)
        }
        None => (token, 1),
    };
    let points = body
        .split('/')
        .map(|p| parse_point(side, p.trim_end_matches('*'), line_number))
        .collect::<Result<Vec<_>, _>>()?;
    if points.len() < 2 {
        return Err(MatchError::syntax(line_number, format!("bad step '{}'", token)));
    }
    let chain: Vec<Step> = points.windows(2).map(|w| Step::new(w[0], w[1])).collect();
    Ok(chain.iter().copied().cycle().take(chain.len() * repeat).collect())
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Play { dice: [u8; 2], steps: Vec<Step> },
    Doubles(u32),
    Takes,
    Drops,
    Wins(u32),
}

fn parse_cell(side: Side, text: &str, line_number: usize) -> Result<Option<Cell>, MatchError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let bad = || MatchError::syntax(line_number, format!("unrecognized entry '{}'", text));
    let words: Vec<&str> = text.split_whitespace().collect();
    let cell = match words.as_slice() {
        ["Doubles", "=>", value] => Cell::Doubles(value.parse().map_err(|_| bad())?),
        ["Takes"] => Cell::Takes,
        ["Drops"] | ["Passes"] => Cell::Drops,
        ["Wins", points, "point" | "points", ..] => Cell::Wins(points.parse().map_err(|_| bad())?),
        [roll, rest @ ..] if roll.len() == 3 && roll.ends_with(':') => {
            let mut dice = [0u8; 2];
            for (die, c) in dice.iter_mut().zip(roll.chars()) {
                *die = c
                    .to_digit(10)
                    .and_then(|d| u8::try_from(d).ok())
                    .filter(|d| (1..=6).contains(d))
                    .ok_or_else(bad)?;
            }
            let mut steps = Vec::new();
            for token in rest {
                steps.extend(parse_step_token(side, token, line_number)?);
            }
            Cell::Play { dice, steps }
        }
        _ => return Err(bad()),
    };
    Ok(Some(cell))
}

/// Name, score and the byte offset where the right player's name starts.
fn parse_score_line(line: &str) -> Option<(String, u32, String, u32, usize)> {
    let (left_name, rest) = line.split_once(" : ")?;
    let offset = line.len() - rest.len();
    let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let left_score = rest[..digits].parse().ok()?;
    let after = &rest[digits..];
    let right_start = after.find(|c: char| !c.is_whitespace())?;
    let split = offset + digits + right_start;
    let (right_name, right_score) = line[split..].split_once(" : ")?;
    Some((
        left_name.trim().to_string(),
        left_score,
        right_name.trim().to_string(),
        right_score.trim().parse().ok()?,
        split,
    ))
}

/// Removes a leading `N)` label, keeping column offsets.
fn strip_label(line: &str) -> String {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    let digits = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(0);
    if digits > 0 && trimmed[digits..].starts_with(')') {
        format!("{}{}", " ".repeat(indent + digits + 1), &trimmed[digits + 1..])
    } else {
        line.to_string()
    }
}

fn split_columns(line: &str, split: usize) -> (&str, &str) {
    let mut at = split.min(line.len());
    while !line.is_char_boundary(at) {
        at -= 1;
    }
    line.split_at(at)
}

fn apply_cell(
    record: &mut Match,
    side: Side,
    cell: Cell,
    line_number: usize,
) -> Result<(), MatchError> {
    let at = |e: MatchError| e.at_line(line_number);
    debug!(line_number, %side, ?cell, "Entry");
    match cell {
        Cell::Play { dice, steps } => {
            record
                .add_action(side, GameAction::Roll(dice), Some(0))
                .map_err(at)?;
            record
                .add_action(side, GameAction::Move(steps), Some(0))
                .map_err(at)?;
        }
        Cell::Doubles(value) => {
            let cube = record.position().map(|p| p.cube()).unwrap_or(1);
            if value != cube * 2 {
                return Err(
                    MatchError::illegal(format!("cube to {} from {}", value, cube))
                        .at_line(line_number),
                );
            }
            record.add_action(side, GameAction::Double, Some(0)).map_err(at)?;
        }
        Cell::Takes => {
            record.add_action(side, GameAction::Take, Some(0)).map_err(at)?;
        }
        Cell::Drops => {
            record.add_action(side, GameAction::Drop, Some(0)).map_err(at)?;
        }
        Cell::Wins(points) => {
            let end = record.current_game().and_then(|g| *g.end());
            match end {
                Some(end) if *end.winner() == side && *end.points() == points => {}
                Some(_) => {
                    return Err(MatchError::illegal(format!(
                        "{} did not win {} points",
                        side, points
                    ))
                    .at_line(line_number));
                }
                None => {
                    // Unrecorded resignation.
                    let cube = record.position().map(|p| p.cube()).unwrap_or(1);
                    let value = points / cube;
                    if points % cube != 0 || !(1..=3).contains(&value) {
                        return Err(MatchError::illegal(format!(
                            "{} points cannot end a game with cube {}",
                            points, cube
                        ))
                        .at_line(line_number));
                    }
                    let resign = GameAction::Resign(u8::try_from(value).unwrap_or(3));
                    record.add_action(side.opponent(), resign, Some(0)).map_err(at)?;
                    record.add_action(side, GameAction::Accept, Some(0)).map_err(at)?;
                }
            }
        }
    }
    Ok(())
}

/// Reads a JFibs transcript.
///
/// Matches of a given length are read with the Crawford rule on.
#[instrument(skip_all, fields(bytes = input.len()))]
pub fn read_jfibs(input: &[u8]) -> Result<Match, MatchError> {
    let text = String::from_utf8_lossy(input);
    let mut length: Option<u32> = None;
    let mut record: Option<Match> = None;
    let mut split: Option<usize> = None;
    let mut pending_game: Option<usize> = None;

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let words: Vec<&str> = trimmed.split_whitespace().collect();

        if let [n, "point", "match"] = words.as_slice() {
            length = Some(
                n.parse()
                    .map_err(|_| MatchError::syntax(line_number, "bad match length"))?,
            );
            continue;
        }
        if let ["Game", k] = words.as_slice() {
            pending_game = Some(
                k.parse()
                    .map_err(|_| MatchError::syntax(line_number, "bad game number"))?,
            );
            continue;
        }
        if let Some(game_number) = pending_game.take() {
            let (white, white_score, black, black_score, column) = parse_score_line(line)
                .ok_or_else(|| MatchError::syntax(line_number, "expected score line"))?;
            let current = record.get_or_insert_with(|| {
                let length = length.unwrap_or(0);
                Match::new(white.clone(), black.clone(), length, length > 0)
            });
            if current.white() != &white || current.black() != &black {
                return Err(MatchError::syntax(line_number, "players changed between games"));
            }
            if current.score() != [white_score, black_score] {
                return Err(MatchError::illegal(format!(
                    "game {} starts at {}-{} but replay gives {:?}",
                    game_number,
                    white_score,
                    black_score,
                    current.score()
                ))
                .at_line(line_number));
            }
            current.append_game().map_err(|e| e.at_line(line_number))?;
            split = Some(column);
            continue;
        }

        let (Some(current), Some(column)) = (record.as_mut(), split) else {
            // Text before the first game.
            continue;
        };
        let body = strip_label(line);
        let (left, right) = split_columns(&body, column);
        if let Some(cell) = parse_cell(Side::White, left, line_number)? {
            apply_cell(current, Side::White, cell, line_number)?;
        }
        if let Some(cell) = parse_cell(Side::Black, right, line_number)? {
            apply_cell(current, Side::Black, cell, line_number)?;
        }
    }

    let record = record.unwrap_or_else(|| Match::new("", "", length.unwrap_or(0), false));
    info!(games = record.games().len(), "JFibs transcript read");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_tokens_expand() {
        assert_eq!(
            parse_step_token(Side::White, "13/9(2)", 1).unwrap(),
            vec![Step::new(13, 9), Step::new(13, 9)]
        );
        assert_eq!(
            parse_step_token(Side::White, "24/18*/13", 1).unwrap(),
            vec![Step::new(24, 18), Step::new(18, 13)]
        );
        assert_eq!(
            parse_step_token(Side::Black, "bar/22", 1).unwrap(),
            vec![Step::new(0, 3)]
        );
    }

    #[test]
    fn score_line_split() {
        let line = " alice : 0                     bob : 2";
        let (white, ws, black, bs, split) = parse_score_line(line).unwrap();
        assert_eq!((white.as_str(), ws, black.as_str(), bs), ("alice", 0, "bob", 2));
        assert_eq!(&line[split..split + 3], "bob");
    }

    #[test]
    fn cells() {
        assert_eq!(parse_cell(Side::White, "Doubles => 2", 1).unwrap(), Some(Cell::Doubles(2)));
        assert_eq!(parse_cell(Side::White, " Passes ", 1).unwrap(), Some(Cell::Drops));
        assert_eq!(parse_cell(Side::Black, "Wins 1 point", 1).unwrap(), Some(Cell::Wins(1)));
        assert_eq!(
            parse_cell(Side::White, "31: 8/5 6/5", 1).unwrap(),
            Some(Cell::Play {
                dice: [3, 1],
                steps: vec![Step::new(8, 5), Step::new(6, 5)]
            })
        );
        assert_eq!(parse_cell(Side::White, "", 1).unwrap(), None);
        assert!(parse_cell(Side::White, "Sings loudly", 1).is_err());
    }
}
