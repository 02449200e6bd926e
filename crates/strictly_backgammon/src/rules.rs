//! Movement legality, the move generator and position transitions.
//!
//! A checker play is a sequence of single-die steps. Submitted steps may
//! span several dice (`24/18` with 4-2); they are expanded through open
//! intermediate points and the resulting board must be one the generator
//! produces for the same dice. The generator enforces the "use as many dice
//! as possible" and "larger die first" rules.

use crate::action::{EndCause, GameAction, GameEnd, Step};
use crate::contracts::{ActionContract, Contract};
use crate::error::MatchError;
use crate::position::Position;
use crate::side::Side;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// A complete legal checker play and the board it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalMove {
    /// Single-die steps in play order.
    pub steps: Vec<Step>,
    /// Position after the play; dice and turn are left untouched.
    pub result: Position,
}

/// Destination of moving one checker of `side` from `from` by `die` pips,
/// or `None` when that step cannot be played.
pub fn step_target(position: &Position, side: Side, from: u8, die: u8) -> Option<u8> {
    if !(1..=6).contains(&die) {
        return None;
    }
    let on_bar = position.bar()[side.index()] > 0;
    if from == side.bar_point() {
        if !on_bar {
            return None;
        }
    } else if on_bar || position.count_at(from, side) == 0 {
        return None;
    }

    let own_from = side.to_own(from);
    let own_to = i16::from(own_from) - i16::from(die);
    if own_to <= 0 {
        if !position.all_home(side) {
            return None;
        }
        let higher_occupied =
            (own_from + 1..=6).any(|own| position.count_at(side.to_absolute(own), side) > 0);
        if own_to < 0 && higher_occupied {
            return None;
        }
        return Some(side.off_point());
    }

    let to = side.to_absolute(u8::try_from(own_to).ok()?);
    if position.count_at(to, side.opponent()) >= 2 {
        return None;
    }
    Some(to)
}

/// Moves one checker, hitting a lone opposing checker on the target.
fn apply_step(position: &mut Position, side: Side, from: u8, to: u8) {
    if from == side.bar_point() {
        position.bar_mut()[side.index()] -= 1;
    } else {
        position.remove_checker(from, side);
    }
    if to == side.off_point() {
        return;
    }
    let opponent = side.opponent();
    if position.count_at(to, opponent) == 1 {
        debug!(point = to, "Hit");
        position.set_point(to, 0);
        position.bar_mut()[opponent.index()] += 1;
    }
    position.add_checker(to, side);
}

fn sources(position: &Position, side: Side) -> Vec<u8> {
    if position.bar()[side.index()] > 0 {
        vec![side.bar_point()]
    } else {
        (1..=24)
            .filter(|&p| position.count_at(p, side) > 0)
            .collect()
    }
}

fn dice_pool(dice: [u8; 2]) -> Vec<u8> {
    if dice[0] == dice[1] {
        vec![dice[0]; 4]
    } else {
        dice.to_vec()
    }
}

struct Candidate {
    steps: Vec<Step>,
    dice: Vec<u8>,
    result: Position,
}

fn explore(
    position: &Position,
    side: Side,
    remaining: &[u8],
    steps: &mut Vec<Step>,
    used: &mut Vec<u8>,
    found: &mut Vec<Candidate>,
) {
    let mut moved = false;
    if let Some((&die, rest)) = remaining.split_first() {
        for from in sources(position, side) {
            let Some(to) = step_target(position, side, from, die) else {
                continue;
            };
            moved = true;
            let mut next = position.clone();
            apply_step(&mut next, side, from, to);
            steps.push(Step::new(from, to));
            used.push(die);
            explore(&next, side, rest, steps, used, found);
            steps.pop();
            used.pop();
        }
    }
    if !moved {
        found.push(Candidate {
            steps: steps.clone(),
            dice: used.clone(),
            result: position.clone(),
        });
    }
}

/// Enumerates every distinct legal play of `dice` by `side`.
///
/// When no checker can move the single entry has no steps and an unchanged
/// board.
#[instrument(skip(position), fields(side = %side))]
pub fn legal_moves(position: &Position, side: Side, dice: [u8; 2]) -> Vec<LegalMove> {
    let orders = if dice[0] == dice[1] {
        vec![dice_pool(dice)]
    } else {
        vec![vec![dice[0], dice[1]], vec![dice[1], dice[0]]]
    };

    let mut found = Vec::new();
    for order in &orders {
        explore(position, side, order, &mut Vec::new(), &mut Vec::new(), &mut found);
    }

    let most = found.iter().map(|c| c.steps.len()).max().unwrap_or(0);
    found.retain(|c| c.steps.len() == most);
    if most == 1 && dice[0] != dice[1] {
        let larger = dice[0].max(dice[1]);
        if found.iter().any(|c| c.dice.first() == Some(&larger)) {
            found.retain(|c| c.dice.first() == Some(&larger));
        }
    }

    let mut seen = HashSet::new();
    let moves: Vec<LegalMove> = found
        .into_iter()
        .filter(|c| seen.insert(c.result.clone()))
        .map(|c| LegalMove {
            steps: c.steps,
            result: c.result,
        })
        .collect();
    debug!(count = moves.len(), "Generated legal moves");
    moves
}

fn expand(position: &Position, side: Side, dice: &[u8], steps: &[Step], out: &mut Vec<Position>) {
    let Some((step, rest)) = steps.split_first() else {
        out.push(position.clone());
        return;
    };
    if step.from == step.to {
        return;
    }
    let mut tried = Vec::new();
    for (i, &die) in dice.iter().enumerate() {
        if tried.contains(&die) {
            continue;
        }
        tried.push(die);
        let Some(dest) = step_target(position, side, step.from, die) else {
            continue;
        };
        let mut remaining = dice.to_vec();
        remaining.remove(i);
        let mut next = position.clone();
        apply_step(&mut next, side, step.from, dest);
        if dest == step.to {
            expand(&next, side, &remaining, rest, out);
        } else if side.to_own(dest) > side.to_own(step.to) {
            let mut tail = Vec::with_capacity(steps.len());
            tail.push(Step::new(dest, step.to));
            tail.extend_from_slice(rest);
            expand(&next, side, &remaining, &tail, out);
        }
    }
}

/// Plays `steps` with the dice showing in `position`.
///
/// Returns the position after the play with dice and turn untouched, or
/// `IllegalAction` when the steps do not form a legal complete move.
#[instrument(skip(position, steps), fields(side = %side, steps = steps.len()))]
pub fn play_move(position: &Position, side: Side, steps: &[Step]) -> Result<Position, MatchError> {
    let dice = position.dice();
    let mut finals = Vec::new();
    expand(position, side, &dice_pool(dice), steps, &mut finals);
    let legal = legal_moves(position, side, dice);
    finals
        .into_iter()
        .find(|played| legal.iter().any(|m| m.result == *played))
        .ok_or_else(|| {
            let text = steps
                .iter()
                .map(|s| format!("{}/{}", s.from, s.to))
                .collect::<Vec<_>>()
                .join(" ");
            MatchError::illegal(format!(
                "{} cannot play '{}' with {}-{}",
                side, text, dice[0], dice[1]
            ))
        })
}

/// Score multiplier for `winner` bearing off the last checker.
pub fn bear_off_multiplier(position: &Position, winner: Side) -> u32 {
    let loser = winner.opponent();
    if position.borne_off(loser) > 0 {
        return 1;
    }
    let in_winners_home =
        (1..=6).any(|own| position.count_at(winner.to_absolute(own), loser) > 0);
    if position.bar()[loser.index()] > 0 || in_winners_home {
        3
    } else {
        2
    }
}

fn finish(position: &mut Position, winner: Side, multiplier: u32, cause: EndCause) -> GameEnd {
    let points = position.cube() * multiplier;
    position.add_score(winner, points);
    position.set_dice([0, 0]);
    position.set_turn(None);
    GameEnd::new(winner, points, cause)
}

fn transition(
    position: &mut Position,
    side: Side,
    action: &GameAction,
) -> Result<Option<GameEnd>, MatchError> {
    let end = match action {
        GameAction::Roll(dice) => {
            position.set_dice(*dice);
            position.set_turn(Some(side));
            None
        }
        GameAction::Move(steps) => {
            let mut played = play_move(position, side, steps)?;
            played.set_dice([0, 0]);
            played.set_turn(Some(side.opponent()));
            *position = played;
            if position.checkers(side) == 0 {
                let multiplier = bear_off_multiplier(position, side);
                Some(finish(position, side, multiplier, EndCause::BearOff))
            } else {
                None
            }
        }
        GameAction::Double => {
            position.set_cube_turned(Some(side));
            None
        }
        GameAction::Take => {
            position.set_cube(position.cube() * 2);
            let mut rights = [false, false];
            rights[side.index()] = true;
            position.set_may_double(rights);
            position.set_cube_turned(None);
            None
        }
        GameAction::Drop => {
            position.set_cube_turned(None);
            Some(finish(position, side.opponent(), 1, EndCause::Drop))
        }
        GameAction::Resign(value) => {
            position.set_resigned(Some((side, *value)));
            None
        }
        GameAction::Accept => {
            let Some((_, value)) = position.resigned() else {
                return Err(MatchError::illegal("no resignation to accept"));
            };
            position.set_resigned(None);
            Some(finish(position, side, u32::from(value), EndCause::Resignation))
        }
        GameAction::Reject => {
            position.set_resigned(None);
            None
        }
    };
    Ok(end)
}

/// Applies an action by `side` to `position`.
///
/// On failure the position is left unchanged. Returns the game result when
/// the action ends the game; the score in `position` already includes it.
#[instrument(skip(position), fields(side = %side, verb = %action.verb()))]
pub fn apply(
    position: &mut Position,
    side: Side,
    action: &GameAction,
) -> Result<Option<GameEnd>, MatchError> {
    ActionContract::pre(position, &(side, action))?;
    let mut next = position.clone();
    let end = transition(&mut next, side, action)?;
    ActionContract::post(position, &next)?;
    *position = next;
    if let Some(end) = &end {
        debug!(winner = %end.winner(), points = end.points(), "Game ended");
    }
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rolled(side: Side, dice: [u8; 2]) -> Position {
        Position::starting(0).with_dice(Some(side), dice)
    }

    #[test]
    fn opening_moves_for_three_one() {
        let moves = legal_moves(&rolled(Side::White, [3, 1]), Side::White, [3, 1]);
        assert!(moves.iter().all(|m| m.steps.len() == 2));
        let point = rolled(Side::White, [3, 1]);
        let made = play_move(&point, Side::White, &[Step::new(8, 5), Step::new(6, 5)]).unwrap();
        assert_eq!(made.count_at(5, Side::White), 2);
        assert_eq!(made.count_at(8, Side::White), 2);
    }

    #[test]
    fn combined_step_expands_through_open_point() {
        let position = rolled(Side::White, [6, 4]);
        let played = play_move(&position, Side::White, &[Step::new(24, 14)]).unwrap();
        assert_eq!(played.count_at(14, Side::White), 1);
        assert_eq!(played.count_at(24, Side::White), 1);
    }

    #[test]
    fn blocked_point_is_rejected() {
        // Black holds point 19 with five checkers.
        let position = rolled(Side::White, [5, 2]);
        let err = play_move(&position, Side::White, &[Step::new(24, 19), Step::new(19, 17)]);
        assert!(err.is_err());
    }

    #[test]
    fn bar_checker_enters_first() {
        let mut points = crate::position::STARTING_POINTS;
        points[23] = 1;
        let position = Position::starting(0)
            .with_board(points, [1, 0])
            .with_dice(Some(Side::White), [3, 1]);
        assert!(play_move(&position, Side::White, &[Step::new(8, 5), Step::new(6, 5)]).is_err());
        let entered =
            play_move(&position, Side::White, &[Step::new(25, 22), Step::new(6, 5)]).unwrap();
        assert_eq!(entered.bar(), [0, 0]);
    }

    #[test]
    fn hit_sends_checker_to_bar() {
        let mut points = [0i8; 24];
        points[23] = 2;
        points[20] = -1;
        points[0] = -14;
        let position = Position::starting(0)
            .with_board(points, [0, 0])
            .with_dice(Some(Side::White), [3, 1]);
        let played =
            play_move(&position, Side::White, &[Step::new(24, 21), Step::new(24, 23)]).unwrap();
        assert_eq!(played.bar(), [0, 1]);
        assert_eq!(played.count_at(21, Side::White), 1);
    }

    #[test]
    fn oversized_die_bears_off_from_highest_point_only() {
        let mut points = [0i8; 24];
        points[3] = 1;
        points[1] = 1;
        points[23] = -15;
        let position = Position::starting(0)
            .with_board(points, [0, 0])
            .with_dice(Some(Side::White), [6, 5]);
        assert_eq!(step_target(&position, Side::White, 2, 6), None);
        assert_eq!(step_target(&position, Side::White, 4, 6), Some(0));
    }

    #[test]
    fn larger_die_must_be_played() {
        // The lone White checker on 20 can play the 6 or the 2 but not both.
        let mut points = [0i8; 24];
        points[19] = 1;
        points[11] = -2;
        points[23] = -13;
        let position = Position::starting(0)
            .with_board(points, [0, 0])
            .with_dice(Some(Side::White), [6, 2]);
        let moves = legal_moves(&position, Side::White, [6, 2]);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].steps, vec![Step::new(20, 14)]);
    }

    #[test]
    fn bear_off_scores_gammon() {
        let mut points = [0i8; 24];
        points[0] = 1;
        points[12] = -15;
        let mut position = Position::starting(0)
            .with_board(points, [0, 0])
            .with_dice(Some(Side::White), [2, 1])
            .with_cube(2, [true, true]);
        let end = apply(&mut position, Side::White, &GameAction::Move(vec![Step::new(1, 0)]))
            .unwrap()
            .unwrap();
        assert_eq!(*end.winner(), Side::White);
        assert_eq!(*end.points(), 4);
        assert_eq!(position.score(), [4, 0]);
        assert_eq!(position.turn(), None);
    }

    #[test]
    fn drop_awards_cube_to_doubler() {
        let mut position = Position::starting(0).with_dice(Some(Side::White), [0, 0]);
        apply(&mut position, Side::White, &GameAction::Double).unwrap();
        apply(&mut position, Side::Black, &GameAction::Take).unwrap();
        assert_eq!(position.cube(), 2);
        assert_eq!(position.may_double(), [false, true]);
        apply(&mut position, Side::White, &GameAction::Roll([4, 2])).unwrap();
        apply(&mut position, Side::White, &GameAction::Move(vec![Step::new(8, 4), Step::new(6, 4)]))
            .unwrap();
        apply(&mut position, Side::Black, &GameAction::Double).unwrap();
        let end = apply(&mut position, Side::White, &GameAction::Drop).unwrap().unwrap();
        assert_eq!(*end.winner(), Side::Black);
        assert_eq!(*end.points(), 2);
    }

    #[test]
    fn illegal_action_leaves_position_unchanged() {
        let mut position = rolled(Side::White, [6, 5]);
        let before = position.clone();
        let bad_move = GameAction::Move(vec![Step::new(6, 1)]);
        assert!(apply(&mut position, Side::White, &bad_move).is_err());
        assert_eq!(position, before);
    }
}
