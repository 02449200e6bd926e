//! Tests for movement legality and action contracts.

use strictly_backgammon::{
    ActionContract, CHECKERS, Contract, GameAction, MatchErrorKind, Position, Side, Step, apply,
    legal_moves, play_move,
};

#[test]
fn test_every_opening_roll_uses_all_dice() {
    let start = Position::starting(0);
    for high in 1..=6u8 {
        for low in 1..=high {
            let moves = legal_moves(&start, Side::White, [high, low]);
            assert!(!moves.is_empty(), "no play for {}{}", high, low);
            let expected = if high == low { 4 } else { 2 };
            for play in &moves {
                assert_eq!(play.steps.len(), expected, "{}{}: {:?}", high, low, play.steps);
                assert_eq!(play.result.checkers(Side::White), CHECKERS);
                assert_eq!(play.result.checkers(Side::Black), CHECKERS);
            }
        }
    }
}

#[test]
fn test_results_are_distinct() {
    let start = Position::starting(0);
    let moves = legal_moves(&start, Side::Black, [5, 2]);
    for (i, a) in moves.iter().enumerate() {
        for b in &moves[i + 1..] {
            assert!(!a.result.same_board(&b.result));
        }
    }
}

#[test]
fn test_move_onto_made_point_is_rejected() {
    let start = Position::starting(0).with_dice(Some(Side::White), [5, 1]);
    // 6/1 lands on Black's anchor.
    let err = play_move(&start, Side::White, &[Step::new(6, 1), Step::new(24, 23)])
        .expect_err("blocked");
    assert_eq!(err.kind(), MatchErrorKind::IllegalAction);
}

#[test]
fn test_double_after_rolling_violates_contract() {
    let rolled = Position::starting(0).with_dice(Some(Side::White), [4, 2]);
    let action = GameAction::Double;
    assert!(ActionContract::pre(&rolled, &(Side::White, &action)).is_err());

    let mut position = rolled.clone();
    assert!(apply(&mut position, Side::White, &action).is_err());
    assert_eq!(position, rolled);
}

#[test]
fn test_take_requires_pending_double() {
    let position = Position::starting(0).with_dice(Some(Side::Black), [0, 0]);
    let mut after_double = position.clone();
    apply(&mut after_double, Side::Black, &GameAction::Double).expect("double");
    assert_eq!(after_double.cube_turned(), Some(Side::Black));

    let mut bad = position.clone();
    assert!(apply(&mut bad, Side::White, &GameAction::Take).is_err());

    let mut taken = after_double.clone();
    assert_eq!(apply(&mut taken, Side::White, &GameAction::Take).expect("take"), None);
    assert_eq!(taken.cube(), 2);
    assert_eq!(taken.may_double(), [true, false]);
}
