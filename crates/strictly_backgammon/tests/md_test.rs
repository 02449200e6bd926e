//! Tests for match dump reading and writing.

use strictly_backgammon::{
    GameAction, Match, MatchErrorKind, MdWriter, Position, Rank, Side, Step, legal_moves,
    read_md, read_md_file, to_md_string,
};
use tempfile::TempDir;

fn opening_match() -> Match {
    let mut record = Match::new("alice \"the hammer\"", "bob", 5, true)
        .with_rank(Side::White, Rank::new(1650.5, 312))
        .with_location("club night");
    record.append_game().expect("game");
    record
        .add_action(Side::White, GameAction::Roll([3, 1]), Some(10))
        .expect("roll");
    record
        .add_action(
            Side::White,
            GameAction::Move(vec![Step::new(8, 5), Step::new(6, 5)]),
            Some(11),
        )
        .expect("move");
    record
        .add_action(Side::Black, GameAction::Double, Some(12))
        .expect("double");
    record
        .add_action(Side::White, GameAction::Drop, Some(13))
        .expect("drop");
    record
}

#[test]
fn test_match_round_trips_through_text() {
    let record = opening_match();
    let text = to_md_string(&record).expect("write");
    assert!(text.starts_with("MatchDump 1\n"));
    assert!(text.contains("Player White \"alice \\\"the hammer\\\"\""));
    assert!(text.contains("White 11 move 8/5 6/5"));

    let reread = read_md(text.as_bytes()).expect("read");
    assert_eq!(reread, record);
    assert_eq!(reread.score(), [0, 1]);
    assert_eq!(to_md_string(&reread).expect("rewrite"), text);
}

#[test]
fn test_second_game_uses_bare_game_line() {
    let mut record = opening_match();
    record.append_game().expect("second game");
    let text = to_md_string(&record).expect("write");
    assert_eq!(text.lines().filter(|l| *l == "Game").count(), 2);
    assert_eq!(read_md(text.as_bytes()).expect("read"), record);
}

#[test]
fn test_explicit_initial_position_is_kept() {
    let mut record = Match::new("alice", "bob", 0, false);
    let mut points = [0i8; 24];
    points[0] = 2;
    points[23] = -2;
    let initial = Position::starting(0)
        .with_board(points, [0, 0])
        .with_score(3, 4);
    record.append_game_with(initial.clone()).expect("game");
    let text = to_md_string(&record).expect("write");
    assert!(text.contains("Game Position 2 0"));
    let reread = read_md(text.as_bytes()).expect("read");
    assert_eq!(reread.games()[0].initial(), &initial);
}

#[test]
fn test_illegal_action_reports_line() {
    let text = "MatchDump 1\nPlayer White \"a\"\nPlayer Black \"b\"\nLength 0\n\
                Game\nWhite 0 move 24/20\n";
    let err = read_md(text.as_bytes()).expect_err("move without dice");
    assert_eq!(err.line_number, Some(6));
}

#[test]
fn test_invalid_initial_position_is_rejected() {
    let mut points = vec!["0"; 24];
    points[0] = "16";
    let text = format!(
        "MatchDump 1\nPlayer White \"a\"\nPlayer Black \"b\"\nLength 0\n\
         Game Position {} Bar 200 0 Dice 0 0 Cube 3 MayDouble 1 1 Score 0 0 Turn None\n",
        points.join(" ")
    );
    let err = read_md(text.as_bytes()).expect_err("sixteen checkers and cube 3");
    assert_eq!(err.kind(), MatchErrorKind::IllegalAction);
    assert_eq!(err.line_number, Some(5));
}

#[test]
fn test_append_game_with_rejects_odd_cube() {
    let mut record = Match::new("alice", "bob", 0, false);
    let initial = Position::starting(0).with_cube(3, [true, true]);
    let err = record.append_game_with(initial).expect_err("cube 3");
    assert_eq!(err.kind(), MatchErrorKind::IllegalAction);
    assert!(record.games().is_empty());
}

#[test]
fn test_bad_magic_is_syntax_error() {
    let err = read_md(b"NotADump 1\n").expect_err("bad magic");
    assert_eq!(err.kind(), MatchErrorKind::Syntax);
}

#[test]
fn test_writer_appends_new_actions() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("live.md");

    let mut record = Match::new("alice", "bob", 3, true);
    record.append_game().expect("game");
    let mut writer = MdWriter::create(&path, &record).expect("create");

    record
        .add_action(Side::Black, GameAction::Roll([6, 4]), Some(1))
        .expect("roll");
    let position = record.position().expect("position").clone();
    let play = legal_moves(&position, Side::Black, [6, 4])
        .into_iter()
        .next()
        .expect("a legal play");
    record
        .add_action(Side::Black, GameAction::Move(play.steps), Some(2))
        .expect("move");
    assert_eq!(writer.sync(&record).expect("sync"), 2);
    assert_eq!(writer.sync(&record).expect("sync again"), 0);
    writer.close().expect("close");

    assert_eq!(read_md_file(&path).expect("reread"), record);

    let mut writer = MdWriter::open_append(&path, &record).expect("reopen");
    record
        .add_action(Side::White, GameAction::Roll([2, 2]), Some(3))
        .expect("roll");
    assert_eq!(writer.sync(&record).expect("sync"), 1);
    writer.close().expect("close");
    assert_eq!(read_md_file(&path).expect("reread"), record);
}
