//! Tests for the JF and JFibs readers.

use strictly_backgammon::{
    EndCause, GameAction, MatchErrorKind, MatchFormat, Side, read_jf, read_jfibs, read_match,
};

const JF_LOG: &str = "JF 1
m1:1:-:start of match:3 crawford;
m1:2:-:opponents:alice,bob;
m1:3:-:score:0,0;
m1:4:alice:roll:3 1;
m1:5:alice:move:8-5 6-5;
m1:6:bob:cube:2;
m1:7:alice:drop;
m1:8:bob:win game:1;
m1:9:-:score:0,1;
m1:10:bob:roll:6 4;
m1:11:bob:resign:2;
m1:12:alice:accept;
m1:13:alice:win game:2;
";

#[test]
fn test_jf_log_replays_two_games() {
    let record = read_jf(JF_LOG.as_bytes()).expect("read");
    assert_eq!(record.white(), "alice");
    assert_eq!(record.black(), "bob");
    assert_eq!(*record.length(), 3);
    assert!(*record.crawford());
    assert_eq!(record.games().len(), 2);
    assert_eq!(record.score(), [2, 1]);

    let first = record.games()[0].end().as_ref().expect("first game ended");
    assert_eq!(*first.winner(), Side::Black);
    assert_eq!(*first.cause(), EndCause::Drop);
    let second = record.games()[1].end().as_ref().expect("second game ended");
    assert_eq!(*second.cause(), EndCause::Resignation);
    assert_eq!(*second.points(), 2);
}

#[test]
fn test_jf_sequence_must_increase() {
    let log = "JF 1\nm:2:-:start of match:1;\nm:2:-:opponents:a,b;\n";
    let err = read_jf(log.as_bytes()).expect_err("repeated sequence number");
    assert_eq!(err.kind(), MatchErrorKind::Syntax);
    assert_eq!(err.line_number, Some(3));
}

#[test]
fn test_jf_wrong_claim_is_illegal() {
    let log = JF_LOG.replace("m1:8:bob:win game:1;", "m1:8:bob:win game:2;");
    let err = read_jf(log.as_bytes()).expect_err("claimed too many points");
    assert_eq!(err.kind(), MatchErrorKind::IllegalAction);
    assert_eq!(err.line_number, Some(9));
}

#[test]
fn test_jf_zero_resignation_is_illegal() {
    let log = JF_LOG.replace("resign:2;", "resign:0;");
    let err = read_jf(log.as_bytes()).expect_err("zero resignation");
    assert_eq!(err.kind(), MatchErrorKind::IllegalAction);
}

const JFIBS: &str = " 3 point match

 Game 1
 alice : 0                             bob : 0
  1)                                   31: 8/5 6/5
  2) 64: 24/18 13/9                    Doubles => 2
  3)  Drops                            Wins 1 point

 Game 2
 alice : 0                             bob : 1
  1) 52: 13/8 13/11                    Doubles => 2
  2)  Takes                            Wins 2 points
";

#[test]
fn test_jfibs_transcript_replays() {
    let record = read_match(JFIBS.as_bytes(), MatchFormat::JFibs).expect("read");
    assert_eq!(record.white(), "alice");
    assert_eq!(*record.length(), 3);
    assert_eq!(record.games().len(), 2);
    assert_eq!(record.score(), [0, 3]);
    assert!(record.is_over());

    let first = record.games()[0].actions();
    assert_eq!(*first[0].side(), Side::Black);
    assert_eq!(*first[0].action(), GameAction::Roll([3, 1]));
    assert_eq!(
        record.games()[1].end().as_ref().expect("ended").cause(),
        &EndCause::Resignation
    );
}

#[test]
fn test_jfibs_score_mismatch_is_illegal() {
    let text = JFIBS.replace(
        "alice : 0                             bob : 1",
        "alice : 0                             bob : 0",
    );
    let err = read_jfibs(text.as_bytes()).expect_err("score mismatch");
    assert_eq!(err.kind(), MatchErrorKind::IllegalAction);
}
