//! Tests for the background import worker.

use std::sync::Arc;
use strictly_backgammon::{
    CancelFlag, GameAction, ImportJob, ImportMessage, ImportQueue, Match, MatchFormat, Rank,
    Side, read_md_file, run_import, spawn_importer, to_md_string,
};
use tempfile::TempDir;

fn ranked_match() -> Match {
    let mut record =
        Match::new("alice", "bob", 3, true).with_rank(Side::White, Rank::new(1500.0, 10));
    record.append_game().expect("game");
    record
        .add_action(Side::Black, GameAction::Roll([5, 5]), Some(7))
        .expect("roll");
    record
}

#[test]
fn test_worker_reports_matches_in_order() {
    let dir = TempDir::new().expect("temp dir");
    let input = dir.path().join("one.md");
    let record = ranked_match();
    std::fs::write(&input, to_md_string(&record).expect("render")).expect("write input");
    let broken = dir.path().join("two.md");
    std::fs::write(&broken, "not a match\n").expect("write broken");
    let output = dir.path().join("out");

    let job = ImportJob::new(
        "club".to_string(),
        vec![input.clone(), broken],
        MatchFormat::Md,
        Some(output.clone()),
    );
    let queue = Arc::new(ImportQueue::new());
    let handle = spawn_importer(job, Arc::clone(&queue), CancelFlag::new());
    let imported = handle
        .join()
        .expect("worker thread")
        .expect("import result");
    assert_eq!(imported, 1);

    let messages = queue.drain();
    assert_eq!(messages[0], ImportMessage::Group("club".to_string()));
    assert!(matches!(messages[1], ImportMessage::StatusUpdate(_)));
    assert_eq!(
        messages[2],
        ImportMessage::Relation {
            white: "alice".to_string(),
            black: "bob".to_string(),
        }
    );
    assert_eq!(
        messages[3],
        ImportMessage::Rank {
            side: Side::White,
            name: "alice".to_string(),
            rank: Rank::new(1500.0, 10),
        }
    );
    assert_eq!(messages[4], ImportMessage::Match(Box::new(record.clone())));
    let saved = output.join("one.md");
    assert_eq!(messages[5], ImportMessage::SavedMatch(saved.clone()));
    assert_eq!(read_md_file(&saved).expect("saved match"), record);

    let failures = messages[6..]
        .iter()
        .filter(|m| matches!(m, ImportMessage::StatusUpdate(text) if text.contains("two.md")))
        .count();
    assert_eq!(failures, 2);
}

#[test]
fn test_cancelled_worker_stops() {
    let dir = TempDir::new().expect("temp dir");
    let job = ImportJob::new(
        "none".to_string(),
        vec![dir.path().join("missing.md")],
        MatchFormat::Md,
        None,
    );
    let queue = Arc::new(ImportQueue::new());
    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = spawn_importer(job, Arc::clone(&queue), cancel)
        .join()
        .expect("worker thread");
    assert!(result.is_err());
    assert_eq!(queue.pop(), Some(ImportMessage::Group("none".to_string())));
    assert_eq!(queue.pop(), None);
}

#[test]
fn test_import_without_output_dir_reports_match_only() {
    let dir = TempDir::new().expect("temp dir");
    let input = dir.path().join("one.md");
    let record = ranked_match();
    std::fs::write(&input, to_md_string(&record).expect("render")).expect("write input");

    let job = ImportJob::new("club".to_string(), vec![input], MatchFormat::Md, None);
    let queue = ImportQueue::new();
    let imported = run_import(&job, &queue, &CancelFlag::new()).expect("import result");
    assert_eq!(imported, 1);

    let messages = queue.drain();
    assert_eq!(
        messages.last(),
        Some(&ImportMessage::Match(Box::new(record)))
    );
    assert!(
        !messages
            .iter()
            .any(|m| matches!(m, ImportMessage::SavedMatch(_)))
    );
}
