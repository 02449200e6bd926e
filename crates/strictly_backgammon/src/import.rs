//! Background bulk import.
//!
//! A worker thread reads match files and hands results to the caller through
//! an [`ImportQueue`]. The caller polls the queue from its own thread; the
//! worker never calls back into caller code. Cancellation is polled between
//! files.

use crate::error::{MatchError, MatchErrorKind};
use crate::format::{MatchFormat, read_match};
use crate::game::{Match, Rank};
use crate::md::write_md;
use crate::side::Side;
use derive_getters::Getters;
use derive_new::new;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Message from an import worker.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportMessage {
    /// Name of the group the following matches belong to.
    Group(String),
    /// Two players met.
    Relation {
        /// White player.
        white: String,
        /// Black player.
        black: String,
    },
    /// Rank of a player as recorded in a match.
    Rank {
        /// Side the player had.
        side: Side,
        /// Player name.
        name: String,
        /// Recorded rank.
        rank: Rank,
    },
    /// An imported match.
    Match(Box<Match>),
    /// A match was written to this file.
    SavedMatch(PathBuf),
    /// Progress text.
    StatusUpdate(String),
}

/// First-in first-out queue shared between a worker and the caller.
#[derive(Debug, Default)]
pub struct ImportQueue {
    messages: Mutex<VecDeque<ImportMessage>>,
}

impl ImportQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn push(&self, message: ImportMessage) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(message);
    }

    /// Takes the oldest message.
    pub fn pop(&self) -> Option<ImportMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Takes every queued message in order.
    pub fn drain(&self) -> Vec<ImportMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

/// Cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a flag that is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A batch of files to import.
#[derive(Debug, Clone, Getters, new)]
pub struct ImportJob {
    /// Group name announced before the matches.
    name: String,
    /// Files to read.
    files: Vec<PathBuf>,
    /// Format of every file.
    format: MatchFormat,
    /// Directory receiving a match dump per imported file.
    output_dir: Option<PathBuf>,
}

fn import_file(
    job: &ImportJob,
    path: &Path,
    queue: &ImportQueue,
) -> Result<(), MatchError> {
    let bytes = std::fs::read(path)?;
    let record = read_match(&bytes, *job.format())?;

    queue.push(ImportMessage::Relation {
        white: record.white().clone(),
        black: record.black().clone(),
    });
    for side in [Side::White, Side::Black] {
        if let Some(rank) = record.rank(side) {
            queue.push(ImportMessage::Rank {
                side,
                name: record.player(side).to_string(),
                rank,
            });
        }
    }

    let saved = match job.output_dir() {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("match");
            let target = dir.join(format!("{}.md", stem));
            let mut buffer = Vec::new();
            write_md(&record, &mut buffer)?;
            std::fs::write(&target, buffer)?;
            debug!(target = %target.display(), "Match saved");
            Some(target)
        }
        None => None,
    };
    queue.push(ImportMessage::Match(Box::new(record)));
    if let Some(target) = saved {
        queue.push(ImportMessage::SavedMatch(target));
    }
    Ok(())
}

/// Runs a job on the current thread and returns the number of matches
/// imported.
///
/// A file that fails to import is reported as a status update and skipped.
#[instrument(skip_all, fields(job = %job.name(), files = job.files().len()))]
pub fn run_import(
    job: &ImportJob,
    queue: &ImportQueue,
    cancel: &CancelFlag,
) -> Result<usize, MatchError> {
    queue.push(ImportMessage::Group(job.name().clone()));
    let total = job.files().len();
    let mut imported = 0;
    for (index, path) in job.files().iter().enumerate() {
        if cancel.is_cancelled() {
            info!(imported, "Import cancelled");
            return Err(MatchError::new(
                MatchErrorKind::Cancelled,
                format!("import cancelled after {} of {} files", index, total),
            ));
        }
        queue.push(ImportMessage::StatusUpdate(format!(
            "{} ({}/{})",
            path.display(),
            index + 1,
            total
        )));
        match import_file(job, path, queue) {
            Ok(()) => imported += 1,
            Err(err) => {
                warn!(path = %path.display(), %err, "Import failed");
                queue.push(ImportMessage::StatusUpdate(format!(
                    "{}: {}",
                    path.display(),
                    err
                )));
            }
        }
    }
    info!(imported, "Import finished");
    Ok(imported)
}

/// Runs a job on a worker thread.
pub fn spawn_importer(
    job: ImportJob,
    queue: Arc<ImportQueue>,
    cancel: CancelFlag,
) -> JoinHandle<Result<usize, MatchError>> {
    std::thread::spawn(move || run_import(&job, &queue, &cancel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_fifo() {
        let queue = ImportQueue::new();
        queue.push(ImportMessage::Group("a".into()));
        queue.push(ImportMessage::StatusUpdate("b".into()));
        assert_eq!(queue.pop(), Some(ImportMessage::Group("a".into())));
        assert_eq!(queue.drain(), vec![ImportMessage::StatusUpdate("b".into())]);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn cancelled_before_first_file() {
        let job = ImportJob::new(
            "g".into(),
            vec![PathBuf::from("x.md")],
            MatchFormat::Md,
            None,
        );
        let queue = ImportQueue::new();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = run_import(&job, &queue, &cancel).unwrap_err();
        assert_eq!(err.kind(), MatchErrorKind::Cancelled);
        assert_eq!(queue.drain(), vec![ImportMessage::Group("g".into())]);
    }
}
