//! Live match tracking.
//!
//! A [`Tracker`] follows a match from observed positions, such as those
//! scraped from a playing client. Each observation is reconciled with the
//! recorded match: the tracker searches the shortest sequence of actions
//! leading from the current position to the observed one, records them and
//! appends them to the match dump on disk.
//!
//! When no such sequence exists the recording is out of sync. The current
//! file is handed to an [`Archive`] and a new match starts whose first game
//! begins at the observed position.

use crate::action::GameAction;
use crate::config::TrackerConfig;
use crate::error::MatchError;
use crate::game::Match;
use crate::md::{MdWriter, read_md_file};
use crate::position::Position;
use crate::rules::legal_moves;
use crate::side::Side;
use chrono::{SubsecRound, Utc};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use strictly_stn::WriterOptions;
use tracing::{debug, info, instrument, warn};

/// Upper bound on actions inferred from one observation.
const MAX_STEPS: usize = 12;

// ─────────────────────────────────────────────────────────────
//  Archive collaborator
// ─────────────────────────────────────────────────────────────

/// Moves a match file out of the way before a restart.
pub trait Archive: Debug {
    /// Archives `path` and returns where it went.
    fn archive(&mut self, path: &Path) -> Result<PathBuf, MatchError>;
}

/// Archive that renames files into a directory with a timestamp suffix.
#[derive(Debug, Clone)]
pub struct RenameArchive {
    dir: PathBuf,
}

impl RenameArchive {
    /// Creates an archive writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory receiving archived files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Archive for RenameArchive {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn archive(&mut self, path: &Path) -> Result<PathBuf, MatchError> {
        std::fs::create_dir_all(&self.dir)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("match");
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("md");
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%6f");
        let mut target = self.dir.join(format!("{}-{}.{}", stem, stamp, extension));
        let mut counter = 1;
        while target.exists() {
            target = self
                .dir
                .join(format!("{}-{}-{}.{}", stem, stamp, counter, extension));
            counter += 1;
        }
        if std::fs::rename(path, &target).is_err() {
            std::fs::copy(path, &target)?;
            std::fs::remove_file(path)?;
        }
        info!(from = %path.display(), to = %target.display(), "Match file archived");
        Ok(target)
    }
}

// ─────────────────────────────────────────────────────────────
//  Reconciliation
// ─────────────────────────────────────────────────────────────

/// One inferred step towards an observed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// An action by one side.
    Act(Side, GameAction),
    /// The next game starts.
    NewGame,
}

/// Result of one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The observation matched the recorded position.
    Unchanged,
    /// This many steps were recorded.
    Appended(usize),
    /// The recording was out of sync and a new match was started.
    Restarted {
        /// Where the previous match file went, if there was one.
        archived: Option<PathBuf>,
    },
}

fn reached(current: &Position, target: &Position) -> bool {
    current.same_board(target)
        && current.dice() == target.dice()
        && current.cube() == target.cube()
        && current.score() == target.score()
        && current.cube_turned() == target.cube_turned()
        && current.resigned() == target.resigned()
        && (!target.has_dice() || current.turn() == target.turn())
}

fn find_roll(current: &Position, side: Side, target: &Position) -> Option<[u8; 2]> {
    (1..=6u8)
        .flat_map(|high| (1..=high).map(move |low| [high, low]))
        .find(|&dice| {
            legal_moves(current, side, dice)
                .iter()
                .any(|m| m.result.same_board(target))
        })
}

fn next_step(game_over: bool, current: &Position, target: &Position) -> Option<PlanStep> {
    if let Some((resigner, value)) = current.resigned() {
        let answerer = resigner.opponent();
        let owed = current.score()[answerer.index()] + current.cube() * u32::from(value);
        return if target.score()[answerer.index()] >= owed {
            Some(PlanStep::Act(answerer, GameAction::Accept))
        } else if target.resigned().is_none() {
            Some(PlanStep::Act(answerer, GameAction::Reject))
        } else {
            None
        };
    }

    if let Some(doubler) = current.cube_turned() {
        let taker = doubler.opponent();
        if target.cube() == current.cube() * 2 {
            return Some(PlanStep::Act(taker, GameAction::Take));
        }
        let owed = current.score()[doubler.index()] + current.cube();
        if target.score()[doubler.index()] >= owed {
            return Some(PlanStep::Act(taker, GameAction::Drop));
        }
        return None;
    }

    if game_over {
        return (target.score() == current.score()).then_some(PlanStep::NewGame);
    }

    if current.has_dice() {
        let side = current.turn()?;
        return legal_moves(current, side, current.dice())
            .into_iter()
            .find(|m| m.result.same_board(target))
            .map(|m| PlanStep::Act(side, GameAction::Move(m.steps)));
    }

    if let Some((resigner, value)) = target.resigned() {
        return Some(PlanStep::Act(resigner, GameAction::Resign(value)));
    }
    if let Some(doubler) = target.cube_turned() {
        return Some(PlanStep::Act(doubler, GameAction::Double));
    }
    if target.cube() == current.cube() * 2 {
        return Some(PlanStep::Act(current.turn()?, GameAction::Double));
    }
    if target.score() != current.score() {
        return None;
    }
    if current.same_board(target) {
        return match target.turn() {
            Some(side) if target.has_dice() => {
                Some(PlanStep::Act(side, GameAction::Roll(target.dice())))
            }
            _ => None,
        };
    }

    let side = current.turn().or_else(|| target.turn().map(Side::opponent))?;
    find_roll(current, side, target).map(|dice| PlanStep::Act(side, GameAction::Roll(dice)))
}

/// Infers the steps leading from the match's current position to `target`.
///
/// Fails with `IllegalAction` when the target cannot be reached.
#[instrument(skip_all)]
pub fn plan(record: &Match, target: &Position) -> Result<Vec<PlanStep>, MatchError> {
    let mut work = record.clone();
    let mut steps = Vec::new();
    for _ in 0..MAX_STEPS {
        let game = work
            .current_game()
            .ok_or_else(|| MatchError::illegal("no game in progress"))?;
        if reached(game.position(), target) {
            debug!(steps = steps.len(), "Target reached");
            return Ok(steps);
        }
        let step = next_step(game.is_over(), game.position(), target)
            .ok_or_else(|| MatchError::illegal("observed position is unreachable"))?;
        match &step {
            PlanStep::Act(side, action) => {
                work.add_action(*side, action.clone(), Some(0))?;
            }
            PlanStep::NewGame => {
                work.append_game()?;
            }
        }
        steps.push(step);
    }
    Err(MatchError::illegal(format!(
        "observed position is more than {} steps away",
        MAX_STEPS
    )))
}

// ─────────────────────────────────────────────────────────────
//  Tracker
// ─────────────────────────────────────────────────────────────

/// Records a live match into a match dump.
#[derive(Debug)]
pub struct Tracker {
    config: TrackerConfig,
    archive: Box<dyn Archive + Send>,
    record: Option<Match>,
    writer: Option<MdWriter>,
}

impl Tracker {
    /// Opens the tracker, resuming the live match file if it exists.
    pub fn open(config: TrackerConfig) -> Result<Self, MatchError> {
        let archive = RenameArchive::new(config.archive_dir().clone());
        Self::with_archive(config, archive)
    }

    /// Opens the tracker with a custom archive.
    #[instrument(skip_all, fields(path = %config.match_path().display()))]
    pub fn with_archive(
        config: TrackerConfig,
        archive: impl Archive + Send + 'static,
    ) -> Result<Self, MatchError> {
        let path = config.match_path();
        let (record, writer) = if path.exists() {
            let record = read_md_file(&path)?;
            let writer = MdWriter::open_append(&path, &record)?;
            info!(games = record.games().len(), "Resumed match");
            (Some(record), Some(writer))
        } else {
            (None, None)
        };
        Ok(Self {
            config,
            archive: Box::new(archive),
            record,
            writer,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The match being recorded.
    pub fn record(&self) -> Option<&Match> {
        self.record.as_ref()
    }

    fn archive_current(&mut self) -> Result<Option<PathBuf>, MatchError> {
        if let Some(writer) = self.writer.take() {
            writer.close()?;
        }
        let path = self.config.match_path();
        if path.exists() {
            Ok(Some(self.archive.archive(&path)?))
        } else {
            Ok(None)
        }
    }

    fn begin(&mut self, record: Match) -> Result<(), MatchError> {
        std::fs::create_dir_all(self.config.match_dir())?;
        self.writer = Some(MdWriter::create(self.config.match_path(), &record)?);
        self.record = Some(record);
        Ok(())
    }

    /// Starts a new match from the opening position, archiving any
    /// previous one.
    #[instrument(skip(self, white, black))]
    pub fn start_match(
        &mut self,
        white: impl Into<String>,
        black: impl Into<String>,
        length: u32,
    ) -> Result<(), MatchError> {
        self.archive_current()?;
        let mut record = Match::new(white, black, length, *self.config.crawford())
            .with_start_time(Utc::now().trunc_subsecs(6));
        record.append_game()?;
        self.begin(record)?;
        info!("Match started");
        Ok(())
    }

    /// Reconciles the recorded match with an observed position.
    #[instrument(skip(self, target))]
    pub fn observe(
        &mut self,
        target: &Position,
        timestamp: Option<i64>,
    ) -> Result<TrackOutcome, MatchError> {
        let record = self
            .record
            .as_ref()
            .ok_or_else(|| MatchError::illegal("no match is being tracked"))?;
        match plan(record, target) {
            Ok(steps) if steps.is_empty() => Ok(TrackOutcome::Unchanged),
            Ok(steps) => {
                let count = steps.len();
                self.apply(steps, timestamp)?;
                Ok(TrackOutcome::Appended(count))
            }
            Err(err) => {
                warn!(%err, "Recording out of sync, restarting");
                let archived = self.restart(target)?;
                Ok(TrackOutcome::Restarted { archived })
            }
        }
    }

    fn apply(&mut self, steps: Vec<PlanStep>, timestamp: Option<i64>) -> Result<(), MatchError> {
        let (Some(record), Some(writer)) = (self.record.as_mut(), self.writer.as_mut()) else {
            return Err(MatchError::illegal("no match is being tracked"));
        };
        let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp_micros());
        for step in steps {
            match step {
                PlanStep::Act(side, action) => {
                    record.add_action(side, action, Some(timestamp))?;
                }
                PlanStep::NewGame => {
                    record.append_game()?;
                }
            }
            writer.sync(record)?;
        }
        Ok(())
    }

    fn restart(&mut self, target: &Position) -> Result<Option<PathBuf>, MatchError> {
        let archived = self.archive_current()?;
        let previous = self
            .record
            .take()
            .ok_or_else(|| MatchError::illegal("no match is being tracked"))?;

        let mut record = Match::new(
            previous.white().clone(),
            previous.black().clone(),
            *previous.length(),
            *previous.crawford(),
        )
        .with_start_time(Utc::now().trunc_subsecs(6));
        for side in [Side::White, Side::Black] {
            if let Some(rank) = previous.rank(side) {
                record = record.with_rank(side, rank);
            }
        }
        if let Some(location) = previous.location() {
            record = record.with_location(location.clone());
        }
        let initial = target.clone().with_cube_turned(None).with_resigned(None);
        record.append_game_with(initial)?;
        self.begin(record)?;
        info!(archived = ?archived, "Match restarted from observed position");

        let pending = target.cube_turned().is_some() || target.resigned().is_some();
        if pending && let Some(record) = &self.record {
            match plan(record, target) {
                Ok(steps) => self.apply(steps, None)?,
                Err(err) => warn!(%err, "Pending decision not recorded"),
            }
        }
        Ok(archived)
    }

    /// Exports the recorded match as tree notation.
    pub fn export_stn(&self) -> Result<Vec<u8>, MatchError> {
        let record = self
            .record
            .as_ref()
            .ok_or_else(|| MatchError::illegal("no match is being tracked"))?;
        let options =
            WriterOptions::for_application(self.config.application(), env!("CARGO_PKG_VERSION"));
        crate::stn::write_stn(record, &options)
    }

    /// Flushes and closes the match file.
    pub fn close(mut self) -> Result<(), MatchError> {
        if let Some(writer) = self.writer.take() {
            writer.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_then_move_is_inferred() {
        let mut record = Match::new("alice", "bob", 0, false);
        record.append_game().unwrap();
        let mut points = crate::position::STARTING_POINTS;
        points[7] -= 1;
        points[5] -= 1;
        points[4] += 2;
        let target = Position::starting(0)
            .with_board(points, [0, 0])
            .with_dice(Some(Side::Black), [0, 0]);
        let steps = plan(&record, &target).unwrap();
        assert_eq!(steps.len(), 2);
        assert!(matches!(steps[0], PlanStep::Act(Side::White, GameAction::Roll(_))));
        assert!(matches!(steps[1], PlanStep::Act(Side::White, GameAction::Move(_))));
    }

    #[test]
    fn double_and_take() {
        let mut record = Match::new("alice", "bob", 0, false);
        record.append_game().unwrap();
        record.add_action(Side::White, GameAction::Roll([6, 5]), Some(0)).unwrap();
        let played = crate::rules::legal_moves(
            record.position().unwrap(),
            Side::White,
            [6, 5],
        );
        let steps = played[0].steps.clone();
        record.add_action(Side::White, GameAction::Move(steps), Some(0)).unwrap();
        let target = record
            .position()
            .unwrap()
            .clone()
            .with_cube(2, [true, false]);
        let steps = plan(&record, &target).unwrap();
        assert_eq!(
            steps,
            vec![
                PlanStep::Act(Side::Black, GameAction::Double),
                PlanStep::Act(Side::White, GameAction::Take),
            ]
        );
    }

    #[test]
    fn unreachable_board_fails() {
        let mut record = Match::new("alice", "bob", 0, false);
        record.append_game().unwrap();
        let mut points = [0i8; 24];
        points[0] = 15;
        points[23] = -15;
        let target = Position::starting(0).with_board(points, [0, 0]);
        assert!(plan(&record, &target).is_err());
    }
}
