//! Games and matches.
//!
//! A [`Match`] owns its games; each [`Game`] owns the ordered action records
//! and the position they lead to. Actions are validated against the current
//! position before they are recorded, so a rejected action never changes
//! the match.

use crate::action::{ActionRecord, GameAction, GameEnd};
use crate::error::MatchError;
use crate::invariants::{InvariantSet, PositionInvariants};
use crate::position::Position;
use crate::rules;
use crate::side::Side;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Player rating and number of games played.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Getters, new)]
pub struct Rank {
    /// Rating points.
    rating: f64,
    /// Experience in games.
    experience: u32,
}

/// One game of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Game {
    /// Position before the first action.
    initial: Position,
    /// Actions in the order they happened.
    actions: Vec<ActionRecord>,
    /// Position after the last action.
    position: Position,
    /// Result, once the game has ended.
    end: Option<GameEnd>,
    /// Whether this is the Crawford game.
    crawford: bool,
}

impl Game {
    /// Creates a game without actions.
    pub fn new(initial: Position, crawford: bool) -> Self {
        Self {
            position: initial.clone(),
            initial,
            actions: Vec::new(),
            end: None,
            crawford,
        }
    }

    /// Whether the game has ended.
    pub fn is_over(&self) -> bool {
        self.end.is_some()
    }

    fn add_action(&mut self, record: ActionRecord) -> Result<Option<GameEnd>, MatchError> {
        if let Some(end) = &self.end {
            return Err(MatchError::illegal(format!(
                "game already won by {}",
                end.winner()
            )));
        }
        let mut position = self.position.clone();
        let end = rules::apply(&mut position, *record.side(), record.action())?;
        self.position = position;
        self.actions.push(record);
        self.end = end;
        Ok(end)
    }
}

/// A backgammon match: players, settings and games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Match {
    /// Name of the White player.
    white: String,
    /// Name of the Black player.
    black: String,
    /// Points to win, 0 for unlimited.
    length: u32,
    /// Whether the Crawford rule is in force.
    crawford: bool,
    /// Ranks indexed by [`Side::index`].
    ranks: [Option<Rank>; 2],
    /// Where the match was played.
    location: Option<String>,
    /// When the match started.
    start_time: Option<DateTime<Utc>>,
    /// Games in order.
    games: Vec<Game>,
}

impl Match {
    /// Creates a match without games.
    #[instrument(skip(white, black))]
    pub fn new(
        white: impl Into<String>,
        black: impl Into<String>,
        length: u32,
        crawford: bool,
    ) -> Self {
        Self {
            white: white.into(),
            black: black.into(),
            length,
            crawford,
            ranks: [None, None],
            location: None,
            start_time: None,
            games: Vec::new(),
        }
    }

    /// Sets the rank of one side.
    pub fn with_rank(mut self, side: Side, rank: Rank) -> Self {
        self.ranks[side.index()] = Some(rank);
        self
    }

    /// Sets the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the start time.
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Name of the player on `side`.
    pub fn player(&self, side: Side) -> &str {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// Rank of the player on `side`.
    pub fn rank(&self, side: Side) -> Option<Rank> {
        self.ranks[side.index()]
    }

    /// The game in progress or the last one played.
    pub fn current_game(&self) -> Option<&Game> {
        self.games.last()
    }

    /// Position of the current game.
    pub fn position(&self) -> Option<&Position> {
        self.games.last().map(Game::position)
    }

    /// Match score, indexed by [`Side::index`].
    pub fn score(&self) -> [u32; 2] {
        self.position().map(Position::score).unwrap_or([0, 0])
    }

    /// Whether a side has reached the match length.
    pub fn is_over(&self) -> bool {
        self.length > 0 && self.score().iter().any(|&s| s >= self.length)
    }

    fn crawford_due(&self, score: [u32; 2], before: usize) -> bool {
        self.crawford
            && self.length > 0
            && score.iter().any(|&s| s + 1 == self.length)
            && !self.games.iter().take(before).any(|g| g.crawford)
    }

    /// Initial position and Crawford flag the next game gets when it
    /// follows the current last game.
    pub fn derived_initial(&self) -> (Position, bool) {
        self.derived_initial_at(self.games.len())
    }

    /// Initial position and Crawford flag derived for game `index` from the
    /// games before it.
    pub fn derived_initial_at(&self, index: usize) -> (Position, bool) {
        let index = index.min(self.games.len());
        let score = index
            .checked_sub(1)
            .and_then(|i| self.games.get(i))
            .map(|g| g.position.score())
            .unwrap_or([0, 0]);
        let crawford = self.crawford_due(score, index);
        let may_double = if crawford { [false, false] } else { [true, true] };
        let position = Position::starting(self.length)
            .with_score(score[0], score[1])
            .with_cube(1, may_double);
        (position, crawford)
    }

    /// Starts a new game from the derived initial position.
    #[instrument(skip(self), fields(games = self.games.len()))]
    pub fn append_game(&mut self) -> Result<&Game, MatchError> {
        if self.is_over() {
            return Err(MatchError::illegal("match is over"));
        }
        if self.games.last().is_some_and(|g| !g.is_over()) {
            warn!("Starting a new game before the previous one ended");
        }
        let (initial, crawford) = self.derived_initial();
        self.push_game(Game::new(initial, crawford))
    }

    /// Starts a new game from an explicit position.
    ///
    /// The game is the Crawford game when doubling is disabled for both
    /// sides and the Crawford game is due. Fails with `IllegalAction` when
    /// the position breaks a position invariant.
    #[instrument(skip(self, initial), fields(games = self.games.len()))]
    pub fn append_game_with(&mut self, initial: Position) -> Result<&Game, MatchError> {
        if self.is_over() {
            return Err(MatchError::illegal("match is over"));
        }
        PositionInvariants::check_all(&initial).map_err(|violations| {
            let descriptions = violations
                .iter()
                .map(|v| v.description.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            warn!(%descriptions, "Rejected initial position");
            MatchError::illegal(format!("invalid initial position: {}", descriptions))
        })?;
        let initial = initial.with_match_length(self.length);
        let crawford = initial.may_double() == [false, false]
            && self.crawford_due(initial.score(), self.games.len());
        self.push_game(Game::new(initial, crawford))
    }

    fn push_game(&mut self, game: Game) -> Result<&Game, MatchError> {
        info!(
            number = self.games.len() + 1,
            crawford = game.crawford,
            "Game started"
        );
        self.games.push(game);
        self.games
            .last()
            .ok_or_else(|| MatchError::illegal("no game in progress"))
    }

    /// Records an action in the current game.
    ///
    /// Without a timestamp the current time is used. Fails with
    /// `IllegalAction` and leaves the match unchanged when the action is not
    /// allowed.
    #[instrument(skip(self), fields(verb = %action.verb()))]
    pub fn add_action(
        &mut self,
        side: Side,
        action: GameAction,
        timestamp: Option<i64>,
    ) -> Result<Option<GameEnd>, MatchError> {
        if self.is_over() {
            return Err(MatchError::illegal("match is over"));
        }
        let game = self
            .games
            .last_mut()
            .ok_or_else(|| MatchError::illegal("no game in progress"))?;
        let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp_micros());
        let end = game.add_action(ActionRecord::new(side, action, timestamp))?;
        debug!(actions = game.actions.len(), "Action recorded");
        if let Some(end) = &end {
            info!(winner = %end.winner(), points = end.points(), "Game over");
        }
        Ok(end)
    }

    /// Number of actions over all games.
    pub fn action_count(&self) -> usize {
        self.games.iter().map(|g| g.actions.len()).sum()
    }
}
