//! The game state machine.
//!
//! A [`Game`] is advanced one presentation step at a time. Each call to
//! [`Game::advance`] performs the work for the current [`GamePhase`],
//! returns what should be shown, and moves to the next phase:
//!
//! ```text
//! NewRound -> InRound -> TheFallen -> NewRound ...      (day, then night)
//! NewRound -> TheFallen -> NewRound ...                 (bloodbath, feast)
//! any round with < 2 alive or all-win
//!   -> EndResults -> EndWinner | EndNoWinner
//!   -> EndSummaryFatalities -> EndSummaryStats -> End
//! ```
//!
//! A failure while generating a round moves the game to `Dead`; there is no
//! way back from it.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_FATALITY_REROLL_RATE, LOG_TARGET_GAME};
use crate::pool::StageEvents;
use crate::rng::{RngStream, RngStreams};
use crate::round::{FatalityPolicy, GameRound, RetryPolicy, RoundRequest, generate_round};
use crate::stage::StageClock;
use crate::template::TemplateError;
use crate::tribute::{Tribute, TributeId};

/// Minimum roster size for a game.
pub const MIN_TRIBUTES: usize = 2;

/// Presentation phase of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    NewRound,
    InRound,
    TheFallen,
    EndResults,
    EndWinner,
    EndNoWinner,
    EndSummaryFatalities,
    EndSummaryStats,
    End,
    Dead,
}

impl GamePhase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::End | Self::Dead)
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("a game needs at least two tributes, got {0}")]
    NotEnoughTributes(usize),
    #[error("round {round} could not be generated: {source}")]
    Round {
        round: u32,
        #[source]
        source: TemplateError,
    },
    #[error("the game has already ended")]
    Finished,
    #[error("the game was stopped after an error: {0}")]
    Dead(String),
}

/// Per-game tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    pub fatality_policy: FatalityPolicy,
    /// Chance of discarding a fatal event when no quota is set.
    pub reroll_rate: f64,
    pub retry: RetryPolicy,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            fatality_policy: FatalityPolicy::Disabled,
            reroll_rate: DEFAULT_FATALITY_REROLL_RATE,
            retry: RetryPolicy::default(),
        }
    }
}

/// Deaths of one round in the end-of-game summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDeaths {
    /// `Round N: Stage`.
    pub heading: String,
    /// Messages of the fatal events, or a single `No-one died` line.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "round")]
pub enum TributeStatus {
    Winner,
    Died(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TributeStats {
    pub tribute: TributeId,
    pub name: String,
    pub kills: u32,
    pub status: TributeStatus,
}

/// Content of one presentation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PhaseView {
    RoundEvents { round: GameRound },
    Fallen { deaths: Vec<TributeId>, lines: Vec<String>, cannon: String },
    Winners { winners: Vec<TributeId>, text: String },
    NoWinner { text: String },
    DeathSummary { rounds: Vec<RoundDeaths> },
    StatSummary { winners: Vec<TributeStats>, fallen: Vec<TributeStats> },
}

/// What a caller should render after one [`Game::advance`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderState {
    /// Phase that produced this view.
    pub phase: GamePhase,
    pub title: String,
    pub view: PhaseView,
    pub alive: Vec<TributeId>,
    pub dead: Vec<TributeId>,
}

/// An ongoing game.
#[derive(Debug, Clone)]
pub struct Game {
    roster: Vec<Tribute>,
    alive: Vec<TributeId>,
    /// Tributes whose deaths have been shown, in order of death.
    dead: Vec<TributeId>,
    /// Tributes that died since the fallen were last shown.
    died: Vec<TributeId>,
    rounds: Vec<GameRound>,
    clock: StageClock,
    phase: GamePhase,
    required_fatalities: Option<u32>,
    options: GameOptions,
    events: StageEvents,
    rng: RngStreams,
    all_won: bool,
    failure: Option<String>,
}

impl Game {
    /// Start a game. `events` is the snapshot of enabled events the game
    /// draws from; later edits to the pool do not reach it.
    ///
    /// # Errors
    ///
    /// Fails if fewer than [`MIN_TRIBUTES`] tributes are given.
    pub fn new(
        roster: Vec<Tribute>,
        events: StageEvents,
        options: GameOptions,
        seed: u64,
    ) -> Result<Self, GameError> {
        if roster.len() < MIN_TRIBUTES {
            return Err(GameError::NotEnoughTributes(roster.len()));
        }
        let required_fatalities = options.fatality_policy.required(roster.len());
        log::info!(
            target: LOG_TARGET_GAME,
            "new game: {} tributes, seed {seed}, required fatalities {required_fatalities:?}",
            roster.len()
        );
        Ok(Self {
            alive: (0..roster.len()).map(TributeId).collect(),
            roster,
            dead: Vec::new(),
            died: Vec::new(),
            rounds: Vec::new(),
            clock: StageClock::default(),
            phase: GamePhase::NewRound,
            required_fatalities,
            options,
            events,
            rng: RngStreams::from_user_seed(seed),
            all_won: false,
            failure: None,
        })
    }

    #[must_use]
    pub fn roster(&self) -> &[Tribute] {
        &self.roster
    }

    #[must_use]
    pub fn tribute(&self, id: TributeId) -> Option<&Tribute> {
        self.roster.get(id.0)
    }

    #[must_use]
    pub fn alive(&self) -> &[TributeId] {
        &self.alive
    }

    #[must_use]
    pub fn dead(&self) -> &[TributeId] {
        &self.dead
    }

    #[must_use]
    pub fn rounds(&self) -> &[GameRound] {
        &self.rounds
    }

    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.phase
    }

    #[must_use]
    pub const fn clock(&self) -> &StageClock {
        &self.clock
    }

    #[must_use]
    pub const fn required_fatalities(&self) -> Option<u32> {
        self.required_fatalities
    }

    #[must_use]
    pub const fn options(&self) -> &GameOptions {
        &self.options
    }

    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Draws taken from `stream` so far.
    #[must_use]
    pub fn rng_draws(&self, stream: RngStream) -> u64 {
        self.rng.draws(stream)
    }

    /// Force the game to its terminal state.
    pub fn abort(&mut self) {
        if self.phase != GamePhase::Dead {
            log::info!(target: LOG_TARGET_GAME, "game aborted in phase {:?}", self.phase);
            self.phase = GamePhase::End;
        }
    }

    /// Declare every surviving tribute a winner; the game ends at the next
    /// exit test.
    pub fn declare_all_winners(&mut self) {
        self.all_won = true;
    }

    /// Perform the current phase and move to the next one.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Finished`] once the game has ended,
    /// [`GameError::Dead`] after an earlier failure, and
    /// [`GameError::Round`] if round generation fails (which also kills
    /// the game).
    pub fn advance(&mut self) -> Result<RenderState, GameError> {
        let phase = self.phase;
        let (title, view) = match phase {
            GamePhase::Dead => {
                return Err(GameError::Dead(self.failure.clone().unwrap_or_default()));
            }
            GamePhase::End => return Err(GameError::Finished),
            GamePhase::NewRound | GamePhase::InRound => self.play_round()?,
            GamePhase::TheFallen => {
                self.phase = GamePhase::NewRound;
                self.show_fallen()
            }
            GamePhase::EndResults => {
                self.phase = if self.alive.is_empty() {
                    GamePhase::EndNoWinner
                } else {
                    GamePhase::EndWinner
                };
                self.show_fallen()
            }
            GamePhase::EndWinner => {
                self.phase = GamePhase::EndSummaryFatalities;
                let text = winners_text(&self.names(&self.alive));
                let view = PhaseView::Winners {
                    winners: self.alive.clone(),
                    text,
                };
                ("The Games have ended".to_string(), view)
            }
            GamePhase::EndNoWinner => {
                self.phase = GamePhase::EndSummaryFatalities;
                let view = PhaseView::NoWinner {
                    text: "There are no survivors.".to_string(),
                };
                ("The Games have ended".to_string(), view)
            }
            GamePhase::EndSummaryFatalities => {
                self.phase = GamePhase::EndSummaryStats;
                ("Deaths".to_string(), self.death_summary())
            }
            GamePhase::EndSummaryStats => {
                self.phase = GamePhase::End;
                log::info!(
                    target: LOG_TARGET_GAME,
                    "game over after {} rounds, {} survivor(s)",
                    self.rounds.len(),
                    self.alive.len()
                );
                let title = if self.alive.is_empty() {
                    "The Fallen"
                } else {
                    "Winners"
                };
                (title.to_string(), self.stat_summary())
            }
        };
        Ok(RenderState {
            phase,
            title,
            view,
            alive: self.alive.clone(),
            dead: self.dead.clone(),
        })
    }

    fn play_round(&mut self) -> Result<(String, PhaseView), GameError> {
        let number = self.clock.round;
        let stage = self.clock.advance(self.rng.get_mut(RngStream::Stage));
        let request = RoundRequest {
            number,
            stage,
            events: self.events.for_stage(stage),
            required_fatalities: self.required_fatalities,
            reroll_rate: self.options.reroll_rate,
            retry: self.options.retry,
        };
        let generated = generate_round(
            &mut self.roster,
            &self.alive,
            &request,
            self.rng.get_mut(RngStream::Round),
        );
        let round = match generated {
            Ok(round) => round,
            Err(source) => {
                let err = GameError::Round {
                    round: number,
                    source,
                };
                log::error!(target: LOG_TARGET_GAME, "{err}");
                self.failure = Some(err.to_string());
                self.phase = GamePhase::Dead;
                return Err(err);
            }
        };
        log::debug!(
            target: LOG_TARGET_GAME,
            "round {number} ({stage}): {} events, {} deaths",
            round.events.len(),
            round.deaths.len()
        );

        self.died.extend(round.deaths.iter().copied());
        let roster = &self.roster;
        self.alive.retain(|id| roster[id.0].is_alive());
        self.rounds.push(round.clone());

        self.phase = if self.alive.len() < 2 || self.all_won {
            GamePhase::EndResults
        } else if stage.is_single_phase() || self.phase == GamePhase::InRound {
            GamePhase::TheFallen
        } else {
            GamePhase::InRound
        };
        Ok((self.clock.title(stage), PhaseView::RoundEvents { round }))
    }

    fn show_fallen(&mut self) -> (String, PhaseView) {
        let deaths = std::mem::take(&mut self.died);
        let lines = deaths
            .iter()
            .filter_map(|id| self.tribute(*id))
            .map(|tribute| format!("{} has died this round", tribute.name))
            .collect();
        let cannon = cannon_text(deaths.len());
        self.dead.extend(deaths.iter().copied());
        ("The Fallen".to_string(), PhaseView::Fallen { deaths, lines, cannon })
    }

    fn death_summary(&self) -> PhaseView {
        let rounds = self
            .rounds
            .iter()
            .map(|round| {
                let mut lines: Vec<String> = round
                    .events
                    .iter()
                    .filter(|event| event.event.is_fatal())
                    .map(|event| event.message.text.clone())
                    .collect();
                if lines.is_empty() {
                    lines.push("No-one died".to_string());
                }
                RoundDeaths {
                    heading: format!("Round {}: {}", round.number, round.stage),
                    lines,
                }
            })
            .collect();
        PhaseView::DeathSummary { rounds }
    }

    fn stat_summary(&self) -> PhaseView {
        let stats = |id: &TributeId| {
            self.tribute(*id).map(|tribute| TributeStats {
                tribute: *id,
                name: tribute.name.clone(),
                kills: tribute.kills,
                status: tribute
                    .died_in_round
                    .map_or(TributeStatus::Winner, TributeStatus::Died),
            })
        };
        PhaseView::StatSummary {
            winners: self.alive.iter().filter_map(stats).collect(),
            fallen: self.dead.iter().rev().filter_map(stats).collect(),
        }
    }

    fn names(&self, ids: &[TributeId]) -> Vec<&str> {
        ids.iter()
            .filter_map(|id| self.tribute(*id))
            .map(|tribute| tribute.name.as_str())
            .collect()
    }
}

/// `N cannon shot(s) can be heard in the distance.`
#[must_use]
pub fn cannon_text(deaths: usize) -> String {
    match deaths {
        0 => "No cannon shots can be heard in the distance.".to_string(),
        1 => "1 cannon shot can be heard in the distance.".to_string(),
        n => format!("{n} cannon shots can be heard in the distance."),
    }
}

/// Announcement for the surviving tributes.
#[must_use]
pub fn winners_text(names: &[&str]) -> String {
    match names {
        [] => "There are no survivors.".to_string(),
        [one] => format!("The winner is {one}!"),
        [first, second] => format!("The winners are {first} and {second}"),
        [rest @ .., last] => format!("The winners are {}, and {last}!", rest.join(", ")),
    }
}
