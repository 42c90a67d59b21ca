//! Hunger Games Simulator engine
//!
//! Platform-agnostic round engine: message templates, the event pool and
//! its tags, tributes, round generation, and the game state machine. No UI
//! or platform-specific I/O lives here; persistence goes through the
//! [`ConfigStore`] trait.

pub mod config;
pub mod constants;
pub mod event;
pub mod game;
pub mod pool;
pub mod rng;
pub mod round;
pub mod stage;
pub mod tag;
pub mod template;
pub mod tribute;

use thiserror::Error;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfigFormat, LoadReport, LoadSource, StoredConfig, StoredEvent, builtin_config,
};
pub use event::{Event, EventError, EventFactory, EventId, TagRequirement, parse_index_list};
pub use game::{
    Game, GameError, GameOptions, GamePhase, PhaseView, RenderState, RoundDeaths, TributeStats,
    TributeStatus, cannon_text, winners_text,
};
pub use pool::{Catalog, EventPool, PoolKey, StageEvents};
pub use rng::{CountingRng, RngStream, RngStreams};
pub use round::{
    FatalityPolicy, GameRound, InGameEvent, RetryPolicy, RoundRequest, generate_round,
};
pub use stage::{Stage, StageClock};
pub use tag::{Tag, TagError, TagId, TagRegistry};
pub use template::{Fragment, RenderedMessage, TemplateError, players_involved, render};
pub use tribute::{
    PronounOption, PronounSet, Tribute, TributeError, TributeId, TributeSetup, debug_roster,
    roster_from_json, roster_to_json,
};

use constants::LOG_TARGET_CONFIG;

/// Key under which the event configuration is persisted.
pub const EVENTS_KEY: &str = "events";

/// Trait for abstracting persisted configuration.
/// Platform-specific implementations should provide this
pub trait ConfigStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the document stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Replace the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn write(&self, key: &str, contents: &str) -> Result<(), Self::Error>;

    /// Delete the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be removed.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("configuration store failed: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tribute(#[from] TributeError),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("could not serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Owns the event catalog and hands out games.
pub struct Simulator<S>
where
    S: ConfigStore,
{
    catalog: Catalog,
    store: S,
}

impl<S> Simulator<S>
where
    S: ConfigStore,
{
    /// Create a simulator seeded with the built-in events.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            catalog: Catalog::with_builtin_events(),
            store,
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub const fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Replace the catalog with the persisted configuration, if one exists.
    ///
    /// Persisted state is best effort: read failures, malformed JSON and
    /// unknown versions are logged and leave the catalog untouched.
    pub fn restore(&mut self) -> Option<LoadReport> {
        let contents = match self.store.read(EVENTS_KEY) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(err) => {
                log::warn!(target: LOG_TARGET_CONFIG, "could not read persisted events: {err}");
                return None;
            }
        };
        match self
            .catalog
            .load_config(&contents, true, LoadSource::Persisted)
        {
            Ok(report) => Some(report),
            Err(err) => {
                log::warn!(target: LOG_TARGET_CONFIG, "ignoring persisted events: {err}");
                None
            }
        }
    }

    /// Write the current catalog to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store write fails.
    pub fn persist(&self) -> Result<(), SimulatorError> {
        let json = self.export()?;
        self.store
            .write(EVENTS_KEY, &json)
            .map_err(|err| SimulatorError::Store(Box::new(err)))
    }

    /// Forget the persisted configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot delete the document.
    pub fn forget(&self) -> Result<(), SimulatorError> {
        self.store
            .remove(EVENTS_KEY)
            .map_err(|err| SimulatorError::Store(Box::new(err)))
    }

    /// Import a user-supplied configuration document.
    ///
    /// # Errors
    ///
    /// Every problem is reported; the catalog is left untouched on error.
    pub fn import(&mut self, json: &str, overwrite: bool) -> Result<LoadReport, ConfigError> {
        self.catalog.load_config(json, overwrite, LoadSource::User)
    }

    /// Serialize the catalog in the current format.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn export(&self) -> Result<String, serde_json::Error> {
        self.catalog.save_config().to_json()
    }

    /// Build tributes from setup data and start a game with a snapshot of
    /// the currently enabled events.
    ///
    /// # Errors
    ///
    /// Fails on invalid tribute setups or a roster that is too small.
    pub fn create_game(
        &mut self,
        setups: &[TributeSetup],
        options: GameOptions,
        seed: u64,
    ) -> Result<Game, SimulatorError> {
        let roster = setups
            .iter()
            .map(|setup| Tribute::from_setup(setup, &mut self.catalog.tags))
            .collect::<Result<Vec<_>, _>>()?;
        let events = self.catalog.pool.stage_events();
        Ok(Game::new(roster, events, options, seed)?)
    }
}
