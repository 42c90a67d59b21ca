//! Event pool partitioned by stage, and the catalog that owns it.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::{EVENT_TYPE_CUSTOM, LOG_TARGET_CONFIG};
use crate::event::{Event, EventError, EventFactory, EventId, parse_index_list};
use crate::stage::Stage;
use crate::tag::TagRegistry;

/// Bucket of the event pool. `All` holds events eligible in every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKey {
    Bloodbath,
    Day,
    Night,
    Feast,
    All,
}

impl PoolKey {
    pub const ALL: [Self; 5] = [Self::Bloodbath, Self::Day, Self::Night, Self::Feast, Self::All];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Bloodbath => "bloodbath",
            Self::Day => "day",
            Self::Night => "night",
            Self::Feast => "feast",
            Self::All => "all",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.key().eq_ignore_ascii_case(raw.trim()))
    }
}

impl From<Stage> for PoolKey {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Bloodbath => Self::Bloodbath,
            Stage::Day => Self::Day,
            Stage::Night => Self::Night,
            Stage::Feast => Self::Feast,
        }
    }
}

/// Events grouped by pool bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPool {
    bloodbath: Vec<Event>,
    day: Vec<Event>,
    night: Vec<Event>,
    feast: Vec<Event>,
    all: Vec<Event>,
}

impl EventPool {
    #[must_use]
    pub fn bucket(&self, key: PoolKey) -> &[Event] {
        match key {
            PoolKey::Bloodbath => &self.bloodbath,
            PoolKey::Day => &self.day,
            PoolKey::Night => &self.night,
            PoolKey::Feast => &self.feast,
            PoolKey::All => &self.all,
        }
    }

    pub fn bucket_mut(&mut self, key: PoolKey) -> &mut Vec<Event> {
        match key {
            PoolKey::Bloodbath => &mut self.bloodbath,
            PoolKey::Day => &mut self.day,
            PoolKey::Night => &mut self.night,
            PoolKey::Feast => &mut self.feast,
            PoolKey::All => &mut self.all,
        }
    }

    pub fn push(&mut self, key: PoolKey, event: Event) {
        self.bucket_mut(key).push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolKey, &Event)> {
        PoolKey::ALL
            .into_iter()
            .flat_map(move |key| self.bucket(key).iter().map(move |event| (key, event)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        PoolKey::ALL.iter().map(|key| self.bucket(*key).len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn find(&self, id: EventId) -> Option<&Event> {
        self.iter().map(|(_, event)| event).find(|event| event.id == id)
    }

    pub fn find_mut(&mut self, id: EventId) -> Option<&mut Event> {
        [
            &mut self.bloodbath,
            &mut self.day,
            &mut self.night,
            &mut self.feast,
            &mut self.all,
        ]
        .into_iter()
        .flatten()
        .find(|event| event.id == id)
    }

    pub fn clear(&mut self) {
        for key in PoolKey::ALL {
            self.bucket_mut(key).clear();
        }
    }

    /// Move events whose message appears in all four stage buckets into the
    /// `all` bucket. Returns the number of events moved.
    pub fn consolidate_shared(&mut self) -> usize {
        let stage_keys = [PoolKey::Bloodbath, PoolKey::Day, PoolKey::Night, PoolKey::Feast];
        let message_sets: Vec<HashSet<&str>> = stage_keys
            .iter()
            .map(|key| {
                self.bucket(*key)
                    .iter()
                    .map(|event| event.message.as_str())
                    .collect()
            })
            .collect();
        let shared: HashSet<String> = message_sets[0]
            .iter()
            .filter(|message| message_sets[1..].iter().all(|set| set.contains(*message)))
            .map(|message| (*message).to_string())
            .collect();
        if shared.is_empty() {
            return 0;
        }

        let existing: HashSet<String> = self.all.iter().map(|event| event.message.clone()).collect();
        let mut moved = Vec::new();
        for key in stage_keys {
            let bucket = self.bucket_mut(key);
            let (keep, take): (Vec<Event>, Vec<Event>) = bucket
                .drain(..)
                .partition(|event| !shared.contains(&event.message));
            *bucket = keep;
            moved.extend(take);
        }
        let mut seen = existing;
        let mut count = 0;
        for event in moved {
            if seen.insert(event.message.clone()) {
                self.all.push(event);
                count += 1;
            }
        }
        count
    }

    /// Enabled events usable in `stage` (its own bucket plus `all`).
    #[must_use]
    pub fn enabled_for(&self, stage: Stage) -> Vec<Event> {
        self.bucket(stage.into())
            .iter()
            .chain(self.all.iter())
            .filter(|event| event.enabled)
            .cloned()
            .collect()
    }

    /// Snapshot of the enabled events for every stage.
    #[must_use]
    pub fn stage_events(&self) -> StageEvents {
        StageEvents {
            bloodbath: self.enabled_for(Stage::Bloodbath),
            day: self.enabled_for(Stage::Day),
            night: self.enabled_for(Stage::Night),
            feast: self.enabled_for(Stage::Feast),
        }
    }
}

/// The per-stage event lists a game draws from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageEvents {
    pub bloodbath: Vec<Event>,
    pub day: Vec<Event>,
    pub night: Vec<Event>,
    pub feast: Vec<Event>,
}

impl StageEvents {
    #[must_use]
    pub fn for_stage(&self, stage: Stage) -> &[Event] {
        match stage {
            Stage::Bloodbath => &self.bloodbath,
            Stage::Day => &self.day,
            Stage::Night => &self.night,
            Stage::Feast => &self.feast,
        }
    }
}

/// Tag registry, event factory and pool that together form a configuration.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub tags: TagRegistry,
    pub factory: EventFactory,
    pub pool: EventPool,
}

impl Catalog {
    /// Catalog without any events or tags.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a user-authored event from raw form input.
    ///
    /// # Errors
    ///
    /// Fails on an empty message, a player count outside 1–9, unparseable
    /// index lists, or out-of-range indices.
    pub fn add_custom_event(
        &mut self,
        key: PoolKey,
        message: &str,
        deaths_raw: &str,
        killers_raw: &str,
    ) -> Result<EventId, EventError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(EventError::EmptyMessage);
        }
        let deaths = parse_index_list("deaths", deaths_raw)?;
        let killers = parse_index_list("killers", killers_raw)?;
        let event = self
            .factory
            .create(message, &deaths, &killers, EVENT_TYPE_CUSTOM)?;
        let id = event.id;
        log::debug!(target: LOG_TARGET_CONFIG, "added custom {} event {id:?}", key.key());
        self.pool.push(key, event);
        Ok(id)
    }

    /// Toggle an event; returns false if no event has this id.
    pub fn set_enabled(&mut self, id: EventId, enabled: bool) -> bool {
        self.pool.find_mut(id).map(|event| event.set_enabled(enabled)).is_some()
    }

    #[must_use]
    pub fn is_enabled(&self, id: EventId) -> Option<bool> {
        self.pool.find(id).map(|event| event.enabled)
    }

    /// Remove every event from every bucket.
    pub fn clear_events(&mut self) {
        self.pool.clear();
    }
}
