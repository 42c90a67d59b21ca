//! Persisted configuration: event pools and tags.
//!
//! Two formats are accepted. The legacy format has no `version` field and
//! compares events by message only. Version 1 adds tag requirements and a
//! top-level tag list; events compare equal when both the message and the
//! set of requirements match. Loads merge into the catalog and never add an
//! event that is already present under the format's equality rule.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use thiserror::Error;

use crate::constants::LOG_TARGET_CONFIG;
use crate::event::{Event, EventError};
use crate::pool::{Catalog, PoolKey};
use crate::tag::TagRegistry;

const BUILTIN_CONFIG_DATA: &str = include_str!("../assets/events.json");

/// Current on-disk version written by [`Catalog::save_config`].
pub const CONFIG_VERSION: u64 = 1;

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported configuration version {0}")]
    UnsupportedVersion(String),
    #[error("invalid {stage} event: {source}")]
    Event {
        stage: &'static str,
        #[source]
        source: EventError,
    },
}

/// Where a configuration came from; persisted sources are best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Explicit user import; every problem is reported.
    User,
    /// Restored from local persisted state; unknown versions are ignored.
    Persisted,
}

/// Detected on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFormat {
    Legacy,
    V1,
}

/// Outcome of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub format: Option<ConfigFormat>,
    pub added: usize,
    pub skipped_duplicates: usize,
    pub tags_added: usize,
    /// Set when a persisted source was ignored.
    pub ignored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRequirement {
    pub name: String,
    pub player_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub message: String,
    #[serde(default)]
    pub fatalities: Vec<usize>,
    #[serde(default)]
    pub killers: Vec<usize>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_requirements: Option<Vec<StoredRequirement>>,
}

const fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEventLists {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bloodbath: Option<Vec<StoredEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<Vec<StoredEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub night: Option<Vec<StoredEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feast: Option<Vec<StoredEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<StoredEvent>>,
}

impl StoredEventLists {
    fn bucket(&self, key: PoolKey) -> &[StoredEvent] {
        let list = match key {
            PoolKey::Bloodbath => &self.bloodbath,
            PoolKey::Day => &self.day,
            PoolKey::Night => &self.night,
            PoolKey::Feast => &self.feast,
            PoolKey::All => &self.all,
        };
        list.as_deref().unwrap_or_default()
    }

    fn bucket_mut(&mut self, key: PoolKey) -> &mut Option<Vec<StoredEvent>> {
        match key {
            PoolKey::Bloodbath => &mut self.bloodbath,
            PoolKey::Day => &mut self.day,
            PoolKey::Night => &mut self.night,
            PoolKey::Feast => &mut self.feast,
            PoolKey::All => &mut self.all,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTag {
    pub name: String,
}

/// Serialized configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default)]
    pub events: StoredEventLists,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<StoredTag>>,
}

impl StoredConfig {
    /// Pretty JSON as written to disk.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn detect_format(value: &Value) -> Result<ConfigFormat, ConfigError> {
    match value.get("version") {
        None | Some(Value::Null) => Ok(ConfigFormat::Legacy),
        Some(Value::Number(n)) if n.as_u64() == Some(CONFIG_VERSION) => Ok(ConfigFormat::V1),
        Some(other) => Err(ConfigError::UnsupportedVersion(other.to_string())),
    }
}

type RequirementKey = BTreeSet<(String, usize)>;

fn requirement_key(event: &Event, tags: &TagRegistry) -> RequirementKey {
    event
        .requirements()
        .iter()
        .map(|req| {
            let name = tags.name_of(req.tag).unwrap_or_default().to_string();
            (name, req.player_index)
        })
        .collect()
}

fn stored_requirement_key(stored: &StoredEvent) -> RequirementKey {
    stored
        .tag_requirements
        .iter()
        .flatten()
        .map(|req| (req.name.clone(), req.player_index))
        .collect()
}

impl Catalog {
    /// Catalog holding the built-in events and tags.
    #[must_use]
    pub fn with_builtin_events() -> Self {
        let mut catalog = Self::empty();
        catalog.reset_to_builtin();
        catalog
    }

    /// Replace the pool (and tags) with the built-in configuration.
    pub fn reset_to_builtin(&mut self) {
        let builtin = builtin_config();
        if let Err(err) = self.apply_config(builtin, ConfigFormat::V1, true) {
            log::error!(target: LOG_TARGET_CONFIG, "built-in event data rejected: {err}");
        }
    }

    /// Load a configuration document, merging it into the catalog.
    ///
    /// With `overwrite`, every stage bucket is cleared first, and for V1
    /// documents the tag registry too.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, malformed events, or an unknown version
    /// from a [`LoadSource::User`] source. Unknown versions from a
    /// persisted source yield an ignored report instead.
    pub fn load_config(
        &mut self,
        json: &str,
        overwrite: bool,
        source: LoadSource,
    ) -> Result<LoadReport, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        self.load_config_value(value, overwrite, source)
    }

    /// Like [`Catalog::load_config`] for an already-parsed document.
    ///
    /// # Errors
    ///
    /// See [`Catalog::load_config`].
    pub fn load_config_value(
        &mut self,
        value: Value,
        overwrite: bool,
        source: LoadSource,
    ) -> Result<LoadReport, ConfigError> {
        let format = match detect_format(&value) {
            Ok(format) => format,
            Err(err @ ConfigError::UnsupportedVersion(_)) if source == LoadSource::Persisted => {
                log::warn!(target: LOG_TARGET_CONFIG, "ignoring persisted configuration: {err}");
                return Ok(LoadReport {
                    ignored: true,
                    ..LoadReport::default()
                });
            }
            Err(err) => return Err(err),
        };
        let stored: StoredConfig = serde_json::from_value(value)?;
        self.apply_config(&stored, format, overwrite)
    }

    fn apply_config(
        &mut self,
        stored: &StoredConfig,
        format: ConfigFormat,
        overwrite: bool,
    ) -> Result<LoadReport, ConfigError> {
        // Validate everything up front so a bad document leaves the catalog untouched.
        let mut staged = self.clone();
        let report = staged.merge(stored, format, overwrite)?;
        *self = staged;
        log::debug!(
            target: LOG_TARGET_CONFIG,
            "loaded {format:?} configuration: {} added, {} duplicates skipped, {} tags added",
            report.added,
            report.skipped_duplicates,
            report.tags_added
        );
        Ok(report)
    }

    fn merge(
        &mut self,
        stored: &StoredConfig,
        format: ConfigFormat,
        overwrite: bool,
    ) -> Result<LoadReport, ConfigError> {
        let mut report = LoadReport {
            format: Some(format),
            ..LoadReport::default()
        };
        if overwrite {
            self.pool.clear();
            if format == ConfigFormat::V1 {
                self.tags.clear();
            }
        }
        if format == ConfigFormat::V1 {
            for tag in stored.tags.iter().flatten() {
                if self.tags.find(&tag.name).is_none() {
                    self.tags.intern(&tag.name);
                    report.tags_added += 1;
                }
            }
        }

        for key in PoolKey::ALL {
            for entry in stored.events.bucket(key) {
                if self.contains_stored(key, entry, format) {
                    report.skipped_duplicates += 1;
                    continue;
                }
                let event = self
                    .build_event(entry, format, &mut report)
                    .map_err(|source| ConfigError::Event {
                        stage: key.key(),
                        source,
                    })?;
                self.pool.push(key, event);
                report.added += 1;
            }
        }
        Ok(report)
    }

    fn contains_stored(&self, key: PoolKey, entry: &StoredEvent, format: ConfigFormat) -> bool {
        let bucket = self.pool.bucket(key);
        match format {
            ConfigFormat::Legacy => bucket.iter().any(|event| event.message == entry.message),
            ConfigFormat::V1 => {
                let wanted = stored_requirement_key(entry);
                bucket.iter().any(|event| {
                    event.message == entry.message && requirement_key(event, &self.tags) == wanted
                })
            }
        }
    }

    fn build_event(
        &mut self,
        entry: &StoredEvent,
        format: ConfigFormat,
        report: &mut LoadReport,
    ) -> Result<Event, EventError> {
        let mut event =
            self.factory
                .create(&entry.message, &entry.fatalities, &entry.killers, &entry.kind)?;
        event.set_enabled(entry.enabled);
        if format == ConfigFormat::V1 {
            for req in entry.tag_requirements.iter().flatten() {
                if self.tags.find(&req.name).is_none() {
                    report.tags_added += 1;
                }
                let tag = self.tags.intern(&req.name);
                event.require_tag(tag, req.player_index)?;
            }
        }
        Ok(event)
    }

    /// Serialize the catalog in the current (V1) format.
    #[must_use]
    pub fn save_config(&self) -> StoredConfig {
        let mut events = StoredEventLists::default();
        for key in PoolKey::ALL {
            let stored: Vec<StoredEvent> = self
                .pool
                .bucket(key)
                .iter()
                .map(|event| self.store_event(event))
                .collect();
            *events.bucket_mut(key) = Some(stored);
        }
        StoredConfig {
            version: Some(CONFIG_VERSION),
            events,
            tags: Some(
                self.tags
                    .iter()
                    .map(|tag| StoredTag {
                        name: tag.name.clone(),
                    })
                    .collect(),
            ),
        }
    }

    fn store_event(&self, event: &Event) -> StoredEvent {
        let requirements: Vec<StoredRequirement> = event
            .requirements()
            .iter()
            .filter_map(|req| {
                self.tags.name_of(req.tag).map(|name| StoredRequirement {
                    name: name.to_string(),
                    player_index: req.player_index,
                })
            })
            .collect();
        StoredEvent {
            message: event.message.clone(),
            fatalities: event.fatalities.to_vec(),
            killers: event.killers.to_vec(),
            enabled: event.enabled,
            kind: event.kind.clone(),
            tag_requirements: Some(requirements),
        }
    }
}

/// The built-in configuration bundled with the engine.
#[must_use]
pub fn builtin_config() -> &'static StoredConfig {
    static BUILTIN: OnceLock<StoredConfig> = OnceLock::new();
    BUILTIN.get_or_init(|| {
        serde_json::from_str(BUILTIN_CONFIG_DATA).unwrap_or_else(|err| {
            log::error!(target: LOG_TARGET_CONFIG, "built-in event data is malformed: {err}");
            StoredConfig::default()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r#"{
        "events": {
            "day": [
                { "message": "%0 picks berries.", "fatalities": [], "killers": [], "enabled": true, "type": "BUILTIN" },
                { "message": "%0 stabs %1.", "fatalities": [1], "killers": [0], "enabled": false, "type": "CUSTOM" }
            ],
            "all": [
                { "message": "%0 stares at the sky.", "fatalities": [], "killers": [], "enabled": true, "type": "BUILTIN" }
            ]
        }
    }"#;

    const V1: &str = r#"{
        "version": 1,
        "events": {
            "night": [
                { "message": "%0 and %1 train together.", "fatalities": [], "killers": [], "enabled": true, "type": "BIG LANG",
                  "tag_requirements": [ { "name": "career", "player_index": 0 } ] },
                { "message": "%0 and %1 train together.", "fatalities": [], "killers": [], "enabled": true, "type": "BIG LANG",
                  "tag_requirements": [] }
            ]
        },
        "tags": [ { "name": "career" }, { "name": "tribute" } ]
    }"#;

    #[test]
    fn legacy_load_is_idempotent() {
        let mut catalog = Catalog::empty();
        let first = catalog.load_config(LEGACY, false, LoadSource::User).unwrap();
        assert_eq!(first.format, Some(ConfigFormat::Legacy));
        assert_eq!(first.added, 3);
        let second = catalog.load_config(LEGACY, false, LoadSource::User).unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.skipped_duplicates, 3);
        assert_eq!(catalog.pool.len(), 3);
        let stab = &catalog.pool.bucket(PoolKey::Day)[1];
        assert!(!stab.enabled);
        assert_eq!(stab.kind, "CUSTOM");
    }

    #[test]
    fn v1_distinguishes_events_by_requirements() {
        let mut catalog = Catalog::empty();
        let report = catalog.load_config(V1, false, LoadSource::User).unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.tags_added, 2);
        let night = catalog.pool.bucket(PoolKey::Night);
        let career = catalog.tags.find("career").unwrap();
        assert_eq!(night[0].requirements()[0].tag, career);
        assert!(night[1].requirements().is_empty());
        let again = catalog.load_config(V1, false, LoadSource::User).unwrap();
        assert_eq!(again.added, 0);
    }

    #[test]
    fn overwrite_clears_buckets_and_v1_clears_tags() {
        let mut catalog = Catalog::empty();
        catalog.load_config(LEGACY, false, LoadSource::User).unwrap();
        catalog.tags.intern("stale");
        catalog.load_config(V1, true, LoadSource::User).unwrap();
        assert_eq!(catalog.pool.len(), 2);
        assert!(catalog.tags.find("stale").is_none());

        catalog.tags.intern("kept");
        catalog.load_config(LEGACY, true, LoadSource::User).unwrap();
        assert_eq!(catalog.pool.len(), 3);
        assert!(catalog.tags.find("kept").is_some());
    }

    #[test]
    fn unknown_version_is_strict_for_users_and_soft_for_persisted() {
        let doc = r#"{ "version": 7, "events": {} }"#;
        let mut catalog = Catalog::empty();
        assert!(matches!(
            catalog.load_config(doc, false, LoadSource::User),
            Err(ConfigError::UnsupportedVersion(_))
        ));
        let report = catalog.load_config(doc, false, LoadSource::Persisted).unwrap();
        assert!(report.ignored);
    }

    #[test]
    fn malformed_event_leaves_catalog_untouched() {
        let doc = r#"{ "events": { "day": [
            { "message": "%0 hides.", "fatalities": [], "killers": [], "enabled": true, "type": "X" },
            { "message": "%0 falls.", "fatalities": [3], "killers": [], "enabled": true, "type": "X" }
        ] } }"#;
        let mut catalog = Catalog::empty();
        let err = catalog.load_config(doc, false, LoadSource::User).unwrap_err();
        assert!(matches!(err, ConfigError::Event { stage: "day", .. }));
        assert!(catalog.pool.is_empty());
    }

    #[test]
    fn save_then_load_reproduces_pool_and_tags() {
        let mut original = Catalog::empty();
        original.load_config(LEGACY, false, LoadSource::User).unwrap();
        original.load_config(V1, false, LoadSource::User).unwrap();
        let json = original.save_config().to_json().unwrap();

        let mut restored = Catalog::empty();
        restored.load_config(&json, false, LoadSource::User).unwrap();
        assert_eq!(restored.save_config(), original.save_config());
    }

    #[test]
    fn builtin_configuration_loads_cleanly() {
        let catalog = Catalog::with_builtin_events();
        for stage in crate::stage::Stage::ALL {
            assert!(
                !catalog.pool.enabled_for(stage).is_empty(),
                "{stage} has no built-in events"
            );
        }
        let added = builtin_config()
            .events
            .all
            .as_ref()
            .map_or(0, Vec::len);
        assert_eq!(catalog.pool.bucket(PoolKey::All).len(), added);
    }
}
