//! Event definitions (templates plus fatality/killer metadata).
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::constants::{EVENT_TYPE_BUILTIN, MAX_PLAYERS_PER_EVENT, MIN_PLAYERS_PER_EVENT};
use crate::tag::TagId;
use crate::template::players_involved;

/// Process-unique (per factory) event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u32);

/// Player indices within an event.
pub type PlayerIndices = SmallVec<[usize; 4]>;

/// Errors raised when an event definition is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("message may not be empty")]
    EmptyMessage,
    #[error(
        "event '{message}' is ill-formed since it would involve {involved} players (must be between 1 and 9)"
    )]
    PlayerCount { message: String, involved: usize },
    #[error("invalid fatalities {indices:?} for event '{message}' since it only involves {involved} players")]
    Fatalities {
        message: String,
        indices: Vec<usize>,
        involved: usize,
    },
    #[error("invalid killers {indices:?} for event '{message}' since it only involves {involved} players")]
    Killers {
        message: String,
        indices: Vec<usize>,
        involved: usize,
    },
    #[error("{field} for event '{message}' list player {index} more than once")]
    DuplicateIndex {
        field: &'static str,
        message: String,
        index: usize,
    },
    #[error(
        "cannot add requirement for player {index} since event '{message}' only involves {involved} players"
    )]
    Requirement {
        message: String,
        index: usize,
        involved: usize,
    },
    #[error("invalid syntax for {field}: '{raw}'")]
    IndexList { field: &'static str, raw: String },
}

/// A tag that the tribute bound to `player_index` must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagRequirement {
    pub tag: TagId,
    pub player_index: usize,
}

/// A narrative template in the event pool.
///
/// Only [`EventFactory::create`] builds events, so the player count and
/// every fatality/killer index are known to be in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: EventId,
    pub(crate) message: String,
    players_involved: usize,
    pub(crate) fatalities: PlayerIndices,
    pub(crate) killers: PlayerIndices,
    pub enabled: bool,
    /// Category such as `BUILTIN`, `CUSTOM`, or a thematic label.
    #[serde(rename = "type")]
    pub kind: String,
    requirements: SmallVec<[TagRequirement; 2]>,
}

impl Event {
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn players_involved(&self) -> usize {
        self.players_involved
    }

    /// Slots whose tributes die.
    #[must_use]
    pub fn fatalities(&self) -> &[usize] {
        &self.fatalities
    }

    /// Slots credited with a kill per fatality.
    #[must_use]
    pub fn killers(&self) -> &[usize] {
        &self.killers
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.fatalities.is_empty()
    }

    #[must_use]
    pub fn requirements(&self) -> &[TagRequirement] {
        &self.requirements
    }

    /// Require that the tribute in slot `player_index` carries `tag`.
    /// Adding an existing requirement is a no-op.
    ///
    /// # Errors
    ///
    /// Rejects indices at or beyond `players_involved`.
    pub fn require_tag(&mut self, tag: TagId, player_index: usize) -> Result<&mut Self, EventError> {
        if player_index >= self.players_involved {
            return Err(EventError::Requirement {
                message: self.message.clone(),
                index: player_index,
                involved: self.players_involved,
            });
        }
        let requirement = TagRequirement { tag, player_index };
        if !self.requirements.contains(&requirement) {
            self.requirements.push(requirement);
        }
        Ok(self)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Hands out event ids and validates new events.
#[derive(Debug, Clone, Default)]
pub struct EventFactory {
    next_id: u32,
}

impl EventFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an enabled event from a raw template.
    ///
    /// # Errors
    ///
    /// Fails if the template involves fewer than one or more than nine
    /// players, or any fatality/killer index is out of range.
    pub fn create(
        &mut self,
        message: &str,
        fatalities: &[usize],
        killers: &[usize],
        kind: &str,
    ) -> Result<Event, EventError> {
        if message.trim().is_empty() {
            return Err(EventError::EmptyMessage);
        }
        let involved = players_involved(message);
        if !(MIN_PLAYERS_PER_EVENT..=MAX_PLAYERS_PER_EVENT).contains(&involved) {
            return Err(EventError::PlayerCount {
                message: message.to_string(),
                involved,
            });
        }
        if fatalities.iter().any(|&idx| idx >= involved) {
            return Err(EventError::Fatalities {
                message: message.to_string(),
                indices: fatalities.to_vec(),
                involved,
            });
        }
        if killers.iter().any(|&idx| idx >= involved) {
            return Err(EventError::Killers {
                message: message.to_string(),
                indices: killers.to_vec(),
                involved,
            });
        }
        for (field, indices) in [("fatalities", fatalities), ("killers", killers)] {
            if let Some(index) = first_repeat(indices) {
                return Err(EventError::DuplicateIndex {
                    field,
                    message: message.to_string(),
                    index,
                });
            }
        }

        let id = EventId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        Ok(Event {
            id,
            message: message.to_string(),
            players_involved: involved,
            fatalities: fatalities.iter().copied().collect(),
            killers: killers.iter().copied().collect(),
            enabled: true,
            kind: if kind.trim().is_empty() {
                EVENT_TYPE_BUILTIN.to_string()
            } else {
                kind.to_string()
            },
            requirements: SmallVec::new(),
        })
    }
}

fn first_repeat(indices: &[usize]) -> Option<usize> {
    indices
        .iter()
        .enumerate()
        .find(|(pos, idx)| indices[..*pos].contains(idx))
        .map(|(_, &idx)| idx)
}

/// Parse a comma-separated index list such as `"0, 2"`; blank means none.
///
/// # Errors
///
/// Returns [`EventError::IndexList`] carrying the raw text on bad input.
pub fn parse_index_list(field: &'static str, raw: &str) -> Result<Vec<usize>, EventError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    if trimmed.trim().is_empty() {
        return Ok(Vec::new());
    }
    trimmed
        .split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| EventError::IndexList {
            field,
            raw: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_player_count_and_assigns_increasing_ids() {
        let mut factory = EventFactory::new();
        let first = factory
            .create("%0 kills %1 with a spear.", &[1], &[0], "BUILTIN")
            .unwrap();
        let second = factory.create("%0 naps.", &[], &[], "").unwrap();
        assert_eq!(first.players_involved(), 2);
        assert_eq!(first.fatalities(), &[1]);
        assert_eq!(first.killers(), &[0]);
        assert!(first.is_fatal());
        assert!(first.enabled);
        assert!(second.id > first.id);
        assert_eq!(second.kind, EVENT_TYPE_BUILTIN);
    }

    #[test]
    fn rejects_bad_player_counts_and_indices() {
        let mut factory = EventFactory::new();
        assert!(matches!(
            factory.create("Nobody is here.", &[], &[], "CUSTOM"),
            Err(EventError::PlayerCount { involved: 0, .. })
        ));
        assert!(matches!(
            factory.create("%9 is tenth.", &[], &[], "CUSTOM"),
            Err(EventError::PlayerCount { involved: 10, .. })
        ));
        assert!(matches!(
            factory.create("%0 and %1 fight.", &[2], &[], "CUSTOM"),
            Err(EventError::Fatalities { .. })
        ));
        assert!(matches!(
            factory.create("%0 and %1 fight.", &[1], &[2], "CUSTOM"),
            Err(EventError::Killers { .. })
        ));
        assert_eq!(
            factory.create("  ", &[], &[], "CUSTOM"),
            Err(EventError::EmptyMessage)
        );
    }

    #[test]
    fn rejects_repeated_fatality_and_killer_slots() {
        let mut factory = EventFactory::new();
        assert_eq!(
            factory.create("%0 kills %1.", &[1, 1], &[0], "CUSTOM"),
            Err(EventError::DuplicateIndex {
                field: "fatalities",
                message: "%0 kills %1.".into(),
                index: 1,
            })
        );
        assert!(matches!(
            factory.create("%0 and %1 kill %2.", &[2], &[0, 1, 0], "CUSTOM"),
            Err(EventError::DuplicateIndex {
                field: "killers",
                index: 0,
                ..
            })
        ));
        assert!(factory.create("%0 and %1 kill %2.", &[2], &[0, 1], "CUSTOM").is_ok());
    }

    #[test]
    fn tag_requirements_are_validated_and_deduplicated() {
        let mut factory = EventFactory::new();
        let mut event = factory.create("%0 trains %1.", &[], &[], "").unwrap();
        event.require_tag(TagId(3), 1).unwrap();
        event.require_tag(TagId(3), 1).unwrap();
        event.require_tag(TagId(3), 0).unwrap();
        assert_eq!(event.requirements().len(), 2);
        assert!(matches!(
            event.require_tag(TagId(3), 2),
            Err(EventError::Requirement { index: 2, .. })
        ));
        event.set_enabled(false);
        assert!(!event.enabled);
    }

    #[test]
    fn parses_index_lists() {
        assert_eq!(parse_index_list("deaths", " ").unwrap(), Vec::<usize>::new());
        assert_eq!(parse_index_list("deaths", "0, 2").unwrap(), vec![0, 2]);
        assert_eq!(parse_index_list("killers", "[1]").unwrap(), vec![1]);
        assert_eq!(
            parse_index_list("killers", "one"),
            Err(EventError::IndexList {
                field: "killers",
                raw: "one".into()
            })
        );
    }
}
