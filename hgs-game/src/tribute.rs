//! Tributes and their grammatical identity.
use regex::Regex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::OnceLock;
use thiserror::Error;

use crate::constants::PRONOUN_SLASH_SENTINEL;
use crate::tag::{TagId, TagRegistry};

/// Index of a tribute in a game's roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TributeId(pub usize);

/// Errors raised while building tributes from setup data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TributeError {
    #[error("tribute name may not be empty")]
    EmptyName,
    #[error(
        "invalid custom pronouns '{raw}': expected nominative/accusative/genitive/reflexive, e.g. they/them/their/themself"
    )]
    InvalidPronouns { raw: String },
}

/// The N/A/G/R pronouns used by a tribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PronounSet {
    pub nominative: String,
    pub accusative: String,
    pub genitive: String,
    pub reflexive: String,
}

impl PronounSet {
    fn from_parts(parts: [&str; 4]) -> Self {
        let [nominative, accusative, genitive, reflexive] = parts;
        Self {
            nominative: nominative.to_string(),
            accusative: accusative.to_string(),
            genitive: genitive.to_string(),
            reflexive: reflexive.to_string(),
        }
    }

    #[must_use]
    pub fn masculine() -> Self {
        Self::from_parts(["he", "him", "his", "himself"])
    }

    #[must_use]
    pub fn feminine() -> Self {
        Self::from_parts(["she", "her", "her", "herself"])
    }

    #[must_use]
    pub fn common() -> Self {
        Self::from_parts(["they", "them", "their", "themselves"])
    }

    /// Parse a `nom/acc/gen/reflx` string. A literal slash inside a slot is
    /// written `//`.
    ///
    /// # Errors
    ///
    /// Returns [`TributeError::InvalidPronouns`] unless the string holds
    /// exactly four non-empty segments.
    pub fn parse(raw: &str) -> Result<Self, TributeError> {
        let escaped = raw
            .trim()
            .replace("//", &PRONOUN_SLASH_SENTINEL.to_string());
        if !pronoun_pattern().is_match(&escaped) {
            return Err(TributeError::InvalidPronouns {
                raw: raw.to_string(),
            });
        }
        let slots: Vec<String> = escaped
            .split('/')
            .map(|slot| slot.trim().replace(PRONOUN_SLASH_SENTINEL, "/"))
            .collect();
        match slots.as_slice() {
            [nominative, accusative, genitive, reflexive]
                if slots.iter().all(|slot| !slot.is_empty()) =>
            {
                Ok(Self {
                    nominative: nominative.clone(),
                    accusative: accusative.clone(),
                    genitive: genitive.clone(),
                    reflexive: reflexive.clone(),
                })
            }
            _ => Err(TributeError::InvalidPronouns {
                raw: raw.to_string(),
            }),
        }
    }

    /// Whether the set takes plural verb agreement.
    #[must_use]
    pub fn is_plural(&self) -> bool {
        self.nominative.eq_ignore_ascii_case("they")
    }
}

fn pronoun_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^/]+/[^/]+/[^/]+/[^/]+$").expect("valid pronoun pattern"))
}

/// Pronoun choice on the character select screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PronounOption {
    Masculine,
    Feminine,
    #[default]
    Common,
    /// No pronouns; substitutions fall back to the tribute's name.
    None,
    Custom(String),
}

impl PronounOption {
    /// Resolve the option into a pronoun set (absent for [`Self::None`])
    /// and a plurality flag.
    ///
    /// # Errors
    ///
    /// Fails when a custom pronoun string is malformed.
    pub fn resolve(&self) -> Result<(Option<PronounSet>, bool), TributeError> {
        let set = match self {
            Self::Masculine => PronounSet::masculine(),
            Self::Feminine => PronounSet::feminine(),
            Self::Common => PronounSet::common(),
            Self::None => return Ok((None, false)),
            Self::Custom(raw) => PronounSet::parse(raw)?,
        };
        let plural = set.is_plural();
        Ok((Some(set), plural))
    }
}

/// Tribute data as entered on the setup screen; round-trips as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TributeSetup {
    pub name: String,
    #[serde(default)]
    pub pronouns: PronounOption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TributeSetup {
    #[must_use]
    pub fn new(name: impl Into<String>, pronouns: PronounOption) -> Self {
        Self {
            name: name.into(),
            pronouns,
            image_url: None,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Parse a roster previously written by [`roster_to_json`].
///
/// # Errors
///
/// Returns the underlying JSON error if the text is not a list of setups.
pub fn roster_from_json(json: &str) -> Result<Vec<TributeSetup>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serialize a roster for saving.
///
/// # Errors
///
/// Returns the underlying JSON error if serialization fails.
pub fn roster_to_json(setups: &[TributeSetup]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(setups)
}

/// Debug roster of `count` tributes named `Player0`, `Player1`, ...
#[must_use]
pub fn debug_roster(count: usize) -> Vec<TributeSetup> {
    (0..count)
        .map(|idx| {
            let pronouns = match idx % 4 {
                0 => PronounOption::Masculine,
                1 => PronounOption::Feminine,
                2 => PronounOption::Common,
                _ => PronounOption::None,
            };
            TributeSetup::new(format!("Player{idx}"), pronouns)
        })
        .collect()
}

/// Inline capacity for tag memberships.
pub type TagSet = SmallVec<[TagId; 4]>;

/// A participant in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tribute {
    pub name: String,
    /// Present iff the tribute uses pronouns.
    pub pronouns: Option<PronounSet>,
    pub plural: bool,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub kills: u32,
    /// Round in which the tribute died; `None` while alive.
    #[serde(default)]
    pub died_in_round: Option<u32>,
    #[serde(default)]
    tags: TagSet,
}

impl Tribute {
    /// Create a tribute with the given pronoun option.
    ///
    /// # Errors
    ///
    /// Rejects empty names and malformed custom pronouns.
    pub fn new(name: &str, pronouns: &PronounOption) -> Result<Self, TributeError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TributeError::EmptyName);
        }
        let (pronouns, plural) = pronouns.resolve()?;
        Ok(Self {
            name: name.to_string(),
            pronouns,
            plural,
            image: String::new(),
            kills: 0,
            died_in_round: None,
            tags: TagSet::new(),
        })
    }

    /// Build a tribute from setup data, interning its tags.
    ///
    /// # Errors
    ///
    /// See [`Tribute::new`].
    pub fn from_setup(setup: &TributeSetup, tags: &mut TagRegistry) -> Result<Self, TributeError> {
        let mut tribute = Self::new(&setup.name, &setup.pronouns)?;
        tribute.image = setup.image_url.clone().unwrap_or_default();
        for name in setup.tags.iter().filter(|name| !name.trim().is_empty()) {
            tribute.add_tag(tags.intern(name.trim()));
        }
        Ok(tribute)
    }

    #[must_use]
    pub const fn uses_pronouns(&self) -> bool {
        self.pronouns.is_some()
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.died_in_round.is_none()
    }

    #[must_use]
    pub fn has_tag(&self, tag: TagId) -> bool {
        self.tags.contains(&tag)
    }

    /// Add a tag membership; adding an existing tag is a no-op.
    pub fn add_tag(&mut self, tag: TagId) {
        if !self.has_tag(tag) {
            self.tags.push(tag);
        }
    }

    #[must_use]
    pub fn tags(&self) -> &[TagId] {
        &self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plural_and_singular_custom_pronouns() {
        let they = PronounSet::parse("they/them/their/themself").unwrap();
        assert_eq!(they.nominative, "they");
        assert_eq!(they.accusative, "them");
        assert_eq!(they.genitive, "their");
        assert_eq!(they.reflexive, "themself");
        assert!(they.is_plural());

        let he = PronounSet::parse("he/him/his/himself").unwrap();
        assert!(!he.is_plural());
    }

    #[test]
    fn rejects_short_or_empty_pronoun_strings() {
        for raw in ["co/co/cos", "a/b/c/d/e", "/him/his/himself", "a/b/c/ ", ""] {
            assert!(
                matches!(
                    PronounSet::parse(raw),
                    Err(TributeError::InvalidPronouns { .. })
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn escaped_slash_survives_parsing() {
        let set = PronounSet::parse("xe//xem/xem/xyr/xemself").unwrap();
        assert_eq!(set.nominative, "xe/xem");
        assert_eq!(set.reflexive, "xemself");
    }

    #[test]
    fn tribute_construction_validates_and_tracks_tags() {
        assert_eq!(
            Tribute::new("   ", &PronounOption::Common),
            Err(TributeError::EmptyName)
        );
        let mut registry = TagRegistry::new();
        let setup = TributeSetup::new("Rue", PronounOption::Feminine)
            .with_tag("district-11")
            .with_tag("district-11");
        let mut rue = Tribute::from_setup(&setup, &mut registry).unwrap();
        let tag = registry.find("district-11").unwrap();
        assert!(rue.has_tag(tag));
        assert_eq!(rue.tags().len(), 1);
        rue.add_tag(tag);
        assert_eq!(rue.tags().len(), 1);
        assert!(rue.uses_pronouns());
        assert!(!rue.plural);
        assert!(rue.is_alive());
    }

    #[test]
    fn pronoun_none_falls_back_to_names() {
        let tribute = Tribute::new("Cato", &PronounOption::None).unwrap();
        assert!(!tribute.uses_pronouns());
        assert!(!tribute.plural);
        let common = Tribute::new("Twins", &PronounOption::Common).unwrap();
        assert!(common.plural);
    }

    #[test]
    fn roster_json_roundtrips() {
        let mut roster = debug_roster(3);
        roster[2].pronouns = PronounOption::Custom("ze/zir/zir/zirself".into());
        roster[2].image_url = Some("https://example.invalid/p.png".into());
        let json = roster_to_json(&roster).unwrap();
        assert_eq!(roster_from_json(&json).unwrap(), roster);
    }
}
