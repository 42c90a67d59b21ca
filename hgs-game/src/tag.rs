//! Named tags used to gate which tributes may take part in which events.
//!
//! Tags are interned in a [`TagRegistry`] owned by the configuration
//! context. A tag's identity is its [`TagId`]; names are unique within a
//! registry and ids are never reused, even across [`TagRegistry::clear`].
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identifier assigned to a tag at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub u32);

/// A named marker attachable to tributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// Errors raised by registry mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("a tag with the name {name} already exists")]
    Duplicate { name: String },
    #[error("tag names may not be empty")]
    EmptyName,
    #[error("unknown tag id {0}")]
    Unknown(u32),
}

/// Registry of every tag known to a configuration.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: Vec<Tag>,
    next_id: u32,
}

impl TagRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the tag named `name`, creating it if it does not exist yet.
    pub fn intern(&mut self, name: &str) -> TagId {
        if let Some(id) = self.find(name) {
            return id;
        }
        self.insert(name.to_string())
    }

    /// Create a new tag, failing if the name is already taken.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Duplicate`] if a tag with this name exists and
    /// [`TagError::EmptyName`] for blank names.
    pub fn create(&mut self, name: &str) -> Result<TagId, TagError> {
        if name.trim().is_empty() {
            return Err(TagError::EmptyName);
        }
        if self.find(name).is_some() {
            return Err(TagError::Duplicate {
                name: name.to_string(),
            });
        }
        Ok(self.insert(name.to_string()))
    }

    /// Rename an existing tag. Names stay unique.
    ///
    /// # Errors
    ///
    /// Fails if the id is unknown, the name is blank, or another tag
    /// already carries the name.
    pub fn rename(&mut self, id: TagId, name: &str) -> Result<(), TagError> {
        if name.trim().is_empty() {
            return Err(TagError::EmptyName);
        }
        if self.tags.iter().any(|tag| tag.name == name) {
            return Err(TagError::Duplicate {
                name: name.to_string(),
            });
        }
        let tag = self
            .tags
            .iter_mut()
            .find(|tag| tag.id == id)
            .ok_or(TagError::Unknown(id.0))?;
        tag.name = name.to_string();
        Ok(())
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<TagId> {
        self.tags.iter().find(|tag| tag.name == name).map(|tag| tag.id)
    }

    #[must_use]
    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.id == id)
    }

    #[must_use]
    pub fn name_of(&self, id: TagId) -> Option<&str> {
        self.get(id).map(|tag| tag.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Drop every tag. The id counter keeps running so stale ids never alias.
    pub fn clear(&mut self) {
        self.tags.clear();
    }

    fn insert(&mut self, name: String) -> TagId {
        let id = TagId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.tags.push(Tag { id, name });
        id
    }
}
