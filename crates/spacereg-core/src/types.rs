//! Identity and space types observed by the registry
//!
//! Spaces are owned by providers. The registry only sees them as query
//! results that live for one resolution and never stores them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between storage id and opaque id in a compound space identifier
pub const SPACE_ID_DELIMITER: char = '$';

/// Identity of a user at an identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId {
    /// Identity provider that issued the id
    #[serde(default)]
    pub idp: String,
    /// Opaque id, unique per identity provider
    pub opaque_id: String,
}

impl UserId {
    /// Create a user id without an identity provider
    pub fn new(opaque_id: impl Into<String>) -> Self {
        Self {
            idp: String::new(),
            opaque_id: opaque_id.into(),
        }
    }
}

/// Caller identity supplied by the request context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier
    pub id: UserId,
    /// Login name
    pub username: String,
    /// Mail address
    #[serde(default)]
    pub mail: String,
    /// Human readable name
    #[serde(default)]
    pub display_name: String,
}

impl User {
    /// Create a user whose opaque id equals its username
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id: UserId::new(username.clone()),
            username,
            mail: String::new(),
            display_name: String::new(),
        }
    }

    /// Set the opaque id
    pub fn with_opaque_id(mut self, opaque_id: impl Into<String>) -> Self {
        self.id.opaque_id = opaque_id.into();
        self
    }

    /// Set the identity provider
    pub fn with_idp(mut self, idp: impl Into<String>) -> Self {
        self.id.idp = idp.into();
        self
    }

    /// Set the mail address
    pub fn with_mail(mut self, mail: impl Into<String>) -> Self {
        self.mail = mail.into();
        self
    }

    /// Set the display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// Compound space identifier, `<storage_id>$<opaque_id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(String);

impl SpaceId {
    /// Wrap an already formatted identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Combine a storage id and an opaque id. An empty storage id yields the
    /// bare opaque id.
    pub fn compose(storage_id: &str, opaque_id: &str) -> Self {
        if storage_id.is_empty() {
            Self(opaque_id.to_string())
        } else {
            Self(format!("{storage_id}{SPACE_ID_DELIMITER}{opaque_id}"))
        }
    }

    /// Split into `(storage_id, opaque_id)`
    pub fn split(&self) -> (&str, &str) {
        match self.0.split_once(SPACE_ID_DELIMITER) {
            Some((storage, opaque)) => (storage, opaque),
            None => ("", self.0.as_str()),
        }
    }

    /// Borrow the formatted identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpaceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SpaceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Location of a space's root node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// Storage the space lives on
    pub storage_id: String,
    /// Space within the storage
    pub space_id: String,
    /// Node within the space
    pub opaque_id: String,
}

/// A named, independently owned unit of storage hosted by one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    /// Identifier, unique across the whole system
    pub id: SpaceId,
    /// Root node
    pub root: ResourceId,
    /// Display name, not unique
    pub name: String,
    /// Space type, e.g. `personal` or `project`
    pub space_type: String,
    /// Owner, absent for shared or public spaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<User>,
}

impl Space {
    /// Create a space rooted at `storage_id$opaque_id`
    pub fn new(
        storage_id: impl Into<String>,
        opaque_id: impl Into<String>,
        name: impl Into<String>,
        space_type: impl Into<String>,
    ) -> Self {
        let storage_id = storage_id.into();
        let opaque_id = opaque_id.into();
        Self {
            id: SpaceId::compose(&storage_id, &opaque_id),
            root: ResourceId {
                storage_id,
                space_id: opaque_id.clone(),
                opaque_id,
            },
            name: name.into(),
            space_type: space_type.into(),
            owner: None,
        }
    }

    /// Set the owner
    pub fn with_owner(mut self, owner: User) -> Self {
        self.owner = Some(owner);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_id_compose_and_split() {
        let id = SpaceId::compose("storage-1", "space-a");
        assert_eq!(id.as_str(), "storage-1$space-a");
        assert_eq!(id.split(), ("storage-1", "space-a"));
    }

    #[test]
    fn test_space_id_without_storage() {
        let id = SpaceId::compose("", "space-a");
        assert_eq!(id.as_str(), "space-a");
        assert_eq!(id.split(), ("", "space-a"));
    }

    #[test]
    fn test_space_builder() {
        let space = Space::new("s1", "o1", "Alice", "personal").with_owner(User::new("alice"));
        assert_eq!(space.id.as_str(), "s1$o1");
        assert_eq!(space.root.space_id, "o1");
        assert_eq!(space.owner.map(|o| o.username), Some("alice".to_string()));
    }
}
