//! JSON fixtures describing the spaces each provider serves
//!
//! ```json
//! {
//!   "users:9000": [
//!     { "storage_id": "s1", "opaque_id": "home-marie", "name": "marie",
//!       "space_type": "personal", "owner": "marie" }
//!   ]
//! }
//! ```

use crate::commands::fixture_user;
use anyhow::{Context, Result};
use serde::Deserialize;
use spacereg_core::{MemoryProvider, Space, StaticConnector};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// One space as written in a fixture
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureSpace {
    #[serde(default)]
    storage_id: String,
    opaque_id: String,
    name: String,
    space_type: String,
    #[serde(default)]
    owner: Option<String>,
}

impl FixtureSpace {
    fn into_space(self) -> Space {
        let space = Space::new(self.storage_id, self.opaque_id, self.name, self.space_type);
        match self.owner {
            Some(owner) => space.with_owner(fixture_user(&owner)),
            None => space,
        }
    }
}

/// Spaces by provider address
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Fixture {
    providers: BTreeMap<String, Vec<FixtureSpace>>,
}

impl Fixture {
    /// Parse fixture JSON
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid fixture")
    }

    /// Read a fixture file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Connector serving each address from an in-memory provider
    pub fn into_connector(self) -> StaticConnector {
        self.providers
            .into_iter()
            .fold(StaticConnector::new(), |connector, (address, spaces)| {
                let spaces = spaces.into_iter().map(FixtureSpace::into_space).collect();
                connector.with_client(address, Arc::new(MemoryProvider::new(spaces)))
            })
    }
}
