//! Provider descriptors returned to registry callers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single self-describing opaque value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueEntry {
    /// Name of the decoder needed to read `value`, e.g. `json`
    pub decoder: String,
    /// Encoded payload
    pub value: Vec<u8>,
}

impl OpaqueEntry {
    /// Create an entry
    pub fn new(decoder: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            decoder: decoder.into(),
            value,
        }
    }
}

/// Generic keyed bag of opaque values attached to a descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opaque {
    /// Entries by name; ordered so encodings are deterministic
    pub map: BTreeMap<String, OpaqueEntry>,
}

impl Opaque {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, key: impl Into<String>, entry: OpaqueEntry) {
        self.map.insert(key.into(), entry);
    }

    /// Look up an entry
    pub fn get(&self, key: &str) -> Option<&OpaqueEntry> {
        self.map.get(key)
    }

    /// True when no entries are present
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A provider the caller must contact, with the spaces it serves for this query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Network address of the provider
    pub address: String,
    /// Storage id shared by the returned spaces, if they agree on one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Encoded extras such as the resolved space paths
    #[serde(default)]
    pub opaque: Opaque,
}

impl ProviderDescriptor {
    /// Create a descriptor with no extras
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            provider_id: None,
            opaque: Opaque::new(),
        }
    }

    /// Set the provider id
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }
}
