//! In-memory providers
//!
//! [`MemoryProvider`] serves a fixed, mutable list of spaces and applies the
//! filter semantics a real provider would. [`StaticConnector`] maps addresses
//! to already constructed clients. Together they allow dry-running a
//! configuration without a network.

use crate::context::RequestContext;
use crate::errors::{RegistryError, Result};
use crate::provider::{
    filters_accept, ListStorageSpacesResponse, ProviderClient, ProviderConnector, SpaceFilter,
};
use crate::types::{Space, SpaceId};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Provider answering from an in-memory space list
#[derive(Debug, Default)]
pub struct MemoryProvider {
    spaces: RwLock<Vec<Space>>,
}

impl MemoryProvider {
    /// Create a provider serving `spaces`
    pub fn new(spaces: Vec<Space>) -> Self {
        Self {
            spaces: RwLock::new(spaces),
        }
    }

    /// Add a space
    pub fn add_space(&self, space: Space) {
        self.spaces.write().push(space);
    }

    /// Remove a space by id, returning whether it existed
    pub fn remove_space(&self, id: &SpaceId) -> bool {
        let mut spaces = self.spaces.write();
        let before = spaces.len();
        spaces.retain(|s| &s.id != id);
        spaces.len() != before
    }

    /// Number of spaces served
    pub fn len(&self) -> usize {
        self.spaces.read().len()
    }

    /// True when no spaces are served
    pub fn is_empty(&self) -> bool {
        self.spaces.read().is_empty()
    }
}

#[async_trait]
impl ProviderClient for MemoryProvider {
    async fn list_storage_spaces(
        &self,
        _ctx: &RequestContext,
        filters: &[SpaceFilter],
    ) -> Result<ListStorageSpacesResponse> {
        let spaces = self
            .spaces
            .read()
            .iter()
            .filter(|space| filters_accept(filters, space))
            .cloned()
            .collect();
        Ok(ListStorageSpacesResponse::ok(spaces))
    }
}

/// Connector resolving addresses from a fixed table
#[derive(Default, Clone)]
pub struct StaticConnector {
    clients: HashMap<String, Arc<dyn ProviderClient>>,
}

impl StaticConnector {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client for `address`
    pub fn with_client(mut self, address: impl Into<String>, client: Arc<dyn ProviderClient>) -> Self {
        self.insert(address, client);
        self
    }

    /// Register a client for `address`
    pub fn insert(&mut self, address: impl Into<String>, client: Arc<dyn ProviderClient>) {
        self.clients.insert(address.into(), client);
    }

    /// Registered addresses
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for StaticConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut addresses: Vec<&str> = self.addresses().collect();
        addresses.sort_unstable();
        f.debug_struct("StaticConnector")
            .field("addresses", &addresses)
            .finish()
    }
}

impl ProviderConnector for StaticConnector {
    fn connect(&self, address: &str) -> Result<Arc<dyn ProviderClient>> {
        self.clients
            .get(address)
            .cloned()
            .ok_or_else(|| RegistryError::provider_unavailable(address, "no route to provider"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;

    #[tokio::test]
    async fn test_memory_provider_filters() {
        let provider = MemoryProvider::new(vec![
            Space::new("s1", "a", "Alice", "personal").with_owner(User::new("alice")),
            Space::new("s1", "p", "Project", "project"),
        ]);
        let ctx = RequestContext::new();

        let all = provider.list_storage_spaces(&ctx, &[]).await.unwrap();
        assert_eq!(all.spaces.len(), 2);

        let projects = provider
            .list_storage_spaces(&ctx, &[SpaceFilter::SpaceType("project".into())])
            .await
            .unwrap();
        assert_eq!(projects.spaces.len(), 1);
        assert_eq!(projects.spaces[0].name, "Project");
    }

    #[tokio::test]
    async fn test_remove_space() {
        let provider = MemoryProvider::new(vec![Space::new("s1", "p", "Project", "project")]);
        assert!(provider.remove_space(&SpaceId::compose("s1", "p")));
        assert!(provider.is_empty());
    }

    #[test]
    fn test_static_connector_unknown_address() {
        let connector = StaticConnector::new();
        let err = connector.connect("nowhere:1").err();
        assert!(matches!(
            err,
            Some(RegistryError::ProviderUnavailable { .. })
        ));
    }
}
