//! Fixture builders for users, spaces and connectors

use spacereg_core::{MemoryProvider, ProviderClient, Space, StaticConnector, User};
use std::sync::Arc;

/// Storage id used by the fixture builders unless one is given
pub const TEST_STORAGE_ID: &str = "storage-1";

/// User whose opaque id is derived from the name
pub fn test_user(username: &str) -> User {
    User::new(username)
        .with_opaque_id(format!("id-{username}"))
        .with_idp("https://idp.example.org")
        .with_mail(format!("{username}@example.org"))
}

/// Personal space owned by `username`
pub fn personal_space(username: &str) -> Space {
    Space::new(TEST_STORAGE_ID, format!("home-{username}"), username, "personal")
        .with_owner(test_user(username))
}

/// Project space without an owner
pub fn project_space(opaque_id: &str, name: &str) -> Space {
    Space::new(TEST_STORAGE_ID, opaque_id, name, "project")
}

/// Space of an arbitrary type on an arbitrary storage
pub fn space_on(storage_id: &str, opaque_id: &str, name: &str, space_type: &str) -> Space {
    Space::new(storage_id, opaque_id, name, space_type)
}

/// Builder for a [`StaticConnector`] made of fakes
#[derive(Default)]
pub struct ConnectorBuilder {
    connector: StaticConnector,
}

impl ConnectorBuilder {
    /// Start with no providers
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `spaces` from an in-memory provider at `address`
    pub fn memory(mut self, address: &str, spaces: Vec<Space>) -> Self {
        self.connector
            .insert(address, Arc::new(MemoryProvider::new(spaces)));
        self
    }

    /// Serve `address` with any client
    pub fn client(mut self, address: &str, client: Arc<dyn ProviderClient>) -> Self {
        self.connector.insert(address, client);
        self
    }

    /// Finish as a shareable connector
    pub fn build(self) -> Arc<StaticConnector> {
        Arc::new(self.connector)
    }
}
