//! # Spacereg Core - Domain Types and Collaborator Contracts
//!
//! **Purpose**: Define the vocabulary shared by every registry component.
//!
//! # Architecture Constraints
//!
//! - YES Identity and space types (`User`, `Space`, `SpaceId`)
//! - YES Provider descriptors returned to callers
//! - YES The unified `RegistryError`
//! - YES Request context with deadline and cancellation
//! - YES The `ProviderClient`, `ProviderConnector` and `Registry` traits
//! - NO rule matching or path templates (that's `spacereg-template` and `spacereg-registry`)
//! - NO network transports

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Request context: user, deadline, cancellation
pub mod context;

/// Descriptors returned to registry callers
pub mod descriptor;

/// Unified error type
pub mod errors;

/// In-memory provider and connector
pub mod memory;

/// Storage provider contract
pub mod provider;

/// Registry contract and query model
pub mod registry;

/// Identity and space types
pub mod types;

pub use context::{CancelHandle, RequestContext};
pub use descriptor::{Opaque, OpaqueEntry, ProviderDescriptor};
pub use errors::{RegistryError, Result};
pub use memory::{MemoryProvider, StaticConnector};
pub use provider::{
    filters_accept, ListStorageSpacesResponse, ProviderClient, ProviderConnector, SpaceFilter,
    Status, StatusCode,
};
pub use registry::{ProviderQuery, Registry};
pub use types::{ResourceId, Space, SpaceId, User, UserId};
