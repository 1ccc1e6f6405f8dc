//! # Spacereg Registry - Space Resolution Engine
//!
//! **Purpose**: Decide which storage providers serve a path or a resource
//! id, and which path each discovered space has in the global namespace.
//!
//! # Architecture Constraints
//!
//! - YES Configuration loading and validation (`RegistryConfig`)
//! - YES Rule compilation (`RuleSet`)
//! - YES Live, concurrent resolution against providers (`SpaceRegistry`)
//! - YES Mount-only resolution (`StaticRegistry`)
//! - YES Optional TTL cache of provider answers
//! - NO provider transports (callers supply a `ProviderConnector`)
//! - NO global state; a registry is an ordinary value built at startup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Character-class alias expansion
pub mod alias;

/// Provider answer cache
pub mod cache;

/// Configuration
pub mod config;

/// Descriptor encoding
pub mod encoding;

/// Space-aware registry
pub mod resolver;

/// Compiled rules
pub mod rules;

/// Path classification
pub mod selection;

/// Mount-only registry
pub mod static_registry;

pub use alias::{expand_character_classes, DEFAULT_EXPANSION_LIMIT};
pub use cache::{CacheStats, CachingConnector, CachingProviderClient, SpaceCache};
pub use config::{CacheConfig, RawRule, RegistryConfig};
pub use encoding::{DescriptorExt, MOUNT_PATHS_KEY, SPACE_PATHS_KEY};
pub use resolver::SpaceRegistry;
pub use rules::{Rule, RuleSet};
pub use selection::{Candidate, PathSelector, Relation};
pub use static_registry::StaticRegistry;
