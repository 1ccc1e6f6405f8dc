//! Registry contract and query model

use crate::context::RequestContext;
use crate::descriptor::ProviderDescriptor;
use crate::errors::Result;
use crate::types::{Space, SpaceId};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Filter key carrying an absolute path
pub const FILTER_PATH: &str = "path";
/// Filter key carrying the storage part of a resource id
pub const FILTER_STORAGE_ID: &str = "storage_id";
/// Filter key carrying the opaque part of a resource id
pub const FILTER_OPAQUE_ID: &str = "opaque_id";
/// Filter key asking for the single deepest match only
pub const FILTER_UNIQUE: &str = "unique";

/// A parsed `ListProviders` query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderQuery {
    /// Resolve by absolute path
    Path {
        /// Absolute path
        path: String,
        /// Return only the deepest enclosing or exact match
        unique: bool,
    },
    /// Resolve by compound resource id
    Resource {
        /// Storage part
        storage_id: String,
        /// Opaque part
        opaque_id: String,
    },
    /// Nothing recognized; yields an empty result
    Empty,
}

impl ProviderQuery {
    /// Path query
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            unique: false,
        }
    }

    /// Path query restricted to the deepest match
    pub fn unique_path(path: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            unique: true,
        }
    }

    /// Resource id query
    pub fn resource(storage_id: impl Into<String>, opaque_id: impl Into<String>) -> Self {
        Self::Resource {
            storage_id: storage_id.into(),
            opaque_id: opaque_id.into(),
        }
    }

    /// Parse the string filter map of the wire API
    ///
    /// A complete resource id takes precedence over a path. Unknown keys and
    /// incomplete pairs leave the query empty.
    pub fn from_filters(filters: &BTreeMap<String, String>) -> Self {
        let storage_id = filters.get(FILTER_STORAGE_ID).filter(|v| !v.is_empty());
        let opaque_id = filters.get(FILTER_OPAQUE_ID).filter(|v| !v.is_empty());
        if let (Some(storage_id), Some(opaque_id)) = (storage_id, opaque_id) {
            return Self::resource(storage_id.clone(), opaque_id.clone());
        }
        match filters.get(FILTER_PATH).filter(|p| !p.is_empty()) {
            Some(path) => Self::Path {
                path: path.clone(),
                unique: filters
                    .get(FILTER_UNIQUE)
                    .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            },
            None => Self::Empty,
        }
    }

    /// Compound space id of a resource query
    pub fn space_id(&self) -> Option<SpaceId> {
        match self {
            Self::Resource {
                storage_id,
                opaque_id,
            } => Some(SpaceId::compose(storage_id, opaque_id)),
            _ => None,
        }
    }
}

/// Maps queries to the providers that must be contacted
#[async_trait]
pub trait Registry: Send + Sync {
    /// Providers serving the queried path or resource
    async fn list_providers(
        &self,
        ctx: &RequestContext,
        query: &ProviderQuery,
    ) -> Result<Vec<ProviderDescriptor>>;

    /// Provider a new space should be placed on
    async fn get_provider(&self, ctx: &RequestContext, space: &Space)
        -> Result<ProviderDescriptor>;
}
