//! Storage provider contract consumed by the registry
//!
//! A provider exposes one call, `ListStorageSpaces`. Transport failures come
//! back as `Err`, while a provider that answered but refused carries a
//! non-OK [`Status`]. The registry treats both as that provider being
//! unavailable for the current resolution.

use crate::context::RequestContext;
use crate::errors::{RegistryError, Result};
use crate::types::{Space, SpaceId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Server-side filter term for `ListStorageSpaces`
///
/// Terms of the same kind are alternatives; terms of different kinds must all
/// hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "term", rename_all = "snake_case")]
pub enum SpaceFilter {
    /// Space id equals the term
    Id(SpaceId),
    /// Space type equals the term
    SpaceType(String),
    /// Space owner has this id
    Owner(UserId),
}

impl SpaceFilter {
    fn kind_index(&self) -> usize {
        match self {
            Self::Id(_) => 0,
            Self::SpaceType(_) => 1,
            Self::Owner(_) => 2,
        }
    }

    fn accepts(&self, space: &Space) -> bool {
        match self {
            Self::Id(id) => &space.id == id,
            Self::SpaceType(space_type) => &space.space_type == space_type,
            Self::Owner(owner) => space
                .owner
                .as_ref()
                .is_some_and(|o| o.id.opaque_id == owner.opaque_id),
        }
    }
}

/// Apply a filter list to a space, with per-kind OR and cross-kind AND
pub fn filters_accept(filters: &[SpaceFilter], space: &Space) -> bool {
    let mut seen = [false; 3];
    let mut matched = [false; 3];
    for filter in filters {
        let kind = filter.kind_index();
        seen[kind] = true;
        if filter.accepts(space) {
            matched[kind] = true;
        }
    }
    seen.iter().zip(matched.iter()).all(|(s, m)| !s || *m)
}

/// Outcome code of a provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    /// Success
    Ok,
    /// Nothing matched
    NotFound,
    /// Caller lacks permission
    PermissionDenied,
    /// Provider cannot serve right now
    Unavailable,
    /// Provider failed internally
    Internal,
}

/// Status attached to a provider response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Outcome code
    pub code: StatusCode,
    /// Free-form message
    #[serde(default)]
    pub message: String,
}

impl Status {
    /// Successful status
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }

    /// Status with a code and message
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// True when the code is `Ok`
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

/// Response of `ListStorageSpaces`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListStorageSpacesResponse {
    /// Call status
    pub status: Status,
    /// Matching spaces; may be empty on success
    #[serde(default)]
    pub spaces: Vec<Space>,
}

impl ListStorageSpacesResponse {
    /// Successful response
    pub fn ok(spaces: Vec<Space>) -> Self {
        Self {
            status: Status::ok(),
            spaces,
        }
    }

    /// Failed response with no spaces
    pub fn failed(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Status::new(code, message),
            spaces: Vec::new(),
        }
    }

    /// Convert a non-OK status into a provider error for `address`
    pub fn into_spaces(self, address: &str) -> Result<Vec<Space>> {
        if self.status.is_ok() {
            Ok(self.spaces)
        } else {
            Err(RegistryError::provider_unavailable(
                address,
                format!("{:?}: {}", self.status.code, self.status.message),
            ))
        }
    }
}

/// Client for one storage provider
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// List the spaces matching `filters`
    async fn list_storage_spaces(
        &self,
        ctx: &RequestContext,
        filters: &[SpaceFilter],
    ) -> Result<ListStorageSpacesResponse>;
}

/// Source of provider clients by address, usually a connection pool
pub trait ProviderConnector: Send + Sync {
    /// Return a client for `address`
    fn connect(&self, address: &str) -> Result<Arc<dyn ProviderClient>>;
}

#[async_trait]
impl<T: ProviderClient + ?Sized> ProviderClient for Arc<T> {
    async fn list_storage_spaces(
        &self,
        ctx: &RequestContext,
        filters: &[SpaceFilter],
    ) -> Result<ListStorageSpacesResponse> {
        (**self).list_storage_spaces(ctx, filters).await
    }
}
