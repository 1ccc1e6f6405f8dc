//! Provider fakes
//!
//! Each fake implements [`ProviderClient`] with one scripted behaviour.
//! Wrappers take any client, so they stack: a counting, slow, in-memory
//! provider is `CountingProvider::new(SlowProvider::new(memory, delay))`.

use async_trait::async_trait;
use parking_lot::Mutex;
use spacereg_core::{
    ListStorageSpacesResponse, ProviderClient, RegistryError, RequestContext, Result, Space,
    SpaceFilter, StatusCode,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Provider whose transport always fails
#[derive(Debug, Clone)]
pub struct FailingProvider {
    address: String,
}

impl FailingProvider {
    /// Fail every call as `address`
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl ProviderClient for FailingProvider {
    async fn list_storage_spaces(
        &self,
        _ctx: &RequestContext,
        _filters: &[SpaceFilter],
    ) -> Result<ListStorageSpacesResponse> {
        Err(RegistryError::provider_unavailable(
            &self.address,
            "connection refused",
        ))
    }
}

/// Provider whose client fails with a fixed error
///
/// Stands in for an RPC client that reports its own per-call deadline as
/// [`RegistryError::DeadlineExceeded`].
#[derive(Debug, Clone)]
pub struct ErroringProvider {
    error: RegistryError,
}

impl ErroringProvider {
    /// Fail every call with `error`
    pub fn new(error: RegistryError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl ProviderClient for ErroringProvider {
    async fn list_storage_spaces(
        &self,
        _ctx: &RequestContext,
        _filters: &[SpaceFilter],
    ) -> Result<ListStorageSpacesResponse> {
        Err(self.error.clone())
    }
}

/// Provider that answers but refuses with a fixed status
#[derive(Debug, Clone)]
pub struct StatusProvider {
    code: StatusCode,
    message: String,
}

impl StatusProvider {
    /// Refuse with `code`
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[async_trait]
impl ProviderClient for StatusProvider {
    async fn list_storage_spaces(
        &self,
        _ctx: &RequestContext,
        _filters: &[SpaceFilter],
    ) -> Result<ListStorageSpacesResponse> {
        Ok(ListStorageSpacesResponse::failed(self.code, &self.message))
    }
}

/// Provider that answers only after a delay, ignoring cancellation
///
/// Useful for checking that the caller, not the provider, enforces
/// deadlines.
#[derive(Debug)]
pub struct SlowProvider<C> {
    inner: C,
    delay: Duration,
}

impl<C> SlowProvider<C> {
    /// Delay every call to `inner` by `delay`
    pub fn new(inner: C, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<C: ProviderClient> ProviderClient for SlowProvider<C> {
    async fn list_storage_spaces(
        &self,
        ctx: &RequestContext,
        filters: &[SpaceFilter],
    ) -> Result<ListStorageSpacesResponse> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_storage_spaces(ctx, filters).await
    }
}

/// Provider recording how often, and with which filters, it was called
#[derive(Debug)]
pub struct CountingProvider<C> {
    inner: C,
    calls: AtomicUsize,
    filters: Mutex<Vec<Vec<SpaceFilter>>>,
}

impl<C> CountingProvider<C> {
    /// Count calls to `inner`
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            filters: Mutex::new(Vec::new()),
        }
    }

    /// Number of calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Filter lists received, in call order
    pub fn received_filters(&self) -> Vec<Vec<SpaceFilter>> {
        self.filters.lock().clone()
    }
}

#[async_trait]
impl<C: ProviderClient> ProviderClient for CountingProvider<C> {
    async fn list_storage_spaces(
        &self,
        ctx: &RequestContext,
        filters: &[SpaceFilter],
    ) -> Result<ListStorageSpacesResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().push(filters.to_vec());
        self.inner.list_storage_spaces(ctx, filters).await
    }
}

/// Provider that returns every space it holds, whatever the filters say
///
/// Models a backend without server-side filtering support.
#[derive(Debug, Clone, Default)]
pub struct IgnoringFiltersProvider {
    spaces: Vec<Space>,
}

impl IgnoringFiltersProvider {
    /// Serve `spaces` unfiltered
    pub fn new(spaces: Vec<Space>) -> Self {
        Self { spaces }
    }
}

#[async_trait]
impl ProviderClient for IgnoringFiltersProvider {
    async fn list_storage_spaces(
        &self,
        _ctx: &RequestContext,
        _filters: &[SpaceFilter],
    ) -> Result<ListStorageSpacesResponse> {
        Ok(ListStorageSpacesResponse::ok(self.spaces.clone()))
    }
}
