//! Subcommands
//!
//! Each command returns its rendered output so it can be tested without a
//! terminal.

pub mod check;
pub mod expand;
pub mod place;
pub mod resolve;

use anyhow::{Context, Result};
use serde::Serialize;
use spacereg_core::{ProviderDescriptor, RequestContext, User};
use spacereg_registry::{DescriptorExt, RegistryConfig};
use std::collections::BTreeMap;
use std::path::Path;

/// Load a configuration file and apply environment overrides
pub fn load_config(path: &Path) -> Result<RegistryConfig> {
    let mut config = RegistryConfig::load_from_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    config.merge_with_env()?;
    Ok(config)
}

/// Identity used for fixture users: the opaque id is the username
pub fn fixture_user(username: &str) -> User {
    User::new(username).with_opaque_id(username)
}

/// Request context for a CLI invocation
pub fn request_context(user: Option<&str>, user_agent: Option<&str>) -> RequestContext {
    let mut ctx = RequestContext::new();
    if let Some(user) = user {
        ctx = ctx.with_user(fixture_user(user));
    }
    if let Some(user_agent) = user_agent {
        ctx = ctx.with_user_agent(user_agent);
    }
    ctx
}

/// Printable descriptor with its opaque extras decoded
#[derive(Debug, Serialize)]
pub struct DescriptorView {
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    space_paths: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mount_paths: Vec<String>,
}

impl DescriptorView {
    /// Decode `descriptor`
    pub fn decode(descriptor: &ProviderDescriptor) -> Result<Self> {
        Ok(Self {
            address: descriptor.address.clone(),
            provider_id: descriptor.provider_id.clone(),
            space_paths: descriptor
                .space_paths()?
                .into_iter()
                .map(|(id, path)| (id.to_string(), path))
                .collect(),
            mount_paths: descriptor.mount_paths()?,
        })
    }
}

/// Render descriptors as pretty JSON
pub fn render_descriptors(descriptors: &[ProviderDescriptor]) -> Result<String> {
    let views = descriptors
        .iter()
        .map(DescriptorView::decode)
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_string_pretty(&views)?)
}
