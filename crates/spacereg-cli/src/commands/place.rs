//! `spacereg place`: run `GetProvider` for a prospective space

use super::{fixture_user, load_config, render_descriptors, request_context};
use anyhow::Result;
use clap::Args;
use spacereg_core::{Registry, Space, StaticConnector};
use spacereg_registry::{RegistryConfig, SpaceRegistry};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments of `place`
#[derive(Debug, Clone, Args)]
pub struct PlaceArgs {
    /// Registry configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Type of the new space
    #[arg(short = 't', long)]
    pub space_type: String,

    /// Owner user name of the new space
    #[arg(short, long)]
    pub owner: Option<String>,

    /// Name of the new space
    #[arg(short, long, default_value = "new space")]
    pub name: String,

    /// Storage id of the new space
    #[arg(long, default_value = "")]
    pub storage_id: String,
}

/// Place and render the chosen descriptor as JSON
pub async fn run(args: &PlaceArgs) -> Result<String> {
    let config = load_config(&args.config)?;
    place(&config, args).await
}

/// Place with an already loaded configuration
pub async fn place(config: &RegistryConfig, args: &PlaceArgs) -> Result<String> {
    // Placement never contacts a provider
    let registry = SpaceRegistry::new(config, Arc::new(StaticConnector::new()))?;
    let mut space = Space::new(&args.storage_id, &args.name, &args.name, &args.space_type);
    if let Some(owner) = &args.owner {
        space = space.with_owner(fixture_user(owner));
    }
    let ctx = request_context(None, None);
    let descriptor = registry.get_provider(&ctx, &space).await?;
    render_descriptors(&[descriptor])
}
