//! `spacereg resolve`: dry-run a `ListProviders` query

use super::{load_config, render_descriptors, request_context};
use crate::fixture::Fixture;
use anyhow::{bail, Result};
use clap::Args;
use spacereg_core::{ProviderQuery, Registry};
use spacereg_registry::{RegistryConfig, SpaceRegistry, StaticRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Arguments of `resolve`
#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    /// Registry configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// JSON file listing the spaces of each provider address
    #[arg(short, long)]
    pub fixture: Option<PathBuf>,

    /// Resolve against mount paths only, without providers
    #[arg(long = "static", conflicts_with = "fixture")]
    pub static_only: bool,

    /// Requesting user name
    #[arg(short, long)]
    pub user: Option<String>,

    /// Client class of the request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Absolute path to resolve
    #[arg(short, long, conflicts_with_all = ["storage_id", "opaque_id"])]
    pub path: Option<String>,

    /// Storage part of a resource id
    #[arg(long, requires = "opaque_id")]
    pub storage_id: Option<String>,

    /// Opaque part of a resource id
    #[arg(long, requires = "storage_id")]
    pub opaque_id: Option<String>,

    /// Return only the space owning the path
    #[arg(long, requires = "path")]
    pub unique: bool,

    /// Overall deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl ResolveArgs {
    fn query(&self) -> Result<ProviderQuery> {
        match (&self.path, &self.storage_id, &self.opaque_id) {
            (Some(path), None, None) => Ok(ProviderQuery::Path {
                path: path.clone(),
                unique: self.unique,
            }),
            (None, Some(storage_id), Some(opaque_id)) => {
                Ok(ProviderQuery::resource(storage_id, opaque_id))
            }
            _ => bail!("give either --path or --storage-id with --opaque-id"),
        }
    }
}

/// Resolve and render the descriptors as JSON
pub async fn run(args: &ResolveArgs) -> Result<String> {
    let config = load_config(&args.config)?;
    let fixture = match &args.fixture {
        Some(path) => Fixture::load(path)?,
        None => Fixture::default(),
    };
    resolve(&config, fixture, args).await
}

/// Resolve with an already loaded configuration and fixture
pub async fn resolve(config: &RegistryConfig, fixture: Fixture, args: &ResolveArgs) -> Result<String> {
    let query = args.query()?;
    let registry: Box<dyn Registry> = if args.static_only {
        Box::new(StaticRegistry::from_config(config)?)
    } else {
        Box::new(SpaceRegistry::new(config, Arc::new(fixture.into_connector()))?)
    };

    let mut ctx = request_context(args.user.as_deref(), args.user_agent.as_deref());
    if let Some(ms) = args.timeout_ms {
        ctx = ctx.with_timeout(Duration::from_millis(ms));
    }
    let descriptors = registry.list_providers(&ctx, &query).await?;
    render_descriptors(&descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacereg_registry::RawRule;

    fn args() -> ResolveArgs {
        ResolveArgs {
            config: PathBuf::new(),
            fixture: None,
            static_only: false,
            user: Some("marie".into()),
            user_agent: None,
            path: None,
            storage_id: None,
            opaque_id: None,
            unique: false,
            timeout_ms: None,
        }
    }

    fn config() -> RegistryConfig {
        RegistryConfig {
            rules: vec![
                RawRule::new("users:9000", "/users")
                    .with_template("/users/{{.Space.Owner.Username}}")
                    .with_space_type("personal"),
                RawRule::new("projects:9000", "/projects")
                    .with_template("/projects/{{.Space.Name}}")
                    .with_space_type("project"),
            ],
            ..RegistryConfig::default()
        }
    }

    fn fixture() -> Fixture {
        Fixture::from_json(
            r#"{
                "users:9000": [{ "storage_id": "s1", "opaque_id": "home-marie",
                                 "name": "marie", "space_type": "personal", "owner": "marie" }],
                "projects:9000": [{ "storage_id": "s2", "opaque_id": "p1",
                                    "name": "Apollo", "space_type": "project" }]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_home_path() {
        let args = ResolveArgs {
            path: Some("/home".into()),
            ..args()
        };
        let out = resolve(&config(), fixture(), &args).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json[0]["address"], "users:9000");
        assert_eq!(json[0]["space_paths"]["s1$home-marie"], "/users/marie");
    }

    #[tokio::test]
    async fn test_resolve_by_id() {
        let args = ResolveArgs {
            storage_id: Some("s2".into()),
            opaque_id: Some("p1".into()),
            ..args()
        };
        let out = resolve(&config(), fixture(), &args).await.unwrap();
        assert!(out.contains("/projects/Apollo"));
    }

    #[tokio::test]
    async fn test_missing_query_rejected() {
        assert!(resolve(&config(), fixture(), &args()).await.is_err());
    }

    #[tokio::test]
    async fn test_static_resolution() {
        let args = ResolveArgs {
            static_only: true,
            path: Some("/projects/Apollo/docs".into()),
            ..args()
        };
        let out = resolve(&config(), Fixture::default(), &args).await.unwrap();
        assert!(out.contains("projects:9000"));
        assert!(out.contains("mount_paths"));
    }
}
