//! Static registry
//!
//! Matches query paths against the configured mount paths only and never
//! contacts a provider. Bracketed mounts such as `/users/[a-k]` stand for
//! every concrete alias they expand to.

use crate::alias::{expand_character_classes, has_character_class, DEFAULT_EXPANSION_LIMIT};
use crate::config::RegistryConfig;
use crate::encoding::{encode_mount_paths, MOUNT_PATHS_KEY};
use crate::rules::{Rule, RuleSet};
use crate::selection::{classify, clean_path, Relation};
use async_trait::async_trait;
use indexmap::IndexMap;
use spacereg_core::{
    ProviderDescriptor, ProviderQuery, Registry, RegistryError, RequestContext, Result, Space,
};
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
struct Mount {
    rule: usize,
    aliases: Vec<String>,
}

/// Registry answering from mount paths alone
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    rules: RuleSet,
    mounts: Vec<Mount>,
}

impl StaticRegistry {
    /// Compile `config`, expanding bracketed mounts up to `limit` aliases each
    pub fn new(config: &RegistryConfig, limit: usize) -> Result<Self> {
        let rules = RuleSet::compile(config)?;
        let mut mounts = Vec::with_capacity(rules.len());
        for rule in &rules {
            mounts.push(Mount {
                rule: rule.index(),
                aliases: mount_aliases(rule, limit)?,
            });
        }
        Ok(Self { rules, mounts })
    }

    /// Compile with [`DEFAULT_EXPANSION_LIMIT`]
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Self::new(config, DEFAULT_EXPANSION_LIMIT)
    }

    fn rule(&self, index: usize) -> Option<&Rule> {
        self.rules.rules().get(index)
    }

    fn list_by_path(&self, path: &str, unique: bool) -> Result<Vec<ProviderDescriptor>> {
        let query = clean_path(path);
        let mut below: IndexMap<usize, Vec<String>> = IndexMap::new();
        let mut deepest: Option<(usize, String)> = None;

        for mount in &self.mounts {
            for alias in &mount.aliases {
                match classify(&query, alias) {
                    Relation::Exact | Relation::Ancestor => {
                        if deepest.as_ref().map_or(true, |(_, d)| alias.len() > d.len()) {
                            deepest = Some((mount.rule, alias.clone()));
                        }
                        if !unique && alias == &query {
                            below.entry(mount.rule).or_default().push(alias.clone());
                        }
                    }
                    Relation::Descendant if !unique => {
                        below.entry(mount.rule).or_default().push(alias.clone());
                    }
                    Relation::Descendant | Relation::Unrelated => {}
                }
            }
        }

        let mut matched = if unique { IndexMap::new() } else { below };
        if let Some((rule, alias)) = deepest {
            let paths = matched.entry(rule).or_default();
            if !paths.contains(&alias) {
                paths.push(alias);
            }
        }
        if matched.is_empty() {
            return Err(RegistryError::not_found(format!(
                "no mount covers path {query}"
            )));
        }

        let mut descriptors: IndexMap<&str, Vec<String>> = IndexMap::new();
        for (index, paths) in matched {
            if let Some(rule) = self.rule(index) {
                descriptors.entry(rule.address()).or_default().extend(paths);
            }
        }
        descriptors
            .into_iter()
            .map(|(address, paths)| {
                let mut descriptor = ProviderDescriptor::new(address);
                descriptor
                    .opaque
                    .insert(MOUNT_PATHS_KEY, encode_mount_paths(&paths)?);
                Ok(descriptor)
            })
            .collect()
    }

    fn list_by_id(&self, query: &ProviderQuery) -> Result<Vec<ProviderDescriptor>> {
        let space_id = query
            .space_id()
            .ok_or_else(|| RegistryError::internal("resource query without an id"))?;
        self.rules
            .iter()
            .find(|rule| rule.space_id() == Some(&space_id))
            .map(|rule| vec![ProviderDescriptor::new(rule.address())])
            .ok_or_else(|| RegistryError::not_found(format!("no mount pinned to {space_id}")))
    }
}

fn mount_aliases(rule: &Rule, limit: usize) -> Result<Vec<String>> {
    let mount = if has_character_class(rule.mount_path()) {
        rule.mount_path()
    } else {
        rule.template().static_prefix()
    };
    Ok(expand_character_classes(mount, limit)?
        .into_iter()
        .map(|alias| clean_path(&alias))
        .collect())
}

#[async_trait]
impl Registry for StaticRegistry {
    #[instrument(skip(self, ctx))]
    async fn list_providers(
        &self,
        ctx: &RequestContext,
        query: &ProviderQuery,
    ) -> Result<Vec<ProviderDescriptor>> {
        if ctx.is_done() {
            return Err(ctx.done().await);
        }
        match query {
            ProviderQuery::Path { path, unique } => {
                let path = self.rules.rewrite_home(path, ctx.user())?;
                self.list_by_path(&path, *unique)
            }
            ProviderQuery::Resource { .. } => self.list_by_id(query),
            ProviderQuery::Empty => {
                debug!("no recognized filter, nothing to resolve");
                Ok(Vec::new())
            }
        }
    }

    #[instrument(skip(self, ctx, space), fields(space_id = %space.id))]
    async fn get_provider(
        &self,
        ctx: &RequestContext,
        space: &Space,
    ) -> Result<ProviderDescriptor> {
        if ctx.is_done() {
            return Err(ctx.done().await);
        }
        self.rules
            .find_placement(space)
            .map(|rule| ProviderDescriptor::new(rule.address()))
            .ok_or_else(|| {
                RegistryError::not_found(format!("no rule accepts a {} space", space.space_type))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawRule;
    use crate::encoding::DescriptorExt;
    use assert_matches::assert_matches;

    fn registry() -> StaticRegistry {
        StaticRegistry::from_config(&RegistryConfig {
            rules: vec![
                RawRule::new("root:1", "/"),
                RawRule::new("users-a:1", "/users/[a-k]"),
                RawRule::new("users-b:1", "/users/[l-z]"),
                RawRule::new("projects:1", "/projects")
                    .with_template("/projects/{{.Space.Name}}"),
                RawRule::new("pinned:1", "/pinned").with_space_id("s1$x"),
            ],
            ..RegistryConfig::default()
        })
        .unwrap()
    }

    async fn list(registry: &StaticRegistry, path: &str) -> Result<Vec<ProviderDescriptor>> {
        registry
            .list_providers(&RequestContext::new(), &ProviderQuery::path(path))
            .await
    }

    #[tokio::test]
    async fn test_parent_of_sharded_mount_lists_aliases() {
        let registry = registry();
        let descriptors = list(&registry, "/users").await.unwrap();
        let addresses: Vec<_> = descriptors.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(addresses, vec!["users-a:1", "users-b:1", "root:1"]);
        let aliases = descriptors[0].mount_paths().unwrap();
        assert_eq!(aliases.len(), 11);
        assert_eq!(aliases[0], "/users/a");
    }

    #[tokio::test]
    async fn test_inner_path_uses_deepest_mount() {
        let registry = registry();
        let descriptors = list(&registry, "/users/m/marie/docs").await;
        let descriptors = descriptors.unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].address, "users-b:1");
        assert_eq!(descriptors[0].mount_paths().unwrap(), vec!["/users/m"]);
    }

    #[tokio::test]
    async fn test_template_prefix_used_as_mount() {
        let registry = registry();
        let descriptors = list(&registry, "/projects/apollo").await.unwrap();
        assert_eq!(descriptors[0].address, "projects:1");
    }

    #[tokio::test]
    async fn test_id_lookup_uses_pinned_rules() {
        let registry = registry();
        let ctx = RequestContext::new();
        let found = registry
            .list_providers(&ctx, &ProviderQuery::resource("s1", "x"))
            .await
            .unwrap();
        assert_eq!(found[0].address, "pinned:1");
        assert_matches!(
            registry
                .list_providers(&ctx, &ProviderQuery::resource("s1", "y"))
                .await,
            Err(RegistryError::NotFound { .. })
        );
    }

    #[test]
    fn test_expansion_limit_applies() {
        let result = StaticRegistry::new(
            &RegistryConfig {
                rules: vec![RawRule::new("a:1", "/[a-z]/[a-z]")],
                ..RegistryConfig::default()
            },
            100,
        );
        assert_matches!(result, Err(RegistryError::Invalid { .. }));
    }
}
