//! Space-aware registry
//!
//! Resolves a path or a resource id by asking every eligible provider for
//! its spaces, rendering each space's path through the owning rule's
//! template and classifying the result against the query.
//!
//! Provider calls run concurrently, bounded by `max_concurrency`. Answers
//! are joined in rule declaration order before classification, so the
//! outcome does not depend on which provider answers first. A provider that
//! fails only shrinks the result, even with its own deadline error. The
//! request's cancellation or expired deadline aborts the whole resolution.

use crate::cache::{CachingConnector, SpaceCache};
use crate::config::RegistryConfig;
use crate::encoding::{encode_space_paths, group_by_address};
use crate::rules::{Rule, RuleSet};
use crate::selection::{Candidate, PathSelector};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use spacereg_core::{
    filters_accept, ProviderConnector, ProviderDescriptor, ProviderQuery, Registry,
    RegistryError, RequestContext, Result, Space, SpaceFilter, SpaceId,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Registry resolving queries against live provider state
#[derive(Clone)]
pub struct SpaceRegistry {
    rules: Arc<RuleSet>,
    connector: Arc<dyn ProviderConnector>,
    max_concurrency: usize,
    rpc_timeout: Option<Duration>,
}

impl SpaceRegistry {
    /// Compile `config` and resolve through `connector`
    ///
    /// With the cache enabled, every client handed out by `connector` is
    /// wrapped in a shared [`SpaceCache`].
    pub fn new(config: &RegistryConfig, connector: Arc<dyn ProviderConnector>) -> Result<Self> {
        let rules = RuleSet::compile(config)?;
        let connector: Arc<dyn ProviderConnector> = if config.cache.enabled {
            let cache = Arc::new(SpaceCache::new(config.cache.capacity, config.cache.ttl()));
            Arc::new(CachingConnector::new(connector, cache))
        } else {
            connector
        };
        Ok(Self::from_rules(rules, connector)
            .with_max_concurrency(config.max_concurrency)
            .with_rpc_timeout(config.rpc_timeout()))
    }

    /// Resolve with an already compiled rule set
    pub fn from_rules(rules: RuleSet, connector: Arc<dyn ProviderConnector>) -> Self {
        Self {
            rules: Arc::new(rules),
            connector,
            max_concurrency: 0,
            rpc_timeout: None,
        }
    }

    /// Bound concurrent provider calls; 0 means one per rule
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Give up on a single provider after `timeout`
    pub fn with_rpc_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// The compiled rules
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    fn concurrency_limit(&self, jobs: usize) -> usize {
        match self.max_concurrency {
            0 => jobs.max(1),
            limit => limit,
        }
    }

    /// Query one rule's provider
    ///
    /// Provider failures are logged and yield no spaces, including a
    /// provider's own deadline. Errors propagate only once the request
    /// itself is cancelled or past its deadline.
    async fn query_rule(
        &self,
        ctx: &RequestContext,
        rule: &Rule,
        filters: &[SpaceFilter],
    ) -> Result<Vec<Space>> {
        let address = rule.address();
        debug!(rule = rule.index(), address, ?filters, "querying provider");

        let answer = match self.connector.connect(address) {
            Ok(client) => {
                let call = client.list_storage_spaces(ctx, filters);
                match self.rpc_timeout {
                    Some(timeout) => tokio::time::timeout(timeout, call)
                        .await
                        .unwrap_or_else(|_| {
                            Err(RegistryError::provider_unavailable(
                                address,
                                format!("no answer within {timeout:?}"),
                            ))
                        }),
                    None => call.await,
                }
            }
            Err(err) => Err(err),
        };

        match answer.and_then(|response| response.into_spaces(address)) {
            Ok(spaces) => {
                let before = spaces.len();
                let spaces: Vec<Space> = spaces
                    .into_iter()
                    .filter(|space| filters_accept(filters, space))
                    .collect();
                if spaces.len() != before {
                    warn!(
                        rule = rule.index(),
                        address,
                        dropped = before - spaces.len(),
                        "provider returned spaces outside the requested filters"
                    );
                }
                Ok(spaces)
            }
            Err(err) if err.is_request_fatal() && ctx.is_done() => Err(ctx.done().await),
            Err(err) => {
                warn!(rule = rule.index(), address, error = %err, "provider unavailable");
                Ok(Vec::new())
            }
        }
    }

    /// Query every job concurrently; answers come back in job order
    async fn fan_out<'a>(
        &'a self,
        ctx: &'a RequestContext,
        jobs: Vec<(&'a Rule, Vec<SpaceFilter>)>,
    ) -> Result<Vec<(&'a Rule, Vec<Space>)>> {
        let limit = self.concurrency_limit(jobs.len());
        let futures: Vec<BoxFuture<'a, Result<(&'a Rule, Vec<Space>)>>> = jobs
            .into_iter()
            .map(
                |(rule, filters)| -> BoxFuture<'a, Result<(&'a Rule, Vec<Space>)>> {
                    async move {
                        let spaces = self.query_rule(ctx, rule, &filters).await?;
                        Ok((rule, spaces))
                    }
                    .boxed()
                },
            )
            .collect();
        let queries = stream::iter(futures)
        .buffered(limit)
        .try_collect::<Vec<_>>();
        ctx.run(queries).await
    }

    async fn list_by_path(
        &self,
        ctx: &RequestContext,
        path: &str,
        unique: bool,
    ) -> Result<Vec<ProviderDescriptor>> {
        let user = ctx.user();
        let path = self.rules.rewrite_home(path, user)?;

        let jobs = self
            .rules
            .iter()
            .filter(|rule| rule.allows_user_agent(ctx.user_agent()))
            .filter_map(|rule| match rule.space_filters(user) {
                Some(filters) => Some((rule, filters)),
                None => {
                    debug!(rule = rule.index(), "owner-bound rule skipped without a user");
                    None
                }
            })
            .collect();
        let answers = self.fan_out(ctx, jobs).await?;

        let mut selector = PathSelector::new(&path, unique);
        for (rule, spaces) in answers {
            for space in spaces {
                match rule.render(user, &space) {
                    Ok(resolved) => {
                        let relation = selector.offer(rule.address(), space, &resolved);
                        debug!(rule = rule.index(), path = %resolved, ?relation, "classified space");
                    }
                    Err(err) => warn!(
                        rule = rule.index(),
                        address = rule.address(),
                        space_id = %space.id,
                        error = %err,
                        "path template evaluation failed"
                    ),
                }
            }
        }

        let selected = selector.finish();
        if selected.is_empty() {
            return Err(RegistryError::not_found(format!(
                "no provider serves path {path}"
            )));
        }
        group_by_address(selected)
    }

    async fn list_by_id(
        &self,
        ctx: &RequestContext,
        space_id: SpaceId,
    ) -> Result<Vec<ProviderDescriptor>> {
        let user = ctx.user();
        let jobs = self
            .rules
            .iter()
            .filter(|rule| rule.allows_user_agent(ctx.user_agent()))
            .filter_map(|rule| rule.id_filters(&space_id).map(|filters| (rule, filters)))
            .collect();
        let answers = self.fan_out(ctx, jobs).await?;

        let mut found: Option<Candidate> = None;
        for (rule, spaces) in answers {
            let Some(space) = spaces.into_iter().next() else {
                continue;
            };
            if found.is_some() {
                debug!(
                    rule = rule.index(),
                    address = rule.address(),
                    "space also served by a later rule, ignored"
                );
                continue;
            }
            match rule.render(user, &space) {
                Ok(path) => {
                    found = Some(Candidate {
                        address: rule.address().to_string(),
                        space,
                        path,
                    });
                }
                Err(err) => warn!(
                    rule = rule.index(),
                    address = rule.address(),
                    space_id = %space.id,
                    error = %err,
                    "path template evaluation failed"
                ),
            }
        }

        match found {
            Some(candidate) => group_by_address(vec![candidate]),
            None => Err(RegistryError::not_found(format!(
                "no provider serves space {space_id}"
            ))),
        }
    }
}

impl std::fmt::Debug for SpaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpaceRegistry")
            .field("rules", &self.rules.len())
            .field("max_concurrency", &self.max_concurrency)
            .field("rpc_timeout", &self.rpc_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Registry for SpaceRegistry {
    #[instrument(skip(self, ctx), fields(user = ctx.user().map(|u| u.username.as_str())))]
    async fn list_providers(
        &self,
        ctx: &RequestContext,
        query: &ProviderQuery,
    ) -> Result<Vec<ProviderDescriptor>> {
        match query {
            ProviderQuery::Path { path, unique } => self.list_by_path(ctx, path, *unique).await,
            ProviderQuery::Resource { .. } => {
                let space_id = query
                    .space_id()
                    .ok_or_else(|| RegistryError::internal("resource query without an id"))?;
                self.list_by_id(ctx, space_id).await
            }
            ProviderQuery::Empty => {
                debug!("no recognized filter, nothing to resolve");
                Ok(Vec::new())
            }
        }
    }

    #[instrument(skip(self, ctx, space), fields(space_id = %space.id, space_type = %space.space_type))]
    async fn get_provider(
        &self,
        ctx: &RequestContext,
        space: &Space,
    ) -> Result<ProviderDescriptor> {
        if ctx.is_done() {
            return Err(ctx.done().await);
        }
        let rule = self.rules.find_placement(space).ok_or_else(|| {
            RegistryError::not_found(format!(
                "no rule accepts a {} space",
                space.space_type
            ))
        })?;
        debug!(rule = rule.index(), address = rule.address(), "placement rule found");

        let mut descriptor = ProviderDescriptor::new(rule.address());
        if !space.root.storage_id.is_empty() {
            descriptor.provider_id = Some(space.root.storage_id.clone());
        }
        match rule.render(ctx.user(), space) {
            Ok(path) => {
                let paths = BTreeMap::from([(space.id.clone(), path)]);
                descriptor
                    .opaque
                    .insert(crate::encoding::SPACE_PATHS_KEY, encode_space_paths(&paths)?);
            }
            Err(err) => debug!(error = %err, "placement path not rendered"),
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawRule;
    use crate::encoding::DescriptorExt;
    use assert_matches::assert_matches;
    use spacereg_testkit::{
        personal_space, project_space, test_user, ConnectorBuilder, IgnoringFiltersProvider,
    };

    fn registry(rules: Vec<RawRule>, connector: Arc<dyn ProviderConnector>) -> SpaceRegistry {
        let config = RegistryConfig {
            rules,
            ..RegistryConfig::default()
        };
        SpaceRegistry::new(&config, connector).unwrap()
    }

    #[tokio::test]
    async fn test_empty_query_is_empty_result() {
        let registry = registry(vec![], ConnectorBuilder::new().build());
        let result = registry
            .list_providers(&RequestContext::new(), &ProviderQuery::Empty)
            .await;
        assert_eq!(result, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_home_alias_resolves_to_user_home() {
        let connector = ConnectorBuilder::new()
            .memory("users:1", vec![personal_space("marie"), personal_space("zoe")])
            .build();
        let registry = registry(
            vec![RawRule::new("users:1", "/users")
                .with_template("/users/{{.Space.Owner.Username}}")
                .with_space_type("personal")],
            connector,
        );
        let ctx = RequestContext::new().with_user(test_user("marie"));
        let descriptors = registry
            .list_providers(&ctx, &ProviderQuery::path("/home/Documents"))
            .await
            .unwrap();
        assert_eq!(descriptors.len(), 1);
        let paths = descriptors[0].space_paths().unwrap();
        assert_eq!(paths.values().collect::<Vec<_>>(), vec!["/users/marie"]);
    }

    #[tokio::test]
    async fn test_owner_bound_rule_needs_user() {
        let connector = ConnectorBuilder::new()
            .memory("users:1", vec![personal_space("marie")])
            .build();
        let registry = registry(
            vec![RawRule::new("users:1", "/users")
                .with_template("/users/{{.Space.Owner.Username}}")
                .owned_by_requester()],
            connector,
        );
        let anonymous = registry
            .list_providers(&RequestContext::new(), &ProviderQuery::path("/users"))
            .await;
        assert_matches!(anonymous, Err(RegistryError::NotFound { .. }));

        let ctx = RequestContext::new().with_user(test_user("marie"));
        let found = registry
            .list_providers(&ctx, &ProviderQuery::path("/users"))
            .await
            .unwrap();
        assert_eq!(found[0].address, "users:1");
    }

    #[tokio::test]
    async fn test_owner_bound_rule_drops_foreign_spaces() {
        // Backend answers with every space regardless of the owner filter
        let connector = ConnectorBuilder::new()
            .client(
                "users:1",
                Arc::new(IgnoringFiltersProvider::new(vec![
                    personal_space("marie"),
                    personal_space("zoe"),
                ])),
            )
            .build();
        let registry = registry(
            vec![RawRule::new("users:1", "/users")
                .with_template("/users/{{.Space.Owner.Username}}")
                .owned_by_requester()],
            connector,
        );
        let ctx = RequestContext::new().with_user(test_user("marie"));
        let found = registry
            .list_providers(&ctx, &ProviderQuery::path("/users"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        let paths = found[0].space_paths().unwrap();
        assert_eq!(paths.values().collect::<Vec<_>>(), vec!["/users/marie"]);

        let zoe = RequestContext::new().with_user(test_user("zoe"));
        let found = registry
            .list_providers(&zoe, &ProviderQuery::path("/users/zoe"))
            .await
            .unwrap();
        let paths = found[0].space_paths().unwrap();
        assert_eq!(paths.values().collect::<Vec<_>>(), vec!["/users/zoe"]);
    }

    #[tokio::test]
    async fn test_user_agent_gates_rules() {
        let connector = ConnectorBuilder::new()
            .memory("sync:1", vec![project_space("p1", "Apollo")])
            .build();
        let registry = registry(
            vec![RawRule::new("sync:1", "/sync").with_user_agents(["desktop"])],
            connector,
        );
        let web = RequestContext::new().with_user_agent("web");
        assert_matches!(
            registry.list_providers(&web, &ProviderQuery::path("/sync")).await,
            Err(RegistryError::NotFound { .. })
        );
        let desktop = RequestContext::new().with_user_agent("desktop");
        assert!(registry
            .list_providers(&desktop, &ProviderQuery::path("/sync"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_get_provider_reports_placement_path() {
        let registry = registry(
            vec![RawRule::new("users:1", "/users/[a-m]")
                .with_template("/users/{{.Space.Owner.Username}}")
                .with_space_type("personal")],
            ConnectorBuilder::new().build(),
        );
        let descriptor = registry
            .get_provider(&RequestContext::new(), &personal_space("marie"))
            .await
            .unwrap();
        assert_eq!(descriptor.address, "users:1");
        assert_eq!(descriptor.provider_id.as_deref(), Some("storage-1"));
        let paths = descriptor.space_paths().unwrap();
        assert_eq!(paths.values().next().map(String::as_str), Some("/users/marie"));

        assert_matches!(
            registry
                .get_provider(&RequestContext::new(), &personal_space("zoe"))
                .await,
            Err(RegistryError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let registry = registry(vec![], ConnectorBuilder::new().build());
        let (ctx, handle) = RequestContext::cancellable();
        handle.cancel();
        assert_matches!(
            registry.list_providers(&ctx, &ProviderQuery::path("/")).await,
            Err(RegistryError::Cancelled)
        );
        assert_matches!(
            registry.get_provider(&ctx, &project_space("p", "P")).await,
            Err(RegistryError::Cancelled)
        );
    }
}
