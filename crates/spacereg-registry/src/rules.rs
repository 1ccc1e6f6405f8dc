//! Compiled rule set
//!
//! A [`RuleSet`] is built once from a [`RegistryConfig`] and never changes
//! afterwards, so it is shared across concurrent resolutions without locks.

use crate::config::{RawRule, RegistryConfig};
use crate::selection::{clean_path, strip_path_prefix};
use regex::Regex;
use spacereg_core::{RegistryError, Result, Space, SpaceFilter, SpaceId, User};
use spacereg_template::{PathTemplate, TemplateError};
use std::collections::BTreeSet;
use std::fmt;

/// One provider/mount entry, ready for matching
#[derive(Debug, Clone)]
pub struct Rule {
    index: usize,
    address: String,
    space_type: Option<String>,
    space_owner_self: bool,
    space_id: Option<SpaceId>,
    mount_path: String,
    mount_pattern: Regex,
    template: PathTemplate,
    allowed_user_agents: BTreeSet<String>,
}

impl Rule {
    fn compile(index: usize, raw: &RawRule) -> std::result::Result<Self, Vec<String>> {
        let mut problems = Vec::new();
        if raw.address.trim().is_empty() {
            problems.push("address is empty".to_string());
        }

        let template_source = raw
            .path_template
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&raw.mount_path);
        if template_source.is_empty() {
            problems.push("mount_path or path_template is required".to_string());
        }
        let template = match PathTemplate::compile(template_source) {
            Ok(template) => Some(template),
            Err(err) => {
                problems.push(format!("path template: {err}"));
                None
            }
        };

        let mount_source = match (&template, raw.mount_path.is_empty()) {
            (Some(template), true) => regex::escape(template.static_prefix()),
            _ => raw.mount_path.clone(),
        };
        let mount_pattern = match Regex::new(&format!("^(?:{mount_source})")) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                problems.push(format!("mount_path is not a valid pattern: {err}"));
                None
            }
        };

        match (template, mount_pattern) {
            (Some(template), Some(mount_pattern)) if problems.is_empty() => Ok(Self {
                index,
                address: raw.address.clone(),
                space_type: raw.space_type.clone().filter(|t| !t.is_empty()),
                space_owner_self: raw.space_owner_self,
                space_id: raw
                    .space_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .map(SpaceId::from),
                mount_path: mount_source,
                mount_pattern,
                template,
                allowed_user_agents: raw.allowed_user_agents.iter().cloned().collect(),
            }),
            _ => Err(problems),
        }
    }

    /// Catch-all rule serving everything from `address`
    fn catch_all(address: &str) -> std::result::Result<Self, Vec<String>> {
        Self::compile(0, &RawRule::new(address, "/"))
    }

    /// Position in declaration order
    pub fn index(&self) -> usize {
        self.index
    }

    /// Provider address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Required space type, if any
    pub fn space_type(&self) -> Option<&str> {
        self.space_type.as_deref()
    }

    /// True when only the requester's own spaces qualify
    pub fn space_owner_self(&self) -> bool {
        self.space_owner_self
    }

    /// Required space id, if any
    pub fn space_id(&self) -> Option<&SpaceId> {
        self.space_id.as_ref()
    }

    /// Mount pattern source
    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    /// Compiled path template
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Allowed user agents; empty allows every client
    pub fn allowed_user_agents(&self) -> &BTreeSet<String> {
        &self.allowed_user_agents
    }

    /// Provider-side filters for a path query
    ///
    /// `None` when the rule cannot apply, which happens for owner-bound rules
    /// without a requesting user.
    pub fn space_filters(&self, user: Option<&User>) -> Option<Vec<SpaceFilter>> {
        let mut filters = Vec::new();
        if self.space_owner_self {
            filters.push(SpaceFilter::Owner(user?.id.clone()));
        }
        if let Some(space_type) = &self.space_type {
            filters.push(SpaceFilter::SpaceType(space_type.clone()));
        }
        if let Some(space_id) = &self.space_id {
            filters.push(SpaceFilter::Id(space_id.clone()));
        }
        Some(filters)
    }

    /// Provider-side filters for an id query
    ///
    /// `None` when the rule is pinned to a different space.
    pub fn id_filters(&self, id: &SpaceId) -> Option<Vec<SpaceFilter>> {
        if self.space_id.as_ref().is_some_and(|pinned| pinned != id) {
            return None;
        }
        let mut filters = vec![SpaceFilter::Id(id.clone())];
        if let Some(space_type) = &self.space_type {
            filters.push(SpaceFilter::SpaceType(space_type.clone()));
        }
        Some(filters)
    }

    /// True when a client with `user_agent` may use this rule
    pub fn allows_user_agent(&self, user_agent: Option<&str>) -> bool {
        self.allowed_user_agents.is_empty()
            || user_agent.is_some_and(|agent| self.allowed_user_agents.contains(agent))
    }

    /// True when the rule's type filter accepts `space_type`
    pub fn accepts_type(&self, space_type: &str) -> bool {
        self.space_type.as_deref().map_or(true, |t| t == space_type)
    }

    /// True when `path` falls under the mount pattern
    pub fn mount_matches(&self, path: &str) -> bool {
        self.mount_pattern.is_match(path)
    }

    /// Evaluate the path template for `(user, space)`
    pub fn render(&self, user: Option<&User>, space: &Space) -> std::result::Result<String, TemplateError> {
        self.template.render_space(user, space)
    }

    /// True when a new `space` may be placed through this rule
    ///
    /// Owned spaces must render, without a requesting user, to a path under
    /// the mount pattern. Unowned spaces only need a matching type.
    pub fn accepts_placement(&self, space: &Space) -> bool {
        if !self.accepts_type(&space.space_type) {
            return false;
        }
        if space.owner.is_none() {
            return true;
        }
        self.render(None, space)
            .is_ok_and(|path| self.mount_matches(&path))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} -> {}", self.index, self.mount_path, self.address)
    }
}

/// Immutable, validated set of rules plus the home settings
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    home_template: PathTemplate,
    home_alias: String,
}

impl RuleSet {
    /// Compile every rule, reporting all problems in one error
    ///
    /// An empty rule list yields a single catch-all rule at `/` served by
    /// the configured default address.
    pub fn compile(config: &RegistryConfig) -> Result<Self> {
        let mut problems = Vec::new();

        let home_template = match PathTemplate::compile(&config.home_template) {
            Ok(template) => Some(template),
            Err(err) => {
                problems.push(format!("home_template: {err}"));
                None
            }
        };
        if !config.home_alias.starts_with('/') {
            problems.push(format!(
                "home_alias must be an absolute path, got '{}'",
                config.home_alias
            ));
        }

        let mut rules = Vec::with_capacity(config.rules.len().max(1));
        for (index, raw) in config.rules.iter().enumerate() {
            match Rule::compile(index, raw) {
                Ok(rule) => rules.push(rule),
                Err(errs) => problems.extend(
                    errs.into_iter()
                        .map(|e| format!("rule {index} ({}): {e}", raw.address)),
                ),
            }
        }
        if config.rules.is_empty() {
            match Rule::catch_all(&config.default_address) {
                Ok(rule) => rules.push(rule),
                Err(errs) => problems.extend(errs.into_iter().map(|e| format!("default rule: {e}"))),
            }
        }

        match home_template {
            Some(home_template) if problems.is_empty() => Ok(Self {
                rules,
                home_template,
                home_alias: clean_path(&config.home_alias),
            }),
            _ => Err(RegistryError::config(problems.join("; "))),
        }
    }

    /// Rules in declaration order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Iterate rules in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always false once compiled; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Template producing a user's home path
    pub fn home_template(&self) -> &PathTemplate {
        &self.home_template
    }

    /// Alias rewritten onto the home path
    pub fn home_alias(&self) -> &str {
        &self.home_alias
    }

    /// Evaluate the home template for `user`
    pub fn home_path(&self, user: &User) -> Result<String> {
        self.home_template
            .render_user(user)
            .map(|path| clean_path(&path))
            .map_err(RegistryError::from)
    }

    /// Clean `path` and rewrite the home alias onto the user's home path
    ///
    /// Without a user the alias has no meaning and the path stays as is.
    pub fn rewrite_home(&self, path: &str, user: Option<&User>) -> Result<String> {
        let path = clean_path(path);
        let (Some(user), Some(rest)) = (user, strip_path_prefix(&self.home_alias, &path)) else {
            return Ok(path);
        };
        let home = self.home_path(user)?;
        Ok(clean_path(&format!("{home}{rest}")))
    }

    /// First rule a new space may be placed through
    pub fn find_placement(&self, space: &Space) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.accepts_placement(space))
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
