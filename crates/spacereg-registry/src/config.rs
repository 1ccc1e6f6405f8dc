//! Registry configuration
//!
//! Loaded once at startup from TOML. Environment variables prefixed with
//! `SPACEREG_` override a few global settings. Validation compiles every
//! rule, so a configuration that validates will also build a [`RuleSet`].
//!
//! [`RuleSet`]: crate::rules::RuleSet

use serde::{Deserialize, Serialize};
use spacereg_core::{RegistryError, Result};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Environment variable overriding [`RegistryConfig::home_template`]
pub const ENV_HOME_TEMPLATE: &str = "SPACEREG_HOME_TEMPLATE";
/// Environment variable overriding [`RegistryConfig::max_concurrency`]
pub const ENV_MAX_CONCURRENCY: &str = "SPACEREG_MAX_CONCURRENCY";
/// Environment variable overriding [`RegistryConfig::rpc_timeout_ms`]
pub const ENV_RPC_TIMEOUT_MS: &str = "SPACEREG_RPC_TIMEOUT_MS";

/// One provider/mount entry as written in the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRule {
    /// Provider address
    pub address: String,
    /// Mount path pattern (regular expression, matched from the start)
    #[serde(default)]
    pub mount_path: String,
    /// Path template; the mount path is reused when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_template: Option<String>,
    /// Only spaces of this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_type: Option<String>,
    /// Only spaces owned by the requesting user
    #[serde(default)]
    pub space_owner_self: bool,
    /// Only the space with this id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    /// Client classes allowed to use this rule; empty allows all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_user_agents: Vec<String>,
}

impl RawRule {
    /// Rule with a static mount
    pub fn new(address: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            mount_path: mount_path.into(),
            ..Self::default()
        }
    }

    /// Set the path template
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.path_template = Some(template.into());
        self
    }

    /// Restrict to a space type
    pub fn with_space_type(mut self, space_type: impl Into<String>) -> Self {
        self.space_type = Some(space_type.into());
        self
    }

    /// Restrict to spaces owned by the requester
    pub fn owned_by_requester(mut self) -> Self {
        self.space_owner_self = true;
        self
    }

    /// Restrict to one space id
    pub fn with_space_id(mut self, space_id: impl Into<String>) -> Self {
        self.space_id = Some(space_id.into());
        self
    }

    /// Restrict to some user agents
    pub fn with_user_agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_user_agents = agents.into_iter().map(Into::into).collect();
        self
    }
}

/// Result cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache provider answers; off keeps every resolution live
    pub enabled: bool,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
    /// Maximum number of cached answers
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 30,
            capacity: 1024,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Complete registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Template producing the current user's home path
    pub home_template: String,
    /// Path prefix rewritten onto the home path
    pub home_alias: String,
    /// Address of the catch-all rule used when no rules are configured
    pub default_address: String,
    /// Bound of concurrent provider calls; 0 means one per rule
    pub max_concurrency: usize,
    /// Per-call timeout in milliseconds, on top of the request deadline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_timeout_ms: Option<u64>,
    /// Result cache
    pub cache: CacheConfig,
    /// Provider rules in declaration order
    pub rules: Vec<RawRule>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            home_template: "/users/{{.CurrentUser.Username}}".to_string(),
            home_alias: "/home".to_string(),
            default_address: "localhost:9154".to_string(),
            max_concurrency: 0,
            rpc_timeout_ms: None,
            cache: CacheConfig::default(),
            rules: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| RegistryError::config(format!("invalid TOML: {e}")))
    }

    /// Load a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&text)?;
        info!(
            path = %path.display(),
            rules = config.rules.len(),
            "loaded registry configuration"
        );
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RegistryError::serialization(e.to_string()))
    }

    /// Apply `SPACEREG_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `SPACEREG_*` overrides from the given variables
    pub fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                ENV_HOME_TEMPLATE => self.home_template = value,
                ENV_MAX_CONCURRENCY => {
                    self.max_concurrency = value.parse().map_err(|e| {
                        RegistryError::config(format!("{ENV_MAX_CONCURRENCY}: {e}"))
                    })?;
                }
                ENV_RPC_TIMEOUT_MS => {
                    let ms: u64 = value.parse().map_err(|e| {
                        RegistryError::config(format!("{ENV_RPC_TIMEOUT_MS}: {e}"))
                    })?;
                    self.rpc_timeout_ms = (ms > 0).then_some(ms);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Per-call timeout
    pub fn rpc_timeout(&self) -> Option<Duration> {
        self.rpc_timeout_ms.map(Duration::from_millis)
    }

    /// Check every rule and template, reporting all problems at once
    pub fn validate(&self) -> Result<()> {
        crate::rules::RuleSet::compile(self).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE: &str = r#"
        home_template = "/users/{{.CurrentUser.Id.OpaqueId}}"
        max_concurrency = 4

        [cache]
        enabled = true
        ttl_secs = 10

        [[rules]]
        address = "users-a:9000"
        mount_path = "/users/[a-k]"
        path_template = "/users/{{.Space.Owner.Username}}"
        space_type = "personal"

        [[rules]]
        address = "projects:9000"
        mount_path = "/projects"
        path_template = "/projects/{{.Space.Name}}"
        space_type = "project"
        allowed_user_agents = ["desktop"]
    "#;

    #[test]
    fn test_parse_sample() {
        let config = RegistryConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.max_concurrency, 4);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.capacity, 1024);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[1].allowed_user_agents, vec!["desktop"]);
        assert_eq!(config.home_alias, "/home");
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = RegistryConfig::from_toml_str("homes = 1").unwrap_err();
        assert_matches!(err, RegistryError::Config { .. });
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RegistryConfig::default();
        config
            .merge_with_vars([
                (ENV_HOME_TEMPLATE.to_string(), "/h/{{.CurrentUser.Username}}".to_string()),
                (ENV_MAX_CONCURRENCY.to_string(), "3".to_string()),
                (ENV_RPC_TIMEOUT_MS.to_string(), "250".to_string()),
                ("PATH".to_string(), "/bin".to_string()),
            ])
            .unwrap();
        assert_eq!(config.home_template, "/h/{{.CurrentUser.Username}}");
        assert_eq!(config.max_concurrency, 3);
        assert_eq!(config.rpc_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = RegistryConfig::default();
        let err = config
            .merge_with_vars([(ENV_MAX_CONCURRENCY.to_string(), "many".to_string())])
            .unwrap_err();
        assert_matches!(err, RegistryError::Config { .. });
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = RegistryConfig::load_from_file(&path).unwrap();
        assert_eq!(config.rules[0].address, "users-a:9000");

        let missing = RegistryConfig::load_from_file(&dir.path().join("nope.toml"));
        assert_matches!(missing, Err(RegistryError::Config { .. }));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RegistryConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(RegistryConfig::from_toml_str(&text).unwrap(), config);
    }
}
