//! `spacereg check`: validate a configuration and print its rule table

use super::load_config;
use anyhow::Result;
use clap::Args;
use spacereg_registry::{RegistryConfig, RuleSet};
use std::fmt::Write;
use std::path::PathBuf;
use tracing::info;

/// Arguments of `check`
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Registry configuration file
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Validate and describe the configuration
pub fn run(args: &CheckArgs) -> Result<String> {
    let config = load_config(&args.config)?;
    describe(&config)
}

/// Compile `config` and render one line per rule
pub fn describe(config: &RegistryConfig) -> Result<String> {
    let rules = RuleSet::compile(config)?;
    info!(rules = rules.len(), "configuration is valid");

    let mut out = String::new();
    writeln!(
        out,
        "home: {} -> {}",
        rules.home_alias(),
        rules.home_template()
    )?;
    for rule in &rules {
        let mut filters = Vec::new();
        if let Some(space_type) = rule.space_type() {
            filters.push(format!("type={space_type}"));
        }
        if rule.space_owner_self() {
            filters.push("owner=self".to_string());
        }
        if let Some(space_id) = rule.space_id() {
            filters.push(format!("id={space_id}"));
        }
        if !rule.allowed_user_agents().is_empty() {
            let agents: Vec<&str> = rule.allowed_user_agents().iter().map(String::as_str).collect();
            filters.push(format!("agents={}", agents.join(",")));
        }
        writeln!(
            out,
            "{:>3}  {:<24} {:<32} {}  [{}]",
            rule.index(),
            rule.address(),
            rule.mount_path(),
            rule.template(),
            filters.join(" ")
        )?;
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacereg_registry::RawRule;

    #[test]
    fn test_describe_lists_rules() {
        let config = RegistryConfig {
            rules: vec![
                RawRule::new("users:9000", "/users/[a-k]")
                    .with_template("/users/{{.Space.Owner.Username}}")
                    .with_space_type("personal"),
                RawRule::new("sync:9000", "/sync").with_user_agents(["desktop"]),
            ],
            ..RegistryConfig::default()
        };
        let table = describe(&config).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("home: /home -> /users/"));
        assert!(lines[1].contains("users:9000"));
        assert!(lines[1].contains("type=personal"));
        assert!(lines[2].contains("agents=desktop"));
    }

    #[test]
    fn test_invalid_config_fails() {
        let config = RegistryConfig {
            rules: vec![RawRule::new("bad:1", "/x").with_template("/{{ nope }}")],
            ..RegistryConfig::default()
        };
        assert!(describe(&config).is_err());
    }

    #[test]
    fn test_run_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "[[rules]]\naddress = \"a:1\"\nmount_path = \"/a\"\n").unwrap();
        let table = run(&CheckArgs { config: path }).unwrap();
        assert!(table.contains("a:1"));
    }
}
