//! `spacereg expand`: show the aliases a bracketed mount stands for

use anyhow::Result;
use clap::Args;
use spacereg_registry::{expand_character_classes, DEFAULT_EXPANSION_LIMIT};

/// Arguments of `expand`
#[derive(Debug, Clone, Args)]
pub struct ExpandArgs {
    /// Pattern such as `/users/[a-k]`
    pub pattern: String,

    /// Maximum number of aliases
    #[arg(short, long, default_value_t = DEFAULT_EXPANSION_LIMIT)]
    pub limit: usize,
}

/// One alias per line
pub fn run(args: &ExpandArgs) -> Result<String> {
    Ok(expand_character_classes(&args.pattern, args.limit)?.join("\n"))
}
