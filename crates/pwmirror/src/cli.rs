//! Clap derive structures for the `pwmirror` binary.

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pwmirror -- inspect and manipulate a media service's object graph
#[derive(Debug, Parser)]
#[command(
    name = "pwmirror",
    version,
    about = "Interactive console for a media service's remote objects",
    long_about = "Mirrors every object a media service announces and lets you inspect,\n\
        create, link, destroy and re-permission them from a line-oriented console.\n\n\
        Without a COMMAND, commands are read from standard input, one per line.\n\
        Type 'help' at the prompt for the command list."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Run a single console command, print its output and exit
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (defaults to the platform config dir)
    #[arg(long, short = 'c', env = "PWMIRROR_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Remote to connect to at startup (overrides `default_remote`)
    #[arg(long, short = 'r')]
    pub remote: Option<String>,

    /// Output format for object rendering
    #[arg(long, short = 'o')]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-indented text blocks
    Text,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

impl OutputFormat {
    /// Parse a validated config value.
    pub fn from_config(raw: &str) -> Self {
        <Self as ValueEnum>::from_str(raw, true).unwrap_or(Self::Text)
    }
}

impl ColorMode {
    pub fn from_config(raw: &str) -> Self {
        <Self as ValueEnum>::from_str(raw, true).unwrap_or(Self::Auto)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trailing_words_form_one_command() {
        let cli = Cli::parse_from(["pwmirror", "-o", "json", "info", "0"]);
        assert_eq!(cli.command, ["info", "0"]);
        assert_eq!(cli.global.output, Some(OutputFormat::Json));
    }

    #[test]
    fn config_values_map_to_enums() {
        assert_eq!(OutputFormat::from_config("yaml"), OutputFormat::Yaml);
        assert_eq!(ColorMode::from_config("never"), ColorMode::Never);
        assert_eq!(ColorMode::from_config("bogus"), ColorMode::Auto);
    }
}
