//! Command-line entry point.
//!
//! Loads a TOML configuration, builds the application context, loads and
//! validates every configured data source, and prints a JSON summary.
//!
//! # Lifecycle
//!
//! 1. **Config**: parse the file, apply `--trace-level` / `--theme` overrides
//! 2. **Tracing**: install the subscriber (stderr or the configured log file)
//! 3. **Context**: register built-in plugins and configured sources
//! 4. **Initialize**: run plugin `initialize` steps, fire `onInit`
//! 5. **Load**: load all sources concurrently, then validate them
//! 6. **Report**: print the summary as a JSON object
//!
//! Exits non-zero if any source failed to load.

#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;

use pamdash::observability::init_tracing;
use pamdash::{Config, DashboardSummary};

/// Load PAM analytics data sources and print a dashboard summary
#[derive(Parser)]
#[command(name = "pamdash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    config: PathBuf,

    /// Override the configured tracing level
    #[arg(long)]
    trace_level: Option<String>,

    /// Override the configured theme
    #[arg(long)]
    theme: Option<String>,

    /// Print compact JSON instead of pretty JSON
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::from_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(level) = cli.trace_level {
        config.trace_level = Some(level);
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }

    init_tracing(&config);
    tracing::debug!(config = %cli.config.display(), "starting pamdash");

    let mut context = pamdash::initialize(config);
    if !context.initialize() {
        tracing::warn!("some plugins failed to initialize and were disabled");
    }

    let loaded = context.load_all().await?;
    context.validate_all();

    println!("{}", render_summary(&context.summary(), cli.compact)?);

    if loaded.failed.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        for (source_id, error) in &loaded.failed {
            tracing::error!(source_id = %source_id, error = %error, "source failed to load");
        }
        Ok(ExitCode::FAILURE)
    }
}

fn render_summary(summary: &DashboardSummary, compact: bool) -> Result<String> {
    let document = if compact {
        serde_json::to_string(summary)?
    } else {
        serde_json::to_string_pretty(summary)?
    };
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pamdash::AppContext;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from(["pamdash", "dash.toml", "--theme", "dark", "--compact"]);
        assert_eq!(cli.config, PathBuf::from("dash.toml"));
        assert_eq!(cli.theme.as_deref(), Some("dark"));
        assert!(cli.compact);
        assert!(cli.trace_level.is_none());
    }

    #[test]
    fn summary_is_printed_as_a_single_object() {
        let summary = AppContext::new(Config::default()).summary();
        let document = render_summary(&summary, true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&document).unwrap();

        assert!(parsed.is_object());
        assert_eq!(parsed["theme"], serde_json::json!(summary.theme));
        assert!(render_summary(&summary, false).unwrap().contains('\n'));
    }
}
