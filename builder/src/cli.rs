//! CLI argument definitions for the offline builder.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration. Every option may also come from a TOML file passed with
//! `--config`; flags given on the command line win.

use camino::Utf8PathBuf;
use clap::Parser;

/// Build a self-contained offline bundle from an artifact definition corpus.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "offline-builder")]
#[command(about, disable_version_flag = true)]
#[command(long_about = concat!(
    "Build a self-contained offline bundle from an artifact definition corpus.\n\n",
    "Every definition below --source is parsed and scored, every external tool it ",
    "references is downloaded once, and the lot is packaged with JSON, CSV, and ",
    "text manifests into <output>/offline_builder_v<version>.zip.\n\n",
    "Tools that cannot be fetched are reported in the manifests; they do not fail ",
    "the build.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build a bundle into ./dist:\n",
    "    $ offline-builder --source artifacts --version 0.7.2\n\n",
    "  Use a configuration file and more workers:\n",
    "    $ offline-builder --config builder.toml --concurrency 16\n\n",
    "  Preview without writing anything:\n",
    "    $ offline-builder --source artifacts --version 0.7.2 --dry-run",
))]
pub struct Cli {
    /// Directory containing artifact definitions.
    #[arg(short, long, value_name = "DIR")]
    pub source: Option<Utf8PathBuf>,

    /// Corpus version tag naming the bundle (a leading `v` is stripped).
    #[arg(long = "version", value_name = "TAG")]
    pub corpus_version: Option<String>,

    /// Output directory for the workspace and archive [default: dist].
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<Utf8PathBuf>,

    /// Number of worker threads [default: available parallelism].
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Per-request download timeout in seconds [default: 30].
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Retries per tool after the first attempt [default: 3].
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Directory whose files are copied into the bundle's `binaries/`.
    #[arg(long, value_name = "DIR")]
    pub binaries: Option<Utf8PathBuf>,

    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Show the resolved settings and corpus counts without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors and final counts still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Default for Cli {
    /// Creates a `Cli` with no options set.
    ///
    /// # Examples
    ///
    /// ```
    /// use offline_builder::cli::Cli;
    ///
    /// let cli = Cli::default();
    /// assert!(cli.source.is_none());
    /// assert!(!cli.dry_run);
    /// ```
    fn default() -> Self {
        Self {
            source: None,
            corpus_version: None,
            output: None,
            concurrency: None,
            timeout: None,
            retries: None,
            binaries: None,
            config: None,
            dry_run: false,
            verbosity: 0,
            quiet: false,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
