//! Offline builder CLI entrypoint.
//!
//! This binary turns an artifact definition corpus into a versioned offline
//! bundle. Progress and the final tool counts are written to stderr; the exit
//! code is 0 when the archive was produced, 130 when interrupted, and 1
//! otherwise.

use clap::Parser;
use offline_builder::cancel::CancellationToken;
use offline_builder::cli::Cli;
use offline_builder::config::Settings;
use offline_builder::error::Result;
use offline_builder::fetch::{HttpDownloader, ZipExtractor};
use offline_builder::logging;
use offline_builder::output::{DryRunInfo, success_message, summary_line, write_stderr_line};
use offline_builder::pipeline::{self, PipelineContext, RunOutcome};
use offline_builder::workspace::Workspace;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbosity, cli.quiet);
    let cancel = CancellationToken::new();
    install_interrupt_handler(&cancel);

    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &cancel, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Cancels the run cooperatively on Ctrl-C.
fn install_interrupt_handler(cancel: &CancellationToken) {
    let token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || token.cancel()) {
        log::warn!("cannot install Ctrl-C handler: {err}");
    }
}

fn run(cli: &Cli, cancel: &CancellationToken, stderr: &mut dyn Write) -> Result<()> {
    let settings = Settings::from_cli(cli)?;
    let downloader = HttpDownloader::new(settings.timeout);
    let context = PipelineContext {
        settings: &settings,
        downloader: &downloader,
        extractor: &ZipExtractor,
        cancel,
        quiet: cli.quiet,
    };

    match pipeline::run(&context, stderr)? {
        RunOutcome::DryRun(counts) => {
            let workspace = Workspace::new(&settings.output, &settings.version);
            let info = DryRunInfo {
                settings: &settings,
                workspace_root: workspace.root(),
                definitions: counts.definitions,
                skipped: counts.skipped,
                unique_tools: counts.unique_tools,
            };
            write_stderr_line(stderr, info.display_text());
        }
        RunOutcome::Built(report) => {
            write_stderr_line(stderr, summary_line(&report.manifest.summary));
            if !cli.quiet {
                write_stderr_line(stderr, success_message(&report.package.archive_path));
            }
        }
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            err.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_builder::error::BuilderError;
    use rstest::rstest;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[rstest]
    #[case::cancelled(BuilderError::Cancelled, 130, "cancelled")]
    #[case::config(
        BuilderError::Config { reason: "missing version".to_owned() },
        1,
        "missing version"
    )]
    #[case::workspace_write(
        BuilderError::workspace_write("/out/offline_builder_v1.0", std::io::Error::other("permission denied")),
        1,
        "permission denied"
    )]
    fn exit_code_for_run_result_prints_error(
        #[case] err: BuilderError,
        #[case] expected_code: i32,
        #[case] expected_text: &str,
    ) {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, expected_code);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.starts_with("error: "));
        assert!(stderr_text.contains(expected_text));
    }

    #[test]
    fn run_without_source_reports_config_error() {
        let cli = Cli {
            corpus_version: Some("1.0".to_owned()),
            ..Cli::default()
        };
        let mut stderr = Vec::new();
        let result = run(&cli, &CancellationToken::new(), &mut stderr);
        assert!(matches!(result, Err(BuilderError::Config { .. })));
    }
}
