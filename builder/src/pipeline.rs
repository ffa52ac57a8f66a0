//! Build pipeline orchestration.
//!
//! A run is a sequence of map phases separated by single-threaded barriers:
//!
//! 1. load every definition below the source root;
//! 2. parse each definition and extract its tool references (parallel);
//! 3. resolve references into one tool per unique URL (barrier);
//! 4. fetch each tool (parallel);
//! 5. validate each definition (parallel);
//! 6. build the manifest and write its projections (barrier);
//! 7. package the workspace (barrier).
//!
//! Every parallel phase runs on one rayon pool sized by the configured
//! concurrency, and collects in input order. Per-file and per-tool failures
//! become manifest data; only the errors in [`BuilderError`] stop a run.

use crate::artifact::{ArtifactDefinition, ToolReference, extract_with_owner, parse_loaded};
use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::error::{BuilderError, Result};
use crate::fetch::{ArchiveExtractor, Fetcher, ToolDownloader};
use crate::loader::{DefinitionLoader, LoadedDefinition};
use crate::manifest::{
    ArtifactRecord, CSV_FILE_NAME, GeneratedAt, JSON_FILE_NAME, Manifest, ManifestInputs,
    SUMMARY_FILE_NAME, csv, report,
};
use crate::output::write_stderr_line;
use crate::packaging::{PackageOutput, PackageParams, assemble};
use crate::resolver::{ResolvedTool, resolve};
use crate::validation::validate;
use crate::workspace::Workspace;
use camino::Utf8PathBuf;
use log::{debug, info, warn};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::io::Write;

/// Collaborators and settings for one run.
pub struct PipelineContext<'a> {
    /// Resolved settings.
    pub settings: &'a Settings,
    /// Downloads tool URLs.
    pub downloader: &'a dyn ToolDownloader,
    /// Unpacks zip tools.
    pub extractor: &'a dyn ArchiveExtractor,
    /// Shared cancellation flag, checked before every job.
    pub cancel: &'a CancellationToken,
    /// Suppresses progress lines.
    pub quiet: bool,
}

/// Counts gathered by a dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DryRunCounts {
    /// Definitions that could be read.
    pub definitions: usize,
    /// Definitions that could not be read.
    pub skipped: usize,
    /// Unique tool URLs referenced by the corpus.
    pub unique_tools: usize,
}

/// The result of a completed build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// The workspace directory that was packaged.
    pub workspace_root: Utf8PathBuf,
    /// The manifest written into the workspace.
    pub manifest: Manifest,
    /// The archive and its checksum.
    pub package: PackageOutput,
}

/// What a run produced.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Nothing was written; the corpus was only surveyed.
    DryRun(DryRunCounts),
    /// The bundle was assembled.
    Built(Box<BuildReport>),
}

/// A definition parsed together with its tool references.
struct Analysed {
    definition: ArtifactDefinition,
    relative_path: Utf8PathBuf,
    references: Vec<ToolReference>,
}

/// Run the whole pipeline.
///
/// # Errors
///
/// Returns [`BuilderError::SourceNotFound`] if the source directory is
/// missing, [`BuilderError::Cancelled`] if cancellation was requested before
/// packaging, and a workspace, serialisation, or packaging error if the
/// bundle cannot be written.
pub fn run(context: &PipelineContext<'_>, stderr: &mut dyn Write) -> Result<RunOutcome> {
    let settings = context.settings;
    if !settings.source.is_dir() {
        return Err(BuilderError::SourceNotFound {
            path: settings.source.clone(),
        });
    }

    let workspace = Workspace::new(&settings.output, &settings.version);
    // An output directory inside the source must not feed earlier bundles
    // back into the corpus.
    let loader = DefinitionLoader::new(settings.source.clone(), &settings.extensions)
        .excluding(&settings.output)
        .excluding(workspace.root());
    let loaded = loader.load_all();
    progress(
        context,
        stderr,
        format!(
            "Loaded {} definitions from {} ({} unreadable)",
            loaded.definitions.len(),
            settings.source,
            loaded.skipped.len()
        ),
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.concurrency.get())
        .build()?;

    let analysed = analyse_all(&loaded.definitions, &pool, context.cancel);
    ensure_not_cancelled(context.cancel)?;

    let references: Vec<ToolReference> = analysed
        .iter()
        .flat_map(|item| item.references.iter().cloned())
        .collect();
    let tools = resolve(&references);
    info!(
        "{} tool references resolve to {} unique tools",
        references.len(),
        tools.len()
    );

    if settings.dry_run {
        return Ok(RunOutcome::DryRun(DryRunCounts {
            definitions: loaded.definitions.len(),
            skipped: loaded.skipped.len(),
            unique_tools: tools.len(),
        }));
    }

    workspace.prepare()?;
    workspace.copy_definitions(&loaded.definitions)?;
    if let Some(binaries) = &settings.binaries {
        let copied = workspace.copy_binaries(binaries)?;
        progress(context, stderr, format!("Copied {copied} binaries"));
    }

    progress(
        context,
        stderr,
        format!(
            "Fetching {} tools with {} workers...",
            tools.len(),
            settings.concurrency
        ),
    );
    let fetched = fetch_tools(context, &workspace, &tools, &pool);
    ensure_not_cancelled(context.cancel)?;

    let records = validate_all(analysed, &pool);
    let generated_at = GeneratedAt::now();
    let manifest = Manifest::build(ManifestInputs {
        version: &settings.version,
        generated_at: &generated_at,
        workspace_root: workspace.root(),
        artifacts: &records,
        tools: &fetched,
        skipped: &loaded.skipped,
    });
    write_manifests(&workspace, &manifest)?;
    ensure_not_cancelled(context.cancel)?;

    progress(context, stderr, "Packaging bundle...");
    let package = assemble(&PackageParams {
        workspace_dir: workspace.root().to_owned(),
        output_dir: workspace.output_dir().to_owned(),
        version: settings.version.clone(),
    })?;

    Ok(RunOutcome::Built(Box::new(BuildReport {
        workspace_root: workspace.root().to_owned(),
        manifest,
        package,
    })))
}

fn analyse_all(
    definitions: &[LoadedDefinition],
    pool: &ThreadPool,
    cancel: &CancellationToken,
) -> Vec<Analysed> {
    pool.install(|| {
        definitions
            .par_iter()
            .filter_map(|loaded| {
                if cancel.is_cancelled() {
                    debug!("cancelled before parsing {}", loaded.relative_path);
                    return None;
                }
                Some(analyse(loaded))
            })
            .collect()
    })
}

fn analyse(loaded: &LoadedDefinition) -> Analysed {
    let definition = parse_loaded(loaded);
    let references = extract_with_owner(&loaded.raw_text, &definition.display_name());
    debug!(
        "{}: {} tool references",
        loaded.relative_path,
        references.len()
    );
    Analysed {
        definition,
        relative_path: loaded.relative_path.clone(),
        references,
    }
}

fn fetch_tools(
    context: &PipelineContext<'_>,
    workspace: &Workspace,
    tools: &[ResolvedTool],
    pool: &ThreadPool,
) -> Vec<ResolvedTool> {
    let fetcher = Fetcher::new(
        context.downloader,
        context.extractor,
        workspace.tools_dir(),
        context.settings.retry.clone(),
    );
    fetcher.fetch_all(tools, pool, context.cancel)
}

fn validate_all(analysed: Vec<Analysed>, pool: &ThreadPool) -> Vec<ArtifactRecord> {
    pool.install(|| {
        analysed
            .into_par_iter()
            .map(|item| {
                let validation = validate(&item.definition);
                if !validation.is_valid {
                    warn!(
                        "{} is invalid: {}",
                        validation.artifact_name,
                        validation.errors.join("; ")
                    );
                }
                ArtifactRecord {
                    definition: item.definition,
                    relative_path: item.relative_path,
                    references: item.references,
                    validation,
                }
            })
            .collect()
    })
}

fn write_manifests(workspace: &Workspace, manifest: &Manifest) -> Result<()> {
    workspace.write_file(JSON_FILE_NAME, &manifest.to_json()?)?;
    workspace.write_file(CSV_FILE_NAME, &csv::render(manifest))?;
    workspace.write_file(SUMMARY_FILE_NAME, &report::render(manifest))?;
    Ok(())
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(BuilderError::Cancelled);
    }
    Ok(())
}

fn progress(context: &PipelineContext<'_>, stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if !context.quiet {
        write_stderr_line(stderr, message);
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
