//! Shared test utilities for the builder crate.

use crate::artifact::{ToolReference, extract_with_owner, parse};
use crate::fetch::{DownloadError, ToolDownloader};
use crate::loader::SkippedFile;
use crate::manifest::{ArtifactRecord, GeneratedAt, Manifest, ManifestInputs};
use crate::resolver::{FetchStatus, ResolvedTool, resolve};
use crate::validation::validate;
use crate::version::CorpusVersion;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Owned inputs for [`Manifest::build`].
pub struct ManifestFixture {
    pub version: CorpusVersion,
    pub generated_at: GeneratedAt,
    pub root: Utf8PathBuf,
    pub artifacts: Vec<ArtifactRecord>,
    pub tools: Vec<ResolvedTool>,
    pub skipped: Vec<SkippedFile>,
}

impl ManifestFixture {
    /// Builds the manifest from the owned inputs.
    pub fn manifest(&self) -> Manifest {
        Manifest::build(ManifestInputs {
            version: &self.version,
            generated_at: &self.generated_at,
            workspace_root: &self.root,
            artifacts: &self.artifacts,
            tools: &self.tools,
            skipped: &self.skipped,
        })
    }
}

/// Parses, extracts, and validates `raw` as if loaded from `relative`.
pub fn artifact_record(relative: &str, raw: &str) -> ArtifactRecord {
    let definition = parse(raw, Utf8Path::new(&format!("/corpus/{relative}")));
    let references = extract_with_owner(raw, &definition.display_name());
    let validation = validate(&definition);
    ArtifactRecord {
        definition,
        relative_path: Utf8PathBuf::from(relative),
        references,
        validation,
    }
}

/// Two artifacts sharing one zip, one of them also referencing a failing
/// exe, and a third artifact without tools.
pub fn sample_manifest_fixture() -> ManifestFixture {
    let root = Utf8PathBuf::from("/out/offline_builder_v1.0");
    let artifacts = vec![
        artifact_record(
            "B.yaml",
            "name: B\ndescription: d\ntools:\n  - name: tool1\n    url: https://example/t1.zip\n",
        ),
        artifact_record(
            "Windows/A.yaml",
            "name: A\ntools:\n  - name: tool1\n    url: https://example/t1.zip\n  - name: broken\n    url: https://example/broken.exe\n",
        ),
        artifact_record(
            "C.yaml",
            "name: C\ndescription: no tools\nsources:\n  - query: SELECT 1\n",
        ),
    ];
    let references: Vec<ToolReference> = artifacts
        .iter()
        .flat_map(|r| r.references.clone())
        .collect();
    let tools = resolve(&references)
        .into_iter()
        .map(|tool| {
            if tool.file_name == "t1.zip" {
                ResolvedTool {
                    status: FetchStatus::Verified,
                    local_path: Some(root.join("external_tools/t1.zip")),
                    extracted_path: Some(root.join("external_tools/t1")),
                    sha256: Some("ab".repeat(32)),
                    ..tool
                }
            } else {
                tool.failed("HTTP 500 from https://example/broken.exe")
            }
        })
        .collect();
    ManifestFixture {
        version: CorpusVersion::try_from("1.0").expect("valid version"),
        generated_at: GeneratedAt::new("2026-02-12T10:00:00Z"),
        root,
        artifacts,
        tools,
        skipped: vec![SkippedFile {
            path: "/corpus/Broken.yaml".to_owned(),
            reason: "cannot read".to_owned(),
        }],
    }
}

/// Serves canned bodies by URL; unknown URLs are reported as not found.
#[derive(Default)]
pub struct StubDownloader {
    bodies: HashMap<String, Vec<u8>>,
}

impl StubDownloader {
    /// Adds a canned body for `url`.
    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_owned(), body.into());
        self
    }
}

impl ToolDownloader for StubDownloader {
    fn download(&self, url: &str, dest: &Utf8Path) -> Result<u64, DownloadError> {
        let Some(body) = self.bodies.get(url) else {
            return Err(DownloadError::NotFound {
                url: url.to_owned(),
            });
        };
        fs::write(dest, body)?;
        Ok(body.len() as u64)
    }
}

/// Builds an in-memory zip archive from `(name, contents)` pairs.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(&mut cursor);
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(contents).expect("write zip entry");
    }
    writer.finish().expect("finish zip");
    cursor.into_inner()
}
