//! Test support utilities for builder integration and behaviour tests.
//!
//! Provides a temporary corpus directory, an in-process downloader that
//! serves canned bodies, and an in-memory zip builder.

use camino::{Utf8Path, Utf8PathBuf};
use offline_builder::cancel::CancellationToken;
use offline_builder::cli::Cli;
use offline_builder::config::{FileConfig, Settings};
use offline_builder::error::Result;
use offline_builder::fetch::{DownloadError, ToolDownloader, ZipExtractor};
use offline_builder::pipeline::{self, PipelineContext, RunOutcome};
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::sync::Mutex;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A temporary source corpus with an output directory beside it.
pub struct CorpusDir {
    _temp: TempDir,
    pub source: Utf8PathBuf,
    pub output: Utf8PathBuf,
}

impl CorpusDir {
    /// Creates an empty corpus.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp path");
        let source = root.join("corpus");
        fs::create_dir_all(&source).expect("create corpus dir");
        Self {
            _temp: temp,
            source,
            output: root.join("dist"),
        }
    }

    /// Writes a definition file below the corpus root.
    pub fn write(&self, relative: &str, text: &str) {
        let path = self.source.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create definition dir");
        }
        fs::write(path, text).expect("write definition");
    }

    /// Settings for version `1.0` with no retries and two workers.
    pub fn settings(&self) -> Settings {
        let cli = Cli {
            source: Some(self.source.clone()),
            corpus_version: Some("1.0".to_owned()),
            output: Some(self.output.clone()),
            concurrency: Some(2),
            retries: Some(0),
            ..Cli::default()
        };
        Settings::merge(&cli, FileConfig::default()).expect("settings")
    }

    /// Returns the workspace directory for version `1.0`.
    pub fn workspace(&self) -> Utf8PathBuf {
        self.output.join("offline_builder_v1.0")
    }
}

/// Serves canned bodies by URL and records every request.
#[derive(Default)]
pub struct StubDownloader {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl StubDownloader {
    /// Adds a canned body for `url`.
    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_owned(), body.into());
        self
    }

    /// Returns how many times `url` was requested.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|requested| *requested == url)
            .count()
    }
}

impl ToolDownloader for StubDownloader {
    fn download(&self, url: &str, dest: &Utf8Path) -> std::result::Result<u64, DownloadError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(url.to_owned());
        let Some(body) = self.bodies.get(url) else {
            return Err(DownloadError::NotFound {
                url: url.to_owned(),
            });
        };
        fs::write(dest, body)?;
        Ok(body.len() as u64)
    }
}

/// Runs the pipeline quietly with the real zip extractor.
pub fn run_pipeline(settings: &Settings, downloader: &StubDownloader) -> Result<RunOutcome> {
    let cancel = CancellationToken::new();
    let context = PipelineContext {
        settings,
        downloader,
        extractor: &ZipExtractor,
        cancel: &cancel,
        quiet: true,
    };
    let mut sink = Vec::new();
    pipeline::run(&context, &mut sink)
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
