//! Offline builder library.
//!
//! This crate turns a corpus of forensic-artifact definitions into a
//! self-contained, versioned offline bundle: it parses and scores every
//! definition, resolves the external tools they reference to one download per
//! URL, fetches and unpacks those tools, writes JSON, CSV, and text
//! manifests, and zips the result. It is used by the `offline-builder` CLI
//! binary and can be driven programmatically for testing.
//!
//! # Modules
//!
//! - [`artifact`] - Definition parsing and tool reference extraction
//! - [`cancel`] - Cooperative cancellation flag
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration and settings resolution
//! - [`digest`] - SHA-256 file digests
//! - [`error`] - Fatal error types and exit codes
//! - [`fetch`] - Tool download, retry, and archive extraction
//! - [`loader`] - Corpus walking and file loading
//! - [`logging`] - Log subscriber installation
//! - [`manifest`] - Manifest aggregation and its JSON, CSV, and text projections
//! - [`output`] - Console progress and summary formatting
//! - [`packaging`] - Versioned zip bundle assembly
//! - [`pipeline`] - End-to-end build orchestration
//! - [`resolver`] - URL deduplication and file naming
//! - [`validation`] - Artifact quality scoring
//! - [`version`] - Corpus version tags and bundle naming
//! - [`workspace`] - Bundle workspace layout

pub mod artifact;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod logging;
pub mod manifest;
pub mod output;
pub mod packaging;
pub mod pipeline;
pub mod resolver;
pub mod validation;
pub mod version;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_utils;
