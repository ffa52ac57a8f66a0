//! Structural quality scoring for artifact definitions.
//!
//! Validation is a fixed-weight, additive rule set. Findings are data: an
//! invalid artifact is still packaged and reported, never rejected.

use crate::artifact::{ArtifactDefinition, Platform};

/// Points awarded for a non-empty name.
pub const NAME_POINTS: u8 = 20;
/// Points awarded for a non-empty description.
pub const DESCRIPTION_POINTS: u8 = 15;
/// Points awarded for a `sources:` or `tools:` section.
pub const SOURCES_POINTS: u8 = 25;
/// Points awarded for a precondition.
pub const PRECONDITION_POINTS: u8 = 10;
/// Points awarded for a parameters block.
pub const PARAMETERS_POINTS: u8 = 10;
/// Points awarded for an author.
pub const AUTHOR_POINTS: u8 = 10;
/// Upper bound for any score.
pub const MAX_SCORE: u8 = 100;

/// Keywords that mark a query as touching a Windows data source.
const WINDOWS_KEYWORDS: [&str; 4] = ["registry", "wmi", "select", "hkey_"];

/// The outcome of validating one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Display name of the validated artifact.
    pub artifact_name: String,
    /// False only when at least one error fired.
    pub is_valid: bool,
    /// Findings that make the artifact invalid.
    pub errors: Vec<String>,
    /// Advisory findings.
    pub warnings: Vec<String>,
    /// Additive score, capped at [`MAX_SCORE`].
    pub score: u8,
}

/// Score `definition` against the structural rules.
///
/// Deterministic for identical input: no clock, no randomness, no I/O.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use offline_builder::artifact::parse;
/// use offline_builder::validation::validate;
///
/// let raw = "name: Foo\ndescription: Lists things\nsources:\n  - query: SELECT 1\n";
/// let result = validate(&parse(raw, Utf8Path::new("Foo.yaml")));
/// assert!(result.is_valid);
/// assert_eq!(result.score, 60);
/// ```
#[must_use]
pub fn validate(definition: &ArtifactDefinition) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut score: u8 = 0;

    if has_text(definition.name.as_deref()) {
        score += NAME_POINTS;
    } else {
        errors.push("missing required field: name".to_owned());
    }

    if has_text(definition.description.as_deref()) {
        score += DESCRIPTION_POINTS;
    } else {
        warnings.push("missing description".to_owned());
    }

    if definition.sections.has_sources() {
        score += SOURCES_POINTS;
    } else {
        errors.push("missing sources or tools section".to_owned());
    }

    if definition.sections.precondition || !definition.preconditions.is_empty() {
        score += PRECONDITION_POINTS;
    }
    if definition.sections.parameters {
        score += PARAMETERS_POINTS;
    }
    if has_text(definition.author.as_deref()) {
        score += AUTHOR_POINTS;
    }

    if definition.platform == Platform::Windows && !mentions_windows_source(definition) {
        warnings.push("no Windows data source keyword (registry, WMI, SELECT) in queries".to_owned());
    }

    ValidationResult {
        artifact_name: definition.display_name(),
        is_valid: errors.is_empty(),
        errors,
        warnings,
        score: score.min(MAX_SCORE),
    }
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|text| !text.trim().is_empty())
}

fn mentions_windows_source(definition: &ArtifactDefinition) -> bool {
    definition.queries.iter().any(|query| {
        let lowered = query.to_ascii_lowercase();
        WINDOWS_KEYWORDS
            .iter()
            .any(|keyword| lowered.contains(keyword))
    })
}
