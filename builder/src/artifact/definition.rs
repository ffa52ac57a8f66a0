//! Structured artifact definitions and the tool references they declare.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

/// The operating system an artifact targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Platform {
    /// Microsoft Windows.
    Windows,
    /// Linux distributions.
    Linux,
    /// Apple macOS.
    #[serde(rename = "MacOS")]
    MacOs,
    /// Platform-independent, or no platform could be determined.
    #[default]
    Generic,
}

impl Platform {
    /// Map a directory name or `supported_os` entry to a platform.
    ///
    /// Matching is case-insensitive and ignores surrounding quotes and
    /// whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use offline_builder::artifact::Platform;
    ///
    /// assert_eq!(Platform::from_label("Windows"), Some(Platform::Windows));
    /// assert_eq!(Platform::from_label("darwin"), Some(Platform::MacOs));
    /// assert_eq!(Platform::from_label("Sys"), None);
    /// ```
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches(|c| c == '"' || c == '\'');
        match label.to_ascii_lowercase().as_str() {
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" | "darwin" | "osx" => Some(Self::MacOs),
            "generic" => Some(Self::Generic),
            _ => None,
        }
    }

    /// Return the canonical display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::MacOs => "MacOS",
            Self::Generic => "Generic",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which top-level blocks a definition declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sections {
    /// A `sources:` block is present.
    pub sources: bool,
    /// A `tools:` block is present.
    pub tools: bool,
    /// A `parameters:` block is present.
    pub parameters: bool,
    /// A top-level `precondition:` key is present.
    pub precondition: bool,
}

impl Sections {
    /// Return true when the definition declares something to collect or
    /// something to deploy.
    #[must_use]
    pub fn has_sources(self) -> bool {
        self.sources || self.tools
    }
}

/// One parsed artifact definition.
///
/// Every field that the source format treats as optional is optional here,
/// so a definition is always representable no matter how sparse the file
/// is. Instances are never mutated after parsing; a re-scan produces new
/// ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDefinition {
    /// Declared artifact name.
    pub name: Option<String>,
    /// Declared author.
    pub author: Option<String>,
    /// Declared description.
    pub description: Option<String>,
    /// Target platform (directory placement wins over `supported_os`).
    pub platform: Platform,
    /// Parameter names in declaration order.
    pub parameters: Vec<String>,
    /// Raw precondition expressions. Never evaluated.
    pub preconditions: Vec<String>,
    /// Raw query payloads. Never evaluated.
    pub queries: Vec<String>,
    /// Which top-level blocks exist.
    pub sections: Sections,
    /// File the definition was parsed from.
    pub source_path: Utf8PathBuf,
    /// Size of the source file in bytes.
    pub size_bytes: u64,
    /// Last modification time of the source file.
    pub last_modified: Option<SystemTime>,
}

impl ArtifactDefinition {
    /// Return the name used to key this artifact downstream.
    ///
    /// Falls back to the source file stem when the definition declares no
    /// name, so nameless artifacts remain traceable in the manifest.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => file_stem_or_path(&self.source_path),
        }
    }
}

fn file_stem_or_path(path: &Utf8Path) -> String {
    path.file_stem().map_or_else(|| path.to_string(), str::to_owned)
}

/// A tool an artifact depends on, as declared in the definition.
///
/// Several references may share a URL (one tool used by many artifacts), and
/// one tool name may appear with several URLs (versioned variants). Both
/// are kept distinct until the resolver groups them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToolReference {
    /// Name of the owning artifact.
    pub artifact_name: String,
    /// Declared tool name.
    pub tool_name: String,
    /// Declared download URL.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::windows("windows", Some(Platform::Windows))]
    #[case::linux_mixed_case("LiNuX", Some(Platform::Linux))]
    #[case::macos("MacOS", Some(Platform::MacOs))]
    #[case::osx("osx", Some(Platform::MacOs))]
    #[case::quoted("'generic'", Some(Platform::Generic))]
    #[case::unknown("freebsd", None)]
    fn platform_labels(#[case] label: &str, #[case] expected: Option<Platform>) {
        assert_eq!(Platform::from_label(label), expected);
    }

    #[test]
    fn display_name_falls_back_to_file_stem() {
        let definition = ArtifactDefinition {
            name: None,
            author: None,
            description: None,
            platform: Platform::Generic,
            parameters: Vec::new(),
            preconditions: Vec::new(),
            queries: Vec::new(),
            sections: Sections::default(),
            source_path: Utf8PathBuf::from("corpus/Linux/Sys.Users.yaml"),
            size_bytes: 0,
            last_modified: None,
        };
        assert_eq!(definition.display_name(), "Sys.Users");
    }

    #[test]
    fn tools_section_counts_as_sources() {
        let sections = Sections {
            tools: true,
            ..Sections::default()
        };
        assert!(sections.has_sources());
        assert!(!Sections::default().has_sources());
    }
}
