//! Exclusion annotations
//!
//! A Go comment of the form `// notest` (or `// notestdept`) tells gocov that
//! the code it governs is intentionally untested. Both markers accept free
//! whitespace and an optional justification:
//!
//! ```text
//! //notest
//! // notest
//! // notest // glue code, exercised by the integration suite
//! // notestdept: needs a live database
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// How a source line is excluded from enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionKind {
    /// Not excluded
    #[default]
    None,
    /// `// notest`: deliberately untested
    Manual,
    /// `// notestdept`: untestable because it depends on the environment
    Dependent,
}

impl ExclusionKind {
    /// Every kind that actually excludes something
    pub const EXCLUDING: [Self; 2] = [Self::Manual, Self::Dependent];

    /// The comment marker for this kind
    #[must_use]
    pub const fn marker(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Manual => Some("notest"),
            Self::Dependent => Some("notestdept"),
        }
    }

    /// Parse a marker name back into a kind
    #[must_use]
    pub fn from_marker(marker: &str) -> Option<Self> {
        Self::EXCLUDING
            .into_iter()
            .find(|kind| kind.marker() == Some(marker))
    }

    /// Whether this kind excludes anything
    #[must_use]
    pub const fn is_excluding(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for ExclusionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker().unwrap_or("none"))
    }
}

fn patterns() -> &'static [(ExclusionKind, Regex)] {
    static PATTERNS: OnceLock<Vec<(ExclusionKind, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ExclusionKind::EXCLUDING
            .into_iter()
            .filter_map(|kind| {
                let marker = kind.marker()?;
                // marker, then end of comment or a separator before the justification
                let pattern = format!(r"^//\s*{marker}(?:(?:\s|:|//).*)?$");
                Regex::new(&pattern).ok().map(|re| (kind, re))
            })
            .collect()
    })
}

/// Classify the text of a single `//` comment (including the slashes).
///
/// Returns [`ExclusionKind::None`] for anything that is not an annotation,
/// including block comments.
#[must_use]
pub fn classify_comment(text: &str) -> ExclusionKind {
    let text = text.trim_end();
    patterns()
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map_or(ExclusionKind::None, |(kind, _)| *kind)
}
