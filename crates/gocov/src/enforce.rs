//! Coverage Enforcer
//!
//! Collects the never-executed blocks left after exclusions, coalesces
//! neighbours into [`UntestedRange`]s and renders them with their source.

use crate::profile::Profile;
use crate::result::GocovResult;
use crate::source::{display_path, SourceResolver};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A run of untested lines in one source unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntestedRange {
    /// Source unit name
    pub unit: String,
    /// First line
    pub start_line: usize,
    /// Last line
    pub end_line: usize,
}

impl fmt::Display for UntestedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.unit, self.start_line, self.end_line)
    }
}

/// Outcome of enforcement
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Verdict {
    /// No untested code remains
    pub ok: bool,
    /// Every untested range, in profile order
    pub ranges: Vec<UntestedRange>,
    /// Ranges with their source lines, empty when `ok`
    pub report: String,
}

/// Coalesce zero-hit blocks.
///
/// A block joins the previous range of its unit when it starts no later than
/// the line after that range ends.
#[must_use]
pub fn untested_ranges(profiles: &[Profile]) -> Vec<UntestedRange> {
    let mut ranges: Vec<UntestedRange> = Vec::new();
    for profile in profiles {
        for block in profile.blocks.iter().filter(|b| !b.is_covered()) {
            if let Some(last) = ranges.last_mut() {
                let adjacent = block.start_line <= last.end_line.saturating_add(1);
                if last.unit == profile.unit && adjacent {
                    last.end_line = last.end_line.max(block.end_line);
                    continue;
                }
            }
            ranges.push(UntestedRange {
                unit: profile.unit.clone(),
                start_line: block.start_line,
                end_line: block.end_line,
            });
        }
    }
    ranges
}

/// Check kept profiles for untested code.
///
/// Every unit with untested code must resolve to a readable file; a
/// resolution failure here is an error.
pub fn enforce(kept: &[Profile], resolver: &dyn SourceResolver) -> GocovResult<Verdict> {
    let ranges = untested_ranges(kept);
    if ranges.is_empty() {
        info!("no untested code");
        return Ok(Verdict {
            ok: true,
            ranges,
            report: String::new(),
        });
    }

    let mut sources: BTreeMap<PathBuf, String> = BTreeMap::new();
    let mut report = String::new();
    for range in &ranges {
        let path = resolver.resolve(&range.unit)?;
        if !sources.contains_key(&path) {
            let text = std::fs::read_to_string(&path)?;
            let _ = sources.insert(path.clone(), text);
        }
        let text = sources.get(&path).map(String::as_str).unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();
        let start = range.start_line.saturating_sub(1).min(lines.len());
        let end = range.end_line.min(lines.len()).max(start);

        report.push_str(&format!("{range}:\n"));
        for line in undent(&lines[start..end]) {
            report.push_str(&line);
            report.push('\n');
        }
    }

    debug!(ranges = ranges.len(), "untested code found");
    Ok(Verdict {
        ok: false,
        ranges,
        report,
    })
}

/// Strip the common indentation and indent each line with one tab.
/// Blank lines come back empty.
#[must_use]
pub fn undent(lines: &[&str]) -> Vec<String> {
    let min = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("\t{}", &line[min..])
            }
        })
        .collect()
}

/// Every zero-hit block as `path:line:col`, paths shown relative to `base`.
/// Units that do not resolve are listed by name.
#[must_use]
pub fn untested_locations(
    profiles: &[Profile],
    resolver: &dyn SourceResolver,
    base: &Path,
) -> Vec<String> {
    let mut out = Vec::new();
    for profile in profiles {
        let name = resolver
            .resolve(&profile.unit)
            .map_or_else(|_| profile.unit.clone(), |path| display_path(&path, base));
        for block in profile.blocks.iter().filter(|b| !b.is_covered()) {
            out.push(format!("{name}:{}:{}", block.start_line, block.start_col));
        }
    }
    out
}

/// Statement coverage over a set of profiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Instrumented statements
    pub total_statements: usize,
    /// Statements in executed blocks
    pub covered_statements: usize,
    /// Covered share in percent (100 when nothing is instrumented)
    pub percent: f64,
}

impl CoverageSummary {
    /// Summarize profiles
    #[must_use]
    pub fn of(profiles: &[Profile]) -> Self {
        let total_statements: usize = profiles.iter().map(Profile::statements).sum();
        let covered_statements: usize = profiles.iter().map(Profile::covered_statements).sum();
        let percent = if total_statements == 0 {
            100.0
        } else {
            covered_statements as f64 * 100.0 / total_statements as f64
        };
        Self {
            total_statements,
            covered_statements,
            percent,
        }
    }
}

impl fmt::Display for CoverageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "coverage: {:.1}% of statements", self.percent)
    }
}
