//! Coverage profile model and the `go test -coverprofile` text format
//!
//! ```text
//! mode: set
//! example.com/pkg/file.go:12.31,14.2 1 1
//! ```

use crate::result::{GocovError, GocovResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// How hit counts are recorded and combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Executed or not
    #[default]
    Set,
    /// Number of executions
    Count,
    /// Number of executions, counted atomically
    Atomic,
}

impl Mode {
    /// Name used in the artifact header
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Count => "count",
            Self::Atomic => "atomic",
        }
    }

    /// Combine two hit counts for the same block
    #[must_use]
    pub const fn combine(self, a: u64, b: u64) -> u64 {
        match self {
            Self::Set => {
                if a > b {
                    a
                } else {
                    b
                }
            }
            Self::Count | Self::Atomic => a.saturating_add(b),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = GocovError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set" => Ok(Self::Set),
            "count" => Ok(Self::Count),
            "atomic" => Ok(Self::Atomic),
            other => Err(GocovError::UnsupportedMode(other.to_string())),
        }
    }
}

/// An instrumented span of one source unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    /// First line (1-based)
    pub start_line: usize,
    /// First column (1-based, bytes)
    pub start_col: usize,
    /// Last line
    pub end_line: usize,
    /// Column just past the span
    pub end_col: usize,
    /// Statements in the span
    pub num_stmt: usize,
    /// Hits recorded by the tests
    pub count: u64,
}

impl Block {
    /// Create an empty, never-executed block
    #[must_use]
    pub const fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
            num_stmt: 0,
            count: 0,
        }
    }

    /// Set the statement count
    #[must_use]
    pub const fn with_statements(mut self, num_stmt: usize) -> Self {
        self.num_stmt = num_stmt;
        self
    }

    /// Set the hit count
    #[must_use]
    pub const fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// `(line, column)` where the span starts
    #[must_use]
    pub const fn start(&self) -> (usize, usize) {
        (self.start_line, self.start_col)
    }

    /// `(line, column)` where the span ends
    #[must_use]
    pub const fn end(&self) -> (usize, usize) {
        (self.end_line, self.end_col)
    }

    /// Same span and statement count, hit counts aside
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.start() == other.start()
            && self.end() == other.end()
            && self.num_stmt == other.num_stmt
    }

    /// Executed at least once
    #[must_use]
    pub const fn is_covered(&self) -> bool {
        self.count > 0
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{},{}.{} {} {}",
            self.start_line, self.start_col, self.end_line, self.end_col, self.num_stmt, self.count
        )
    }
}

/// Coverage of one source unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Source unit name as written by the test tool (`module/path/file.go`)
    pub unit: String,
    /// Counting mode
    pub mode: Mode,
    /// Blocks ordered by start position
    pub blocks: Vec<Block>,
}

impl Profile {
    /// Create a profile without blocks
    #[must_use]
    pub fn new(unit: impl Into<String>, mode: Mode) -> Self {
        Self {
            unit: unit.into(),
            mode,
            blocks: Vec::new(),
        }
    }

    /// Replace the blocks
    #[must_use]
    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Same unit and mode, no blocks
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self::new(self.unit.clone(), self.mode)
    }

    /// Total instrumented statements
    #[must_use]
    pub fn statements(&self) -> usize {
        self.blocks.iter().map(|b| b.num_stmt).sum()
    }

    /// Statements in executed blocks
    #[must_use]
    pub fn covered_statements(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.is_covered())
            .map(|b| b.num_stmt)
            .sum()
    }
}

/// Parse coverage profile text.
///
/// Blocks are grouped per unit in first-seen order and sorted by start
/// position; repeated identical spans within the text are combined.
pub fn parse_profiles(text: &str) -> GocovResult<Vec<Profile>> {
    let mut mode: Option<Mode> = None;
    let mut profiles: Vec<Profile> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix("mode:") {
            let found: Mode = name.trim().parse()?;
            match mode {
                None => mode = Some(found),
                Some(first) if first != found => {
                    return Err(GocovError::profile_format(
                        line_no,
                        format!("mode {found} differs from {first}"),
                    ));
                }
                Some(_) => {}
            }
            continue;
        }

        let Some(mode) = mode else {
            return Err(GocovError::profile_format(line_no, "missing 'mode:' header"));
        };
        let (unit, block) = parse_block_line(line).ok_or_else(|| {
            GocovError::profile_format(line_no, format!("bad block line {line:?}"))
        })?;
        if block.end() < block.start() {
            return Err(GocovError::profile_format(
                line_no,
                format!("block {block} ends before it starts"),
            ));
        }

        match profiles.iter_mut().find(|p| p.unit == unit) {
            Some(profile) => profile.blocks.push(block),
            None => profiles.push(Profile::new(unit, mode).with_blocks(vec![block])),
        }
    }

    for profile in &mut profiles {
        normalize(profile)?;
    }
    Ok(profiles)
}

/// `unit:sl.sc,el.ec stmts count`
fn parse_block_line(line: &str) -> Option<(&str, Block)> {
    let (rest, count) = line.rsplit_once(' ')?;
    let (rest, num_stmt) = rest.rsplit_once(' ')?;
    let (unit, span) = rest.rsplit_once(':')?;
    let (start, end) = span.split_once(',')?;
    let (start_line, start_col) = start.split_once('.')?;
    let (end_line, end_col) = end.split_once('.')?;
    if unit.is_empty() {
        return None;
    }

    let block = Block::new(
        start_line.parse().ok()?,
        start_col.parse().ok()?,
        end_line.parse().ok()?,
        end_col.parse().ok()?,
    )
    .with_statements(num_stmt.parse().ok()?)
    .with_count(count.parse().ok()?);
    Some((unit, block))
}

/// Sort blocks and fold repeated spans
fn normalize(profile: &mut Profile) -> GocovResult<()> {
    profile.blocks.sort_by_key(Block::start);
    let mut folded: Vec<Block> = Vec::with_capacity(profile.blocks.len());
    for block in profile.blocks.drain(..) {
        match folded.last_mut() {
            Some(last) if last.start() == block.start() && last.end() == block.end() => {
                if last.num_stmt != block.num_stmt {
                    return Err(GocovError::StructuralMismatch {
                        unit: profile.unit.clone(),
                        existing: last.to_string(),
                        incoming: block.to_string(),
                    });
                }
                last.count = profile.mode.combine(last.count, block.count);
            }
            _ => folded.push(block),
        }
    }
    profile.blocks = folded;
    Ok(())
}

/// Read and parse a profile artifact
pub fn read_profiles(path: &Path) -> GocovResult<Vec<Profile>> {
    let text = std::fs::read_to_string(path)?;
    parse_profiles(&text)
}

/// Write profiles in artifact form; an empty list writes nothing.
///
/// The header carries the first profile's mode; a [`crate::ProfileSet`] keeps
/// one mode across units.
pub fn dump_profiles<W: Write>(profiles: &[Profile], mut out: W) -> GocovResult<()> {
    let Some(first) = profiles.first() else {
        return Ok(());
    };
    writeln!(out, "mode: {}", first.mode)?;
    for profile in profiles {
        for block in &profile.blocks {
            writeln!(out, "{}:{block}", profile.unit)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Write profiles to a file, replacing it
pub fn write_profiles(profiles: &[Profile], path: &Path) -> GocovResult<()> {
    let file = File::create(path)?;
    dump_profiles(profiles, BufWriter::new(file))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = "mode: set
example.com/a/a.go:3.20,5.2 1 1
example.com/a/a.go:7.2,9.3 2 0
example.com/b/b.go:1.14,2.2 1 0
";

    #[test]
    fn test_parse_groups_blocks_by_unit() {
        let profiles = parse_profiles(SAMPLE).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].unit, "example.com/a/a.go");
        assert_eq!(profiles[0].mode, Mode::Set);
        assert_eq!(profiles[0].blocks.len(), 2);
        assert_eq!(
            profiles[0].blocks[1],
            Block::new(7, 2, 9, 3).with_statements(2).with_count(0)
        );
        assert_eq!(profiles[1].unit, "example.com/b/b.go");
    }

    #[test]
    fn test_parse_unit_containing_colon() {
        let profiles = parse_profiles("mode: count\nC:/src/a.go:1.1,2.2 1 4\n").unwrap();
        assert_eq!(profiles[0].unit, "C:/src/a.go");
        assert_eq!(profiles[0].blocks[0].count, 4);
    }

    #[test]
    fn test_parse_sorts_interleaved_blocks() {
        let text = "mode: set\na.go:7.2,9.3 1 0\nb.go:1.1,1.5 1 0\na.go:3.2,5.2 1 1\n";
        let profiles = parse_profiles(text).unwrap();
        assert_eq!(profiles[0].unit, "a.go");
        assert_eq!(profiles[0].blocks[0].start(), (3, 2));
        assert_eq!(profiles[0].blocks[1].start(), (7, 2));
    }

    #[test]
    fn test_parse_folds_duplicate_spans_per_mode() {
        let set = parse_profiles("mode: set\na.go:1.1,2.2 1 1\na.go:1.1,2.2 1 1\n").unwrap();
        assert_eq!(set[0].blocks.len(), 1);
        assert_eq!(set[0].blocks[0].count, 1);

        let count = parse_profiles("mode: count\na.go:1.1,2.2 1 3\na.go:1.1,2.2 1 4\n").unwrap();
        assert_eq!(count[0].blocks[0].count, 7);
    }

    #[test]
    fn test_parse_duplicate_with_different_statements_is_mismatch() {
        let err = parse_profiles("mode: set\na.go:1.1,2.2 1 1\na.go:1.1,2.2 2 1\n").unwrap_err();
        assert!(matches!(err, GocovError::StructuralMismatch { .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_profiles("a.go:1.1,2.2 1 1\n").unwrap_err(),
            GocovError::ProfileFormat { line: 1, .. }
        ));
        assert!(matches!(
            parse_profiles("mode: set\na.go:1.1-2.2 1 1\n").unwrap_err(),
            GocovError::ProfileFormat { line: 2, .. }
        ));
        assert!(matches!(
            parse_profiles("mode: set\na.go:5.1,3.2 1 0\n").unwrap_err(),
            GocovError::ProfileFormat { line: 2, .. }
        ));
        assert!(matches!(
            parse_profiles("mode: set\na.go:5.9,5.2 1 0\n").unwrap_err(),
            GocovError::ProfileFormat { line: 2, .. }
        ));
        assert!(matches!(
            parse_profiles("mode: weird\n").unwrap_err(),
            GocovError::UnsupportedMode(_)
        ));
        assert!(matches!(
            parse_profiles("mode: set\nmode: count\n").unwrap_err(),
            GocovError::ProfileFormat { line: 2, .. }
        ));
    }

    #[test]
    fn test_concatenated_artifacts_with_same_mode() {
        let text = format!("{SAMPLE}\nmode: set\nexample.com/c/c.go:1.1,1.9 1 1\n");
        let profiles = parse_profiles(&text).unwrap();
        assert_eq!(profiles.len(), 3);
    }

    #[test]
    fn test_dump_writes_header_and_blocks() {
        let profiles = parse_profiles(SAMPLE).unwrap();
        let mut out = Vec::new();
        dump_profiles(&profiles, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), SAMPLE);
    }

    #[test]
    fn test_dump_empty_writes_nothing() {
        let mut out = Vec::new();
        dump_profiles(&[], &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.out");
        let profiles = parse_profiles(SAMPLE).unwrap();
        write_profiles(&profiles, &path).unwrap();
        assert_eq!(read_profiles(&path).unwrap(), profiles);
    }

    #[test]
    fn test_mode_combine() {
        assert_eq!(Mode::Set.combine(1, 1), 1);
        assert_eq!(Mode::Set.combine(0, 3), 3);
        assert_eq!(Mode::Count.combine(2, 3), 5);
        assert_eq!(Mode::Atomic.combine(u64::MAX, 1), u64::MAX);
    }

    #[test]
    fn test_statement_totals() {
        let profiles = parse_profiles(SAMPLE).unwrap();
        assert_eq!(profiles[0].statements(), 3);
        assert_eq!(profiles[0].covered_statements(), 1);
    }
}
