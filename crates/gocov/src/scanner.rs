//! Exclusion Scanner
//!
//! Walks a parsed Go file in document order with a stack of enclosing
//! scopes (file, `{}` block, `case`/`default` clause) and turns every
//! `// notest` / `// notestdept` comment into a span of excluded lines:
//!
//! | Comment position | Lines excluded |
//! |------------------|----------------|
//! | after code on the same line | that line only |
//! | own line inside a block | comment line through the line before the block's `}` |
//! | own line inside a clause body | comment line through the end of the clause |
//! | own line right before a `case`/`default` | that clause only |
//! | own line at file level | comment line through the end of the file |
//!
//! Nested spans are applied outermost first, so an inner annotation's kind
//! wins inside its own scope.

use crate::annotation::{classify_comment, ExclusionKind};
use crate::result::GocovResult;
use crate::source::canonical_path;
use crate::syntax::visit::{walk_case, walk_file};
use crate::syntax::{parse_file, BlockNode, CaseNode, Comment, FileNode, Node, Position, Visit};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Line number → kind for one file; lines with [`ExclusionKind::None`] are absent
pub type FileExclusions = BTreeMap<usize, ExclusionKind>;

/// Exclusions for every scanned file, keyed by canonical path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionMap {
    files: BTreeMap<PathBuf, FileExclusions>,
}

impl ExclusionMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the exclusions of one file
    pub fn insert(&mut self, path: impl Into<PathBuf>, lines: FileExclusions) {
        let _ = self.files.insert(path.into(), lines);
    }

    /// Exclusions of one file, if it was scanned
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&FileExclusions> {
        self.files.get(path)
    }

    /// Kind of a single line; unscanned files and unmarked lines are `None`
    #[must_use]
    pub fn kind_at(&self, path: &Path, line: usize) -> ExclusionKind {
        self.get(path)
            .and_then(|lines| lines.get(&line).copied())
            .unwrap_or_default()
    }

    /// Iterate files in path order
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &FileExclusions)> {
        self.files.iter()
    }

    /// Number of scanned files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when nothing was scanned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Build a map from per-file scan results, stopping at the first failure
    pub fn from_results(
        results: impl IntoIterator<Item = (PathBuf, GocovResult<FileExclusions>)>,
    ) -> GocovResult<Self> {
        let mut map = Self::new();
        for (path, result) in results {
            map.insert(path, result?);
        }
        Ok(map)
    }
}

/// First excluding kind met scanning `lines` upward; `None` when no line is marked
#[must_use]
pub fn first_kind(lines: &FileExclusions, span: RangeInclusive<usize>) -> ExclusionKind {
    lines
        .range(span)
        .map(|(_, kind)| *kind)
        .find(|kind| kind.is_excluding())
        .unwrap_or_default()
}

/// Lines governed by one annotation comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationScope {
    /// Kind named by the comment
    pub kind: ExclusionKind,
    /// First excluded line (the comment's own line)
    pub first_line: usize,
    /// Last excluded line
    pub last_line: usize,
    /// Nesting depth of the governing scope; same-line annotations are deepest
    pub depth: usize,
}

/// Scan Go source text
pub fn scan_source(path: &Path, source: &str) -> GocovResult<FileExclusions> {
    let file = parse_file(path, source)?;
    Ok(scan_tree(&file))
}

/// Read and scan a Go file
pub fn scan_file(path: &Path) -> GocovResult<FileExclusions> {
    let source = std::fs::read_to_string(path)?;
    let lines = scan_source(path, &source)?;
    debug!(path = %path.display(), excluded_lines = lines.len(), "scanned");
    Ok(lines)
}

/// Scan many files on up to `jobs` threads.
///
/// Results come back in input order, keyed by canonical path; a parse
/// failure only affects its own entry.
pub fn scan_files(paths: &[PathBuf], jobs: usize) -> Vec<(PathBuf, GocovResult<FileExclusions>)> {
    if paths.is_empty() {
        return Vec::new();
    }
    let chunk = paths.len().div_ceil(jobs.max(1));
    std::thread::scope(|s| {
        let handles: Vec<_> = paths
            .chunks(chunk)
            .map(|chunk| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|path| (canonical_path(path), scan_file(path)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    })
}

/// Build the line map of an already parsed file
#[must_use]
pub fn scan_tree(file: &FileNode) -> FileExclusions {
    let mut scopes = annotation_scopes(file);
    scopes.sort_by_key(|scope| (scope.depth, scope.first_line));

    let mut lines = FileExclusions::new();
    for scope in scopes {
        for line in scope.first_line..=scope.last_line {
            let _ = lines.insert(line, scope.kind);
        }
    }
    lines
}

/// Every annotation in the file with the lines it governs, in document order
#[must_use]
pub fn annotation_scopes(file: &FileNode) -> Vec<AnnotationScope> {
    let annotations: Vec<(&Comment, ExclusionKind)> = file
        .comments
        .iter()
        .map(|comment| (comment, classify_comment(&comment.text)))
        .filter(|(_, kind)| kind.is_excluding())
        .collect();

    let mut visitor = ScopeVisitor {
        annotations,
        next: 0,
        closing_lines: Vec::new(),
        scopes: Vec::new(),
    };
    visitor.visit_file(file);
    visitor.scopes
}

struct ScopeVisitor<'ast> {
    annotations: Vec<(&'ast Comment, ExclusionKind)>,
    next: usize,
    /// Closing line of every open scope, innermost last
    closing_lines: Vec<usize>,
    scopes: Vec<AnnotationScope>,
}

impl<'ast> ScopeVisitor<'ast> {
    /// Resolve all annotations that start before `until` against the innermost open scope
    fn flush(&mut self, until: Position, leading: Option<&CaseNode>) {
        while let Some(&(comment, kind)) = self.annotations.get(self.next) {
            if comment.start >= until {
                break;
            }
            self.next += 1;
            let line = comment.start.line;

            let scope = if !comment.own_line {
                AnnotationScope {
                    kind,
                    first_line: line,
                    last_line: line,
                    depth: usize::MAX,
                }
            } else {
                let (closing, depth) = match leading {
                    Some(case) => (case.end.line, self.closing_lines.len()),
                    None => (
                        self.closing_lines.last().copied().unwrap_or(line),
                        self.closing_lines.len().saturating_sub(1),
                    ),
                };
                AnnotationScope {
                    kind,
                    first_line: line,
                    // the closing line belongs to the enclosing scope
                    last_line: closing.saturating_sub(1).max(line),
                    depth,
                }
            };
            self.scopes.push(scope);
        }
    }
}

impl<'ast> Visit<'ast> for ScopeVisitor<'ast> {
    fn visit_file(&mut self, node: &'ast FileNode) {
        self.closing_lines.push(node.end.line);
        walk_file(self, node);
        self.flush(Position::new(usize::MAX, usize::MAX), None);
        self.closing_lines.pop();
    }

    fn visit_block(&mut self, node: &'ast BlockNode) {
        self.flush(node.lbrace, None);
        self.closing_lines.push(node.rbrace.line);
        for item in &node.items {
            match item {
                Node::Statement(stmt) => self.visit_statement(stmt),
                Node::Case(case) => {
                    self.flush(case.keyword, Some(case));
                    self.visit_case(case);
                }
            }
        }
        self.flush(node.rbrace, None);
        self.closing_lines.pop();
    }

    fn visit_case(&mut self, node: &'ast CaseNode) {
        self.closing_lines.push(node.end.line);
        walk_case(self, node);
        // comments after the last statement lead the next clause instead
        let body_end = node.body.last().map_or(node.colon, |stmt| stmt.end);
        self.flush(body_end, None);
        self.closing_lines.pop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use regex::Regex;

    /// Dedent a fixture and check every line against the scan: lines ending
    /// in `// *` or carrying a marker are expected excluded.
    fn check(name: &str, source: &str) {
        let source = source.replace("\n\t\t\t", "\n");
        let result = scan_source(Path::new("a.go"), &source)
            .unwrap_or_else(|e| panic!("{name}: scan failed: {e}"));

        let notest = Regex::new(r"//\s?notest(\s//\s?.*)?$").unwrap();
        let notestdept = Regex::new(r"//\s?notestdept(\s//\s?.*)?$").unwrap();

        for (i, line) in source.lines().enumerate() {
            let mut expected = ExclusionKind::None;
            if line.ends_with("// *") || notest.is_match(line) {
                expected = ExclusionKind::Manual;
            }
            if line.ends_with("// **") || notestdept.is_match(line) {
                expected = ExclusionKind::Dependent;
            }
            let actual = result.get(&(i + 1)).copied().unwrap_or_default();
            assert_eq!(
                actual,
                expected,
                "{name}, line {}: {:?}",
                i + 1,
                line.trim()
            );
        }
    }

    #[test]
    fn test_function_expressions_are_not_statement_boundaries() {
        let fixtures = [
            (
                "function expression params",
                "package foo

			func Baz() error {
				var f func(int) error
				if f(4) != nil {
					return f(5)
				}
				return nil
			}
			",
            ),
            (
                "function expression variadic params",
                "package foo

			func Baz() error {
				var f func(...int) error
				if f(4) != nil {
					return f(4, 4)
				}
				return nil
			}
			",
            ),
            (
                "function expression ellipsis",
                "package foo

			func Baz() error {
				var f func(...interface{}) error
				var a []interface{}
				if f(a) != nil {
					return f(a...)
				}
				return nil
			}
			",
            ),
        ];
        for (name, source) in fixtures {
            check(name, source);
        }
    }

    #[test]
    fn test_block_scope() {
        check(
            "scope",
            "package foo

			func Baz() int {
				i := 1
				if i > 1 {
					return i
				}

				//notest
				             // *
				if i > 2 {   // *
					return i // *
				}            // *
				return 0     // *
			}
			",
        );
    }

    #[test]
    fn test_scope_inside_if() {
        check(
            "scope if",
            "package foo

			func Baz(i int) int {
				if i > 2 {
					//notest
					return i // *
				}
				return 0
			}
			",
        );
    }

    #[test]
    fn test_file_scope() {
        check(
            "scope file",
            "package foo

			//notest
			                      // *
			func Baz(i int) int { // *
				if i > 2 {        // *
					return i      // *
				}                 // *
				return 0          // *
			}                     // *
			                      // *
			func Foo(i int) int { // *
				return 0          // *
			}
			",
        );
    }

    #[test]
    fn test_variadic_calls_inside_annotated_loop() {
        check(
            "complex comments",
            "package foo

			type Logger struct {
				Enabled bool
			}
			func (l Logger) Print(i ...interface{}) {}

			func Foo() {
				var logger Logger
				var tokens []interface{}
				if logger.Enabled {
					// notest
					for i, token := range tokens {        // *
						logger.Print(\"[\", i, \"] \", token) // *
					}                                     // *
				}
			}
			",
        );
    }

    #[test]
    fn test_case_body_scope() {
        check(
            "case block",
            "package foo

			func Foo() bool {
				switch {
				case true:
					// notest
					if true {       // *
						return true // *
					}               // *
					return false    // *
				}
				return false
			}
			",
        );
    }

    #[test]
    fn test_case_leading_annotation_marks_only_that_clause() {
        check(
            "case leading",
            "package foo

			func Foo(x int) int {
				switch x {
				case 1:
					return 1
				// notest
				case 2:       // *
					x++       // *
					return x  // *
				case 3:
					return 3
				}
				return 0
			}
			",
        );
    }

    #[test]
    fn test_trailing_annotation_marks_single_line() {
        check(
            "trailing",
            "package foo

			func Foo(x int) int {
				if x > 0 {
					x = helper(x) // notest // glue code
					return x
				}
				return 0
			}
			",
        );
    }

    #[test]
    fn test_dependent_annotation() {
        check(
            "dependent",
            "package foo

			func Foo() error {
				// notestdept
				conn, err := dial()   // **
				if err != nil {       // **
					return err        // **
				}                     // **
				return conn.Close()   // **
			}
			",
        );
    }

    #[test]
    fn test_inner_annotation_wins_inside_its_scope() {
        check(
            "nested",
            "package foo

			func Foo() error {
				// notest
				a()                   // *
				if ok() {             // *
					// notestdept
					b()               // **
				}                     // *
				return nil            // *
			}
			",
        );
    }

    #[test]
    fn test_select_clause_scope() {
        check(
            "select",
            "package foo

			func Foo(ch chan int, done chan struct{}) int {
				select {
				case v := <-ch:
					return v
				case <-done:
					// notest
					cleanup(func() { // *
						log(\"done\")  // *
					})               // *
					return 0         // *
				}
			}
			",
        );
    }

    #[test]
    fn test_nested_if_inside_annotated_scope() {
        let source = "package foo\nfunc Baz() int {\n\ti:=1\n\tif i>1 {\n\t\treturn i\n\t}\n\
            \t// notest\n\tif i>2 {\n\t\tif i>3 {\n\t\t\treturn 3\n\t\t}\n\t\treturn i\n\t}\n\
            \treturn 0\n}";
        let lines = scan_source(Path::new("a.go"), source).unwrap();
        for line in 7..=14 {
            assert_eq!(lines.get(&line), Some(&ExclusionKind::Manual), "line {line}");
        }
        for line in [1, 2, 3, 4, 5, 6, 15] {
            assert_eq!(lines.get(&line), None, "line {line}");
        }
    }

    #[test]
    fn test_no_annotations_yields_empty_map() {
        let source = "package foo\n// just a comment\nfunc F() {}\n";
        let lines = scan_source(Path::new("a.go"), source).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_parse_error_aborts_file() {
        let err = scan_source(Path::new("broken.go"), "package foo\nfunc F() {\n").unwrap_err();
        assert!(matches!(err, crate::GocovError::Parse { .. }));
    }

    #[test]
    fn test_byte_order_mark_file_is_scanned() {
        let lines = scan_source(
            Path::new("bom.go"),
            "\u{feff}package foo\nfunc F() {\n\tx() // notest\n\t// notestdept\n\ty()\n}\n",
        )
        .unwrap();
        let expected: FileExclusions = [
            (3, ExclusionKind::Manual),
            (4, ExclusionKind::Dependent),
            (5, ExclusionKind::Dependent),
        ]
        .into_iter()
        .collect();
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_annotation_scopes_report_depth() {
        let file = parse_file(
            Path::new("a.go"),
            "package foo\n// notest\nfunc F() {\n\tif x {\n\t\t// notestdept\n\t\ty()\n\t}\n\
            \tz() // notest\n}\n",
        )
        .unwrap();
        let scopes = annotation_scopes(&file);
        assert_eq!(scopes.len(), 3);
        assert_eq!(scopes[0].depth, 0);
        assert_eq!((scopes[0].first_line, scopes[0].last_line), (2, 8));
        assert_eq!(scopes[1].depth, 2);
        assert_eq!((scopes[1].first_line, scopes[1].last_line), (5, 6));
        assert_eq!(scopes[2].depth, usize::MAX);
    }

    #[test]
    fn test_first_kind_scans_upward() {
        let mut lines = FileExclusions::new();
        lines.insert(5, ExclusionKind::Dependent);
        lines.insert(7, ExclusionKind::Manual);
        assert_eq!(first_kind(&lines, 1..=4), ExclusionKind::None);
        assert_eq!(first_kind(&lines, 4..=8), ExclusionKind::Dependent);
        assert_eq!(first_kind(&lines, 6..=7), ExclusionKind::Manual);
    }

    #[test]
    fn test_scan_files_in_parallel_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..5 {
            let path = dir.path().join(format!("f{i}.go"));
            let body = if i % 2 == 0 {
                "package foo\nfunc F() {\n\tx() // notest\n}\n"
            } else {
                "package foo\nfunc F() {\n"
            };
            std::fs::write(&path, body).unwrap();
            paths.push(path);
        }
        let results = scan_files(&paths, 3);
        assert_eq!(results.len(), 5);
        for (i, (path, result)) in results.iter().enumerate() {
            assert!(path.ends_with(format!("f{i}.go")));
            assert_eq!(result.is_ok(), i % 2 == 0);
        }
        assert!(ExclusionMap::from_results(results).is_err());
    }

    #[test]
    fn test_exclusion_map_lookup() {
        let mut map = ExclusionMap::new();
        let mut lines = FileExclusions::new();
        lines.insert(3, ExclusionKind::Manual);
        map.insert("/src/a.go", lines);
        assert_eq!(map.kind_at(Path::new("/src/a.go"), 3), ExclusionKind::Manual);
        assert_eq!(map.kind_at(Path::new("/src/a.go"), 4), ExclusionKind::None);
        assert_eq!(map.kind_at(Path::new("/src/b.go"), 3), ExclusionKind::None);
        assert_eq!(map.len(), 1);
    }
}
