//! Source resolution and package discovery
//!
//! Coverage profiles name files by import path (`example.com/mod/pkg/a.go`);
//! exclusions and enforcement need them on disk. A [`SourceResolver`] does
//! that mapping. [`ModuleResolver`] implements it for a Go module rooted at
//! a `go.mod` file.

use crate::result::{GocovError, GocovResult};
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// Name of the Go module file
pub const GO_MOD: &str = "go.mod";

/// Maps a profile's source unit name to a file on disk
pub trait SourceResolver {
    /// Canonical path of `unit`, or [`GocovError::MissingExclusionTarget`]
    fn resolve(&self, unit: &str) -> GocovResult<PathBuf>;
}

impl<F> SourceResolver for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn resolve(&self, unit: &str) -> GocovResult<PathBuf> {
        self(unit).ok_or_else(|| GocovError::missing_target(unit))
    }
}

/// Resolves units of one Go module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleResolver {
    root: PathBuf,
    module: String,
}

impl ModuleResolver {
    /// Create a resolver for `module` rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, module: impl Into<String>) -> Self {
        Self {
            root: canonical_path(&root.into()),
            module: module.into(),
        }
    }

    /// Find the nearest `go.mod` at or above `start` and read its module path
    pub fn discover(start: &Path) -> GocovResult<Self> {
        let start = canonical_path(start);
        for dir in start.ancestors() {
            let candidate = dir.join(GO_MOD);
            if !candidate.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&candidate)?;
            let module = parse_module_directive(&text).ok_or_else(|| {
                GocovError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{} has no module directive", candidate.display()),
                ))
            })?;
            debug!(root = %dir.display(), module = %module, "found go.mod");
            return Ok(Self::new(dir, module));
        }
        Err(GocovError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no {GO_MOD} found at or above {}", start.display()),
        )))
    }

    /// Module root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Module path from `go.mod`
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Import path of a directory inside the module
    #[must_use]
    pub fn import_path(&self, dir: &Path) -> Option<String> {
        let rel = canonical_path(dir).strip_prefix(&self.root).ok()?.to_path_buf();
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            Some(self.module.clone())
        } else {
            Some(format!("{}/{}", self.module, parts.join("/")))
        }
    }

    /// Directory for an import path or a filesystem-relative package argument
    fn package_dir(&self, base: &Path, pattern: &str) -> PathBuf {
        match pattern.strip_prefix(&self.module) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                self.root.join(rest.trim_start_matches('/'))
            }
            _ => base.join(pattern),
        }
    }
}

impl SourceResolver for ModuleResolver {
    fn resolve(&self, unit: &str) -> GocovResult<PathBuf> {
        let as_path = Path::new(unit);
        let candidate = match unit.strip_prefix(&self.module) {
            Some(rest) if rest.starts_with('/') => self.root.join(rest.trim_start_matches('/')),
            _ if as_path.is_absolute() => as_path.to_path_buf(),
            _ => self.root.join(as_path),
        };
        if candidate.is_file() {
            trace!(unit, path = %candidate.display(), "resolved");
            Ok(canonical_path(&candidate))
        } else {
            Err(GocovError::missing_target(unit))
        }
    }
}

/// Module path declared by `go.mod` text
#[must_use]
pub fn parse_module_directive(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or_default().trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let name = rest.trim().trim_matches('"').trim_matches('`');
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Canonical form of a path; falls back to an absolute path when the file is missing
#[must_use]
pub fn canonical_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

/// `./relative/path` when `path` lies under `base`, otherwise the path as is
#[must_use]
pub fn display_path(path: &Path, base: &Path) -> String {
    let base = canonical_path(base);
    match path.strip_prefix(&base) {
        Ok(rel) => format!("./{}", rel.display()),
        Err(_) => path.display().to_string(),
    }
}

/// A Go package to test
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PackageSpec {
    /// Import path
    pub import_path: String,
    /// Directory on disk
    pub dir: PathBuf,
}

impl PackageSpec {
    /// Non-test `.go` files of the package, sorted
    pub fn source_files(&self) -> GocovResult<Vec<PathBuf>> {
        let mut files = go_files(&self.dir)?;
        files.retain(|f| !is_test_file(f));
        Ok(files)
    }

    /// Whether the package has any `_test.go` file
    pub fn has_tests(&self) -> GocovResult<bool> {
        Ok(go_files(&self.dir)?.iter().any(|f| is_test_file(f)))
    }
}

fn is_test_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("_test.go"))
}

fn go_files(dir: &Path) -> GocovResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "go") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn skipped_dir(name: &str) -> bool {
    name == "vendor" || name == "testdata" || name.starts_with('.') || name.starts_with('_')
}

/// Expand package arguments (`./...`, `dir/...`, `dir`, or an import path)
/// into packages sorted by import path. No arguments means `./...`.
pub fn discover_packages(
    resolver: &ModuleResolver,
    base: &Path,
    patterns: &[String],
) -> GocovResult<Vec<PackageSpec>> {
    let defaults = ["./...".to_string()];
    let patterns = if patterns.is_empty() {
        &defaults[..]
    } else {
        patterns
    };

    let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
    for pattern in patterns {
        let pattern = pattern.trim_end_matches('/');
        let (prefix, recursive) = match pattern.strip_suffix("...") {
            Some(prefix) => (prefix.trim_end_matches('/'), true),
            None => (pattern, false),
        };
        let prefix = if prefix.is_empty() { "." } else { prefix };
        let dir = resolver.package_dir(base, prefix);
        if !dir.is_dir() {
            return Err(GocovError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("package {pattern} not found"),
            )));
        }

        let top = canonical_path(&dir);
        let mut dirs = vec![top.clone()];
        if recursive {
            collect_dirs(&top, &mut dirs)?;
        }
        for dir in dirs {
            if go_files(&dir)?.is_empty() {
                continue;
            }
            if let Some(import_path) = resolver.import_path(&dir) {
                let _ = found.insert(import_path, dir);
            }
        }
    }

    debug!(packages = found.len(), "discovered packages");
    Ok(found
        .into_iter()
        .map(|(import_path, dir)| PackageSpec { import_path, dir })
        .collect())
}

fn collect_dirs(dir: &Path, out: &mut Vec<PathBuf>) -> GocovResult<()> {
    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if entry.file_type()?.is_dir() && !skipped_dir(&name.to_string_lossy()) {
            children.push(entry.path());
        }
    }
    children.sort();
    for child in children {
        out.push(child.clone());
        collect_dirs(&child, out)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;

    fn module() -> (tempfile::TempDir, ModuleResolver) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join(GO_MOD), "module example.com/m\n\ngo 1.21\n").unwrap();
        fs::write(root.join("main.go"), "package main\n").unwrap();
        for sub in ["a", "a/b", "vendor/x", "testdata", ".hidden", "_skip", "empty"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        fs::write(root.join("a/a.go"), "package a\n").unwrap();
        fs::write(root.join("a/a_test.go"), "package a\n").unwrap();
        fs::write(root.join("a/b/b.go"), "package b\n").unwrap();
        for sub in ["vendor/x", "testdata", ".hidden", "_skip"] {
            fs::write(root.join(sub).join("x.go"), "package x\n").unwrap();
        }
        let resolver = ModuleResolver::discover(&root.join("a/b")).unwrap();
        (dir, resolver)
    }

    #[test]
    fn test_discover_finds_go_mod_upward() {
        let (dir, resolver) = module();
        assert_eq!(resolver.module(), "example.com/m");
        assert_eq!(resolver.root(), canonical_path(dir.path()));
    }

    #[test]
    fn test_go_mod_without_module_directive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(GO_MOD), "go 1.21\n").unwrap();
        let err = ModuleResolver::discover(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no module directive"));
    }

    #[test]
    fn test_resolve_units() {
        let (dir, resolver) = module();
        let expected = canonical_path(&dir.path().join("a/a.go"));
        assert_eq!(resolver.resolve("example.com/m/a/a.go").unwrap(), expected);
        assert_eq!(resolver.resolve(expected.to_str().unwrap()).unwrap(), expected);
        assert_eq!(resolver.resolve("a/a.go").unwrap(), expected);
        assert!(matches!(
            resolver.resolve("example.com/m/a/missing.go").unwrap_err(),
            GocovError::MissingExclusionTarget { .. }
        ));
        assert!(resolver.resolve("other.org/x/a.go").is_err());
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |unit: &str| (unit == "x.go").then(|| PathBuf::from("/src/x.go"));
        assert_eq!(resolver.resolve("x.go").unwrap(), PathBuf::from("/src/x.go"));
        assert!(resolver.resolve("y.go").unwrap_err().is_per_file());
    }

    #[test]
    fn test_parse_module_directive() {
        assert_eq!(
            parse_module_directive("// c\nmodule github.com/heeus/gocov // main\n"),
            Some("github.com/heeus/gocov".to_string())
        );
        assert_eq!(
            parse_module_directive("module \"example.com/q\"\n"),
            Some("example.com/q".to_string())
        );
        assert_eq!(parse_module_directive("modules x\ngo 1.21\n"), None);
    }

    #[test]
    fn test_discover_packages_recursive_skips_special_dirs() {
        let (dir, resolver) = module();
        let packages = discover_packages(&resolver, dir.path(), &[]).unwrap();
        let paths: Vec<&str> = packages.iter().map(|p| p.import_path.as_str()).collect();
        assert_eq!(paths, vec!["example.com/m", "example.com/m/a", "example.com/m/a/b"]);
    }

    #[test]
    fn test_discover_packages_single_and_subtree() {
        let (dir, resolver) = module();
        let single = discover_packages(&resolver, dir.path(), &["./a".to_string()]).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].import_path, "example.com/m/a");

        let subtree = discover_packages(&resolver, dir.path(), &["a/...".to_string()]).unwrap();
        assert_eq!(subtree.len(), 2);

        let by_import =
            discover_packages(&resolver, dir.path(), &["example.com/m/a/b".to_string()]).unwrap();
        assert_eq!(by_import[0].import_path, "example.com/m/a/b");

        assert!(discover_packages(&resolver, dir.path(), &["./nope".to_string()]).is_err());
    }

    #[test]
    fn test_package_files() {
        let (dir, resolver) = module();
        let packages = discover_packages(&resolver, dir.path(), &["./a".to_string()]).unwrap();
        let files = packages[0].source_files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.go"));
        assert!(packages[0].has_tests().unwrap());

        let b = discover_packages(&resolver, dir.path(), &["./a/b".to_string()]).unwrap();
        assert!(!b[0].has_tests().unwrap());
    }

    #[test]
    fn test_display_path() {
        let (dir, _) = module();
        let file = canonical_path(&dir.path().join("a/a.go"));
        assert_eq!(display_path(&file, dir.path()), "./a/a.go");
        assert_eq!(display_path(Path::new("/elsewhere/x.go"), dir.path()), "/elsewhere/x.go");
    }
}
