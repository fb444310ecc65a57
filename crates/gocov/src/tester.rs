//! Running `go test` and loading coverage artifacts
//!
//! Each package with test files runs once with `-coverpkg` covering every
//! selected package, writing its profile into a temporary directory. Runs
//! are spread over a bounded worker pool; the profiles are merged by a
//! single [`MergeActor`] in package order.

use crate::merge::{MergeActor, ProfileSet};
use crate::profile::{read_profiles, Profile};
use crate::result::{GocovError, GocovResult};
use crate::source::PackageSpec;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Default name of the kept-profile artifact
pub const COVERAGE_FILE: &str = "coverage.out";
/// Default name of the excluded-profile artifact
pub const UNCOVERAGE_FILE: &str = "uncoverage.out";

/// Output of `go test` for a directory holding no buildable sources
const NO_BUILDABLE_SOURCES: &str = "no buildable Go source files";

/// Options passed through to `go test`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestOptions {
    /// Pass `-short`
    pub short: bool,
    /// Pass `-timeout <value>`
    pub timeout: Option<String>,
    /// Pass `-v` and log test output
    pub verbose: bool,
    /// Extra arguments appended to the command line
    pub test_args: Vec<String>,
    /// Concurrent `go test` processes (0 = available parallelism)
    pub jobs: usize,
}

impl TestOptions {
    /// Worker count after resolving 0 to the machine's parallelism
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            self.jobs
        }
    }
}

/// Runs `go test` over packages and merges their profiles
#[derive(Debug, Clone)]
pub struct GoTester {
    options: TestOptions,
    program: PathBuf,
}

impl GoTester {
    /// Create a runner using `go` from `PATH`
    #[must_use]
    pub fn new(options: TestOptions) -> Self {
        Self {
            options,
            program: PathBuf::from("go"),
        }
    }

    /// Use another executable in place of `go`
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments of one `go test` invocation
    #[must_use]
    pub fn command_args(&self, packages: &[PackageSpec], coverfile: &Path) -> Vec<String> {
        let mut args = vec!["test".to_string()];
        if self.options.short {
            args.push("-short".to_string());
        }
        if let Some(timeout) = &self.options.timeout {
            args.push("-timeout".to_string());
            args.push(timeout.clone());
        }
        let coverpkg: Vec<&str> = packages.iter().map(|p| p.import_path.as_str()).collect();
        args.push(format!("-coverpkg={}", coverpkg.join(",")));
        args.push(format!("-coverprofile={}", coverfile.display()));
        if self.options.verbose {
            args.push("-v".to_string());
        }
        args.extend(self.options.test_args.iter().cloned());
        args
    }

    /// Test every package and merge the resulting profiles.
    ///
    /// Fails with the error of the first failing package in input order.
    pub fn run(&self, packages: &[PackageSpec]) -> GocovResult<ProfileSet> {
        let cover_dir = tempfile::Builder::new().prefix("gocov").tempdir()?;
        let actor = MergeActor::spawn()?;
        let next = AtomicUsize::new(0);
        let workers = self.options.effective_jobs().min(packages.len()).max(1);
        info!(packages = packages.len(), workers, "running tests");

        let mut failures: Vec<(usize, GocovError)> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let sender = actor.sender();
                    let next = &next;
                    let cover_dir = cover_dir.path();
                    s.spawn(move || {
                        let mut failures = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::SeqCst);
                            let Some(package) = packages.get(index) else {
                                break;
                            };
                            let profiles = match self.test_package(package, packages, cover_dir) {
                                Ok(profiles) => profiles,
                                Err(e) => {
                                    failures.push((index, e));
                                    Vec::new()
                                }
                            };
                            // an empty batch keeps the merge sequence moving
                            let _ = sender.send(index, profiles);
                        }
                        failures
                    })
                })
                .collect();

            let mut failures = Vec::new();
            for handle in handles {
                match handle.join() {
                    Ok(found) => failures.extend(found),
                    Err(_) => failures.push((
                        usize::MAX,
                        GocovError::WorkerPanicked {
                            worker: "go test".to_string(),
                        },
                    )),
                }
            }
            failures
        });

        let merged = actor.finish();
        failures.sort_by_key(|(index, _)| *index);
        if let Some((_, e)) = failures.into_iter().next() {
            return Err(e);
        }
        merged
    }

    fn test_package(
        &self,
        package: &PackageSpec,
        all: &[PackageSpec],
        cover_dir: &Path,
    ) -> GocovResult<Vec<Profile>> {
        if !package.has_tests()? {
            debug!(package = %package.import_path, "no test files, skipping");
            return Ok(Vec::new());
        }

        let coverfile = cover_dir.join(coverfile_name(&package.dir));
        let args = self.command_args(all, &coverfile);
        debug!(command = %format!("{} {}", self.program.display(), args.join(" ")), "running test");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&package.dir)
            .output()?;
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if self.options.verbose {
            info!(package = %package.import_path, "{combined}");
        }

        if combined.contains(NO_BUILDABLE_SOURCES) {
            debug!(package = %package.import_path, "no buildable sources, skipping");
            return Ok(Vec::new());
        }
        if !output.status.success() {
            return Err(GocovError::TestExecution {
                package: package.import_path.clone(),
                output: combined,
            });
        }
        if !coverfile.is_file() {
            return Ok(Vec::new());
        }
        read_profiles(&coverfile)
    }
}

/// Per-package artifact name: a digest of the package directory
#[must_use]
pub fn coverfile_name(dir: &Path) -> String {
    let digest = Sha256::digest(dir.to_string_lossy().as_bytes());
    let hex: String = digest.iter().take(16).map(|b| format!("{b:02x}")).collect();
    format!("{hex}.out")
}

/// Merge every artifact matching a glob, in path order
pub fn load(pattern: &str) -> GocovResult<ProfileSet> {
    let mut paths = Vec::new();
    for entry in glob::glob(pattern)? {
        paths.push(entry.map_err(glob::GlobError::into_error)?);
    }
    paths.sort();
    info!(pattern, files = paths.len(), "loading coverage files");

    let mut set = ProfileSet::new();
    for path in paths {
        debug!(path = %path.display(), "loading");
        set.extend(read_profiles(&path)?)?;
    }
    Ok(set)
}
