//! Scan, merge, apply and enforce in one call

use crate::annotation::ExclusionKind;
use crate::apply::{apply, Applied};
use crate::enforce::{enforce, CoverageSummary, Verdict};
use crate::result::GocovResult;
use crate::scanner::{scan_files, ExclusionMap};
use crate::source::{discover_packages, ModuleResolver, PackageSpec};
use crate::tester::{load, GoTester, TestOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Where coverage profiles come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    /// Run `go test` over the selected packages
    Run(TestOptions),
    /// Load existing artifacts matching a glob
    Load(String),
}

/// Pipeline inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Package arguments (`./...` when empty)
    pub packages: Vec<String>,
    /// Profile source
    pub source: ProfileSource,
    /// Produce a [`Verdict`]
    pub enforce: bool,
    /// Threads for scanning (0 = available parallelism)
    pub jobs: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            source: ProfileSource::Run(TestOptions::default()),
            enforce: false,
            jobs: 0,
        }
    }
}

/// Everything a pipeline run produced
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Packages selected
    pub packages: Vec<PackageSpec>,
    /// Scanned exclusions
    pub exclusions: ExclusionMap,
    /// Kept and excluded profiles
    pub applied: Applied,
    /// Enforcement result, when requested
    pub verdict: Option<Verdict>,
    /// Statement coverage of the kept profiles
    pub summary: CoverageSummary,
}

/// Pipeline bound to one Go module
#[derive(Debug, Clone)]
pub struct Pipeline {
    base: PathBuf,
    resolver: ModuleResolver,
    program: Option<PathBuf>,
}

impl Pipeline {
    /// Pipeline for the module containing `base`
    pub fn discover(base: &Path) -> GocovResult<Self> {
        Ok(Self {
            base: base.to_path_buf(),
            resolver: ModuleResolver::discover(base)?,
            program: None,
        })
    }

    /// Use another executable in place of `go`
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// The module resolver
    #[must_use]
    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// Working directory package arguments are relative to
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Run every stage
    pub fn run(&self, options: &PipelineOptions) -> GocovResult<PipelineOutcome> {
        let packages = discover_packages(&self.resolver, &self.base, &options.packages)?;

        let mut files = Vec::new();
        for package in &packages {
            files.extend(package.source_files()?);
        }
        let jobs = TestOptions {
            jobs: options.jobs,
            ..TestOptions::default()
        }
        .effective_jobs();
        let exclusions = ExclusionMap::from_results(scan_files(&files, jobs))?;
        let marked: usize = exclusions.iter().map(|(_, lines)| lines.len()).sum();
        info!(files = files.len(), marked_lines = marked, "scanned sources");

        let merged = match &options.source {
            ProfileSource::Run(test_options) => {
                let tester = GoTester::new(test_options.clone());
                let tester = match &self.program {
                    Some(program) => tester.with_program(program),
                    None => tester,
                };
                tester.run(&packages)?
            }
            ProfileSource::Load(pattern) => load(pattern)?,
        };
        info!(units = merged.len(), "merged profiles");

        let applied = apply(merged.into_profiles(), &exclusions, &self.resolver);
        for kind in ExclusionKind::EXCLUDING {
            info!(%kind, blocks = applied.excluded_blocks(kind), "applied exclusions");
        }

        let verdict = if options.enforce {
            let verdict = enforce(&applied.kept, &self.resolver)?;
            info!(ok = verdict.ok, ranges = verdict.ranges.len(), "enforced");
            Some(verdict)
        } else {
            None
        };
        let summary = CoverageSummary::of(&applied.kept);

        Ok(PipelineOutcome {
            packages,
            exclusions,
            applied,
            verdict,
            summary,
        })
    }
}
