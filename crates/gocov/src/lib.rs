//! gocov: enforceable Go test coverage
//!
//! Runs (or loads) per-package `go test` coverage profiles, merges them into
//! one profile per source file, drops never-executed code the developer
//! annotated with `// notest` or `// notestdept`, and reports whatever
//! untested code remains.
//!
//! # Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                        GOCOV Pipeline                            |
//! +------------------------------------------------------------------+
//! |  .go sources --> syntax --> scanner --> ExclusionMap --+         |
//! |                                                        v         |
//! |  go test / --load --> profile --> merge --> apply --> enforce    |
//! |                                   (actor)    |          |        |
//! |                                              v          v        |
//! |                                    excluded profiles  Verdict    |
//! +------------------------------------------------------------------+
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gocov::{Pipeline, PipelineOptions, ProfileSource};
//! use std::path::Path;
//!
//! let pipeline = Pipeline::discover(Path::new("."))?;
//! let outcome = pipeline.run(&PipelineOptions {
//!     source: ProfileSource::Load("cover/*.out".to_string()),
//!     enforce: true,
//!     ..PipelineOptions::default()
//! })?;
//! if let Some(verdict) = outcome.verdict {
//!     assert!(verdict.ok, "{}", verdict.report);
//! }
//! # Ok::<(), gocov::GocovError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod annotation;
mod apply;
mod enforce;
mod merge;
mod pipeline;
mod profile;
mod result;
mod scanner;
mod source;
/// Go lexer, statement/block tree and visitor
pub mod syntax;
mod tester;

pub use annotation::{classify_comment, ExclusionKind};
pub use apply::{apply, Applied};
pub use enforce::{
    enforce, undent, untested_locations, untested_ranges, CoverageSummary, UntestedRange, Verdict,
};
pub use merge::{merge, merge_blocks, MergeActor, MergeSender, ProfileSet};
pub use pipeline::{Pipeline, PipelineOptions, PipelineOutcome, ProfileSource};
pub use profile::{
    dump_profiles, parse_profiles, read_profiles, write_profiles, Block, Mode, Profile,
};
pub use result::{GocovError, GocovResult};
pub use scanner::{
    annotation_scopes, first_kind, scan_file, scan_files, scan_source, scan_tree, AnnotationScope,
    ExclusionMap, FileExclusions,
};
pub use source::{
    canonical_path, discover_packages, display_path, parse_module_directive, ModuleResolver,
    PackageSpec, SourceResolver, GO_MOD,
};
pub use tester::{coverfile_name, load, GoTester, TestOptions, COVERAGE_FILE, UNCOVERAGE_FILE};
