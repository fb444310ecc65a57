//! Exclusion Applier
//!
//! Splits merged profiles into the blocks enforcement looks at and the
//! blocks hidden by an annotation. A block is hidden only when it was never
//! executed; the kind comes from the first marked line of its span.

use crate::annotation::ExclusionKind;
use crate::profile::Profile;
use crate::result::GocovError;
use crate::scanner::{first_kind, ExclusionMap};
use crate::source::SourceResolver;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Result of [`apply`]
#[derive(Debug, Default)]
pub struct Applied {
    /// Profiles with every block that still counts for enforcement
    pub kept: Vec<Profile>,
    /// Hidden blocks per kind, grouped by source unit like `kept`
    pub excluded: BTreeMap<ExclusionKind, Vec<Profile>>,
    /// Units that could not be mapped to a file; their profiles are kept whole
    pub unresolved: Vec<GocovError>,
}

impl Applied {
    /// Excluded profiles of one kind (empty for `None`)
    #[must_use]
    pub fn excluded_of(&self, kind: ExclusionKind) -> &[Profile] {
        self.excluded.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of hidden blocks of one kind
    #[must_use]
    pub fn excluded_blocks(&self, kind: ExclusionKind) -> usize {
        self.excluded_of(kind).iter().map(|p| p.blocks.len()).sum()
    }
}

/// Partition blocks of `profiles` using the scanned exclusions.
///
/// Profile order and per-unit grouping are preserved in every output.
/// A unit whose file has no exclusions passes through unchanged.
pub fn apply(
    profiles: Vec<Profile>,
    exclusions: &ExclusionMap,
    resolver: &dyn SourceResolver,
) -> Applied {
    let mut applied = Applied::default();

    for profile in profiles {
        let path = match resolver.resolve(&profile.unit) {
            Ok(path) => path,
            Err(e) => {
                warn!(unit = %profile.unit, "no source file for unit, keeping all blocks");
                applied.unresolved.push(e);
                applied.kept.push(profile);
                continue;
            }
        };
        let Some(lines) = exclusions.get(&path) else {
            applied.kept.push(profile);
            continue;
        };

        let mut kept = profile.empty_like();
        let mut hidden: BTreeMap<ExclusionKind, Profile> = ExclusionKind::EXCLUDING
            .into_iter()
            .map(|kind| (kind, profile.empty_like()))
            .collect();

        for block in &profile.blocks {
            let kind = first_kind(lines, block.start_line..=block.end_line);
            match hidden.get_mut(&kind) {
                Some(bucket) if !block.is_covered() => bucket.blocks.push(*block),
                _ => kept.blocks.push(*block),
            }
        }

        applied.kept.push(kept);
        for (kind, bucket) in hidden {
            if !bucket.blocks.is_empty() {
                applied.excluded.entry(kind).or_default().push(bucket);
            }
        }
    }

    for kind in ExclusionKind::EXCLUDING {
        debug!(%kind, blocks = applied.excluded_blocks(kind), "excluded");
    }
    applied
}
