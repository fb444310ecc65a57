//! Profile Merger
//!
//! Folds per-package profiles into one profile per source unit. Identical
//! spans combine their hit counts by mode, disjoint blocks are unioned, and
//! anything else (same start with a different end or statement count, or
//! partially overlapping spans) is a structural mismatch.
//!
//! [`ProfileSet`] is the accumulator; [`MergeActor`] owns one on a dedicated
//! thread so concurrent test workers can feed it over a channel.

use crate::profile::{Block, Mode, Profile};
use crate::result::{GocovError, GocovResult};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Sender};
use std::thread::JoinHandle;
use tracing::{debug, trace};

/// Merge `incoming` into a copy of `existing`.
///
/// Profile order is insertion order: a unit seen for the first time is
/// appended.
pub fn merge(existing: &[Profile], incoming: &Profile) -> GocovResult<Vec<Profile>> {
    let mut set = ProfileSet::from(existing.to_vec());
    set.add(incoming.clone())?;
    Ok(set.into_profiles())
}

/// Combine two sorted block lists of the same unit
pub fn merge_blocks(
    unit: &str,
    mode: Mode,
    existing: &[Block],
    incoming: &[Block],
) -> GocovResult<Vec<Block>> {
    let mismatch = |a: &Block, b: &Block| GocovError::StructuralMismatch {
        unit: unit.to_string(),
        existing: a.to_string(),
        incoming: b.to_string(),
    };

    let mut merged: Vec<Block> = Vec::with_capacity(existing.len().max(incoming.len()));
    let (mut i, mut j) = (0, 0);
    loop {
        let next = match (existing.get(i), incoming.get(j)) {
            (Some(a), Some(b)) => match a.start().cmp(&b.start()) {
                Ordering::Less => {
                    i += 1;
                    *a
                }
                Ordering::Greater => {
                    j += 1;
                    *b
                }
                Ordering::Equal => {
                    if !a.same_shape(b) {
                        return Err(mismatch(a, b));
                    }
                    i += 1;
                    j += 1;
                    a.with_count(mode.combine(a.count, b.count))
                }
            },
            (Some(a), None) => {
                i += 1;
                *a
            }
            (None, Some(b)) => {
                j += 1;
                *b
            }
            (None, None) => break,
        };

        if let Some(prev) = merged.last() {
            if prev.end() > next.start() {
                return Err(mismatch(prev, &next));
            }
        }
        merged.push(next);
    }
    Ok(merged)
}

/// Accumulated profiles, one per source unit, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSet {
    profiles: Vec<Profile>,
}

impl ProfileSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counting mode shared by every profile in the set
    #[must_use]
    pub fn mode(&self) -> Option<Mode> {
        self.profiles.first().map(|p| p.mode)
    }

    /// Merge one profile in; on error the set is left unchanged.
    ///
    /// Every unit must use the mode of the first profile added, so the set
    /// always dumps as a single-mode artifact.
    pub fn add(&mut self, mut incoming: Profile) -> GocovResult<()> {
        if let Some(mode) = self.mode() {
            if mode != incoming.mode {
                return Err(GocovError::ModeMismatch {
                    unit: incoming.unit,
                    existing: mode.to_string(),
                    incoming: incoming.mode.to_string(),
                });
            }
        }
        incoming.blocks.sort_by_key(Block::start);

        let Some(index) = self.profiles.iter().position(|p| p.unit == incoming.unit) else {
            trace!(unit = %incoming.unit, blocks = incoming.blocks.len(), "new unit");
            // a lone profile must still be internally consistent
            let blocks = merge_blocks(&incoming.unit, incoming.mode, &[], &incoming.blocks)?;
            self.profiles.push(incoming.with_blocks(blocks));
            return Ok(());
        };

        let current = &mut self.profiles[index];
        let blocks = merge_blocks(&current.unit, current.mode, &current.blocks, &incoming.blocks)?;
        current.blocks = blocks;
        Ok(())
    }

    /// Merge several profiles in order, stopping at the first error
    pub fn extend(&mut self, profiles: impl IntoIterator<Item = Profile>) -> GocovResult<()> {
        for profile in profiles {
            self.add(profile)?;
        }
        Ok(())
    }

    /// Profiles merged so far
    #[must_use]
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Number of source units
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when nothing was merged
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Take the profiles out
    #[must_use]
    pub fn into_profiles(self) -> Vec<Profile> {
        self.profiles
    }
}

impl From<Vec<Profile>> for ProfileSet {
    fn from(profiles: Vec<Profile>) -> Self {
        Self { profiles }
    }
}

/// Profiles from one producer, tagged with its position in the input order
#[derive(Debug)]
struct Batch {
    seq: usize,
    profiles: Vec<Profile>,
}

/// Single owner of a [`ProfileSet`] running on its own thread.
///
/// Producers send batches tagged with a sequence number; batches are merged
/// strictly in sequence order, so the result does not depend on which
/// producer finishes first. Every sequence number below the highest one sent
/// must eventually be sent (an empty batch is fine).
#[derive(Debug)]
pub struct MergeActor {
    sender: Sender<Batch>,
    handle: JoinHandle<GocovResult<ProfileSet>>,
}

/// Cloneable handle for sending batches to a [`MergeActor`]
#[derive(Debug, Clone)]
pub struct MergeSender {
    sender: Sender<Batch>,
}

impl MergeSender {
    /// Send the profiles of producer `seq`; false if the actor is gone
    pub fn send(&self, seq: usize, profiles: Vec<Profile>) -> bool {
        self.sender.send(Batch { seq, profiles }).is_ok()
    }
}

impl MergeActor {
    /// Start the actor thread
    pub fn spawn() -> GocovResult<Self> {
        let (sender, receiver) = channel::<Batch>();
        let handle = std::thread::Builder::new()
            .name("gocov-merge".to_string())
            .spawn(move || {
                let mut set = ProfileSet::new();
                let mut pending: BTreeMap<usize, Vec<Profile>> = BTreeMap::new();
                let mut next_seq = 0;
                let mut failure: Option<GocovError> = None;

                for batch in receiver {
                    let _ = pending.insert(batch.seq, batch.profiles);
                    while let Some(profiles) = pending.remove(&next_seq) {
                        debug!(seq = next_seq, profiles = profiles.len(), "merging batch");
                        next_seq += 1;
                        if failure.is_none() {
                            if let Err(e) = set.extend(profiles) {
                                failure = Some(e);
                            }
                        }
                    }
                }

                if let Some(e) = failure {
                    return Err(e);
                }
                // batches after a gap in the sequence are merged in order
                for (_, profiles) in pending {
                    set.extend(profiles)?;
                }
                Ok(set)
            })?;
        Ok(Self { sender, handle })
    }

    /// Handle for producers
    #[must_use]
    pub fn sender(&self) -> MergeSender {
        MergeSender {
            sender: self.sender.clone(),
        }
    }

    /// Close the channel and wait for the merged result.
    ///
    /// All [`MergeSender`] clones must be dropped first.
    pub fn finish(self) -> GocovResult<ProfileSet> {
        drop(self.sender);
        self.handle.join().map_err(|_| GocovError::WorkerPanicked {
            worker: "merge".to_string(),
        })?
    }
}
