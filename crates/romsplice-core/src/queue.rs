//! Write queue: merge, conflict detection, and sequential application.
//!
//! A flush cycle merges adjacent direct writes, sorts the queue by affected
//! range, sweeps it for overlapping pairs, filters out soft conflicts (pairs
//! whose overlapping bytes are identical regardless of application order),
//! and then applies every write in queue order against a running image
//! buffer. Hard conflicts are handed to a caller-supplied resolver before
//! the later write is applied; the default policy logs and proceeds, so the
//! last writer wins.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::write::Write;

/// One pair of writes whose affected ranges overlap with differing content.
///
/// `left` and `right` are post-merge queue indices, `left < right`, so
/// `right` identifies the write applied later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictPair {
    pub left: usize,
    pub right: usize,
    pub left_range: (u32, u32),
    pub right_range: (u32, u32),
}

/// Every hard conflict found in one queue.
#[derive(Debug, Clone, Default)]
pub struct ConflictReport {
    pub pairs: Vec<ConflictPair>,
}

impl ConflictReport {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The first conflict in which the write at `index` is the later party.
    pub fn conflict_with_earlier(&self, index: usize) -> Option<&ConflictPair> {
        self.pairs.iter().find(|pair| pair.right == index)
    }
}

/// What to do with a write that hard-conflicts with an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Apply anyway; the later write overwrites the overlap.
    Apply,
    /// Drop the write, leaving the earlier write's bytes in place.
    Skip,
}

/// Caller-supplied policy invoked before a conflicting write is applied.
///
/// The resolver sees the current image buffer, so it can checkpoint state
/// or inspect the bytes about to be overwritten; returning an error aborts
/// the flush.
pub trait ConflictResolver {
    fn resolve(&mut self, write: &Write, pair: &ConflictPair, image: &[u8]) -> Result<Resolution>;
}

/// Default policy: log the conflict and apply anyway (last-writer-wins).
pub struct LogAndProceed;

impl ConflictResolver for LogAndProceed {
    fn resolve(&mut self, write: &Write, pair: &ConflictPair, _image: &[u8]) -> Result<Resolution> {
        warn!(
            "{} at {:#x}..{:#x} conflicts with an earlier write at {:#x}..{:#x}, applying anyway",
            write.label(),
            pair.right_range.0,
            pair.right_range.1,
            pair.left_range.0,
            pair.left_range.1
        );
        Ok(Resolution::Apply)
    }
}

/// Strict policy: any hard conflict aborts the flush.
pub struct FailOnConflict;

impl ConflictResolver for FailOnConflict {
    fn resolve(&mut self, _write: &Write, pair: &ConflictPair, _image: &[u8]) -> Result<Resolution> {
        Err(Error::HardConflict {
            left_start: pair.left_range.0,
            left_end: pair.left_range.1,
            right_start: pair.right_range.0,
            right_end: pair.right_range.1,
        })
    }
}

/// Whether two overlapping writes are semantically harmless.
///
/// Applies the writes in both orders to two scratch buffers with distinct
/// fill values (`0xFF` and `0x00`) and compares the overlap window of the
/// results; identical bytes mean neither order can corrupt the other's
/// output. Writes with disjoint ranges are trivially soft.
pub fn is_soft_conflict(a: &Write, b: &Write) -> bool {
    let (a_start, a_end) = a.affected_range();
    let (b_start, b_end) = b.affected_range();
    let lo = a_start.max(b_start) as usize;
    let hi = a_end.min(b_end) as usize;
    if lo >= hi {
        return true;
    }

    let max_end = a_end.max(b_end) as usize;
    let ones = vec![0xFFu8; max_end];
    let zeros = vec![0x00u8; max_end];

    let Ok(a_then_b) = a.apply(&ones).and_then(|img| b.apply(&img)) else {
        return false;
    };
    let Ok(b_then_a) = b.apply(&zeros).and_then(|img| a.apply(&img)) else {
        return false;
    };

    a_then_b.get(lo..hi) == b_then_a.get(lo..hi)
}

/// Coalesce consecutive direct writes whose target regions are disjoint and
/// adjacent. Everything else passes through unmerged, in order.
pub fn merge_writes(writes: Vec<Write>) -> Vec<Write> {
    let mut merged: Vec<Write> = Vec::with_capacity(writes.len());
    for write in writes {
        let Write::Bytes(incoming) = write else {
            merged.push(write);
            continue;
        };
        if let Some(Write::Bytes(prev)) = merged.last() {
            if let Ok(combined) = prev.merge(&incoming) {
                *merged.last_mut().unwrap() = Write::Bytes(combined);
                continue;
            }
        }
        merged.push(Write::Bytes(incoming));
    }
    merged
}

/// Find every pair of writes with overlapping affected ranges that is not a
/// soft conflict.
///
/// Writes are swept in ascending range-start order; once a candidate's start
/// is past the current write's end, no later candidate can overlap it
/// either, so the inner scan exits early.
pub fn check_overlaps(writes: &[Write]) -> ConflictReport {
    let mut order: Vec<usize> = (0..writes.len()).collect();
    order.sort_by_key(|&i| writes[i].affected_range().0);

    let mut pairs = Vec::new();
    for (pos, &i) in order.iter().enumerate() {
        let (_, end_i) = writes[i].affected_range();
        for &j in &order[pos + 1..] {
            let (start_j, _) = writes[j].affected_range();
            if start_j >= end_i {
                break;
            }
            if is_soft_conflict(&writes[i], &writes[j]) {
                continue;
            }
            let (left, right) = if i < j { (i, j) } else { (j, i) };
            pairs.push(ConflictPair {
                left,
                right,
                left_range: writes[left].affected_range(),
                right_range: writes[right].affected_range(),
            });
        }
    }

    info!(
        "checked {} writes: {} conflicts found",
        writes.len(),
        pairs.len()
    );
    ConflictReport { pairs }
}

/// An exclusive, mutable queue of pending writes.
///
/// `flush` drains the queue destructively; it is not safe to call
/// concurrently with `enqueue` from another thread without external locking.
#[derive(Debug, Default)]
pub struct WriteQueue {
    pending: Vec<Write>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, write: impl Into<Write>) {
        self.pending.push(write.into());
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[Write] {
        &self.pending
    }

    /// Drain the queue onto `base` with the default last-writer-wins
    /// conflict policy, returning the patched image.
    pub fn flush(&mut self, base: &[u8]) -> Result<Vec<u8>> {
        self.flush_with(base, &mut LogAndProceed)
    }

    /// Drain the queue onto `base`: merge adjacent writes, detect conflicts,
    /// then apply each write in order against the running buffer, consulting
    /// `resolver` before any write flagged against an earlier one.
    pub fn flush_with(
        &mut self,
        base: &[u8],
        resolver: &mut dyn ConflictResolver,
    ) -> Result<Vec<u8>> {
        let writes = merge_writes(std::mem::take(&mut self.pending));
        info!("{} writes total after merging", writes.len());

        let report = check_overlaps(&writes);

        let mut image = base.to_vec();
        for (index, write) in writes.iter().enumerate() {
            debug!("applying {}", write.label());
            if let Some(pair) = report.conflict_with_earlier(index) {
                match resolver.resolve(write, pair, &image)? {
                    Resolution::Apply => {}
                    Resolution::Skip => {
                        warn!("skipping {} at resolver's request", write.label());
                        continue;
                    }
                }
            }
            image = write.apply(&image)?;
        }
        Ok(image)
    }
}
