//! Transcript segmentation.
//!
//! Compact-boundary records partition the append-only transcript into
//! segments; the trigger kind selects which segment a sync should read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::record::RawRecord;

/// Which lifecycle event asked for the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Impending compaction: the segment before the most recent boundary.
    Compaction,
    /// Session end / clear: the segment after the last boundary to EOF.
    Other,
}

/// 0-indexed line numbers of every compact-boundary record, in file order
/// (strictly increasing by construction). Undecodable lines are skipped;
/// a missing file is an empty scan.
pub fn find_boundaries(path: &Path) -> Vec<usize> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Vec::new(),
    };
    let mut boundaries = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let Ok(line) = line else { break };
        if let Ok(rec) = serde_json::from_str::<RawRecord>(&line) {
            if rec.is_compact_boundary() {
                boundaries.push(i);
            }
        }
    }
    boundaries
}

fn count_lines(path: &Path) -> usize {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return 0,
    };
    BufReader::new(file).lines().map_while(Result::ok).count()
}

/// Half-open `[start, end)` line range to extract for the given trigger.
/// Deterministic for a given file: re-running yields the same range.
pub fn segment_for(path: &Path, kind: TriggerKind) -> (usize, usize) {
    let boundaries = find_boundaries(path);
    let total = count_lines(path);

    match kind {
        TriggerKind::Compaction => match boundaries.as_slice() {
            // The triggering compaction is the last boundary; the material
            // about to be destroyed sits between the previous one and it.
            [.., before, last] => (*before, *last),
            [only] => (0, *only),
            [] => (0, total),
        },
        TriggerKind::Other => match boundaries.last() {
            Some(last) => (*last, total),
            None => (0, total),
        },
    }
}
