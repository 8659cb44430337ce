//! # Line Diff
//!
//! Line-granularity diff between two full-text snapshots.
//!
//! Ranges are 1-based and inclusive, matching the line numbering of both
//! editing surfaces. `added` ranges are numbered in the `after` text,
//! `removed` ranges in the `before` text; a removed range also carries the
//! line in the `after` text where the removal happened so it can be drawn.

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffTag};

/// Direction of a changed range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
}

/// A contiguous run of added or removed lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,

    /// First line of the range (1-based, inclusive)
    pub line_start: usize,

    /// Last line of the range (1-based, inclusive)
    pub line_end: usize,

    /// Line in the `after` text this range is anchored to. Equal to
    /// `line_start` for additions; for removals it may point one past the
    /// end of a shrunk document and must be clamped before use.
    pub anchor_line: usize,
}

impl DiffRange {
    /// Number of lines covered by the range
    pub fn len(&self) -> usize {
        self.line_end + 1 - self.line_start
    }

    pub fn is_empty(&self) -> bool {
        self.line_end < self.line_start
    }

    /// Anchor clamped into a document of `line_count` lines. A document with
    /// no lines still exposes line 1 as a target.
    pub fn clamped_anchor(&self, line_count: usize) -> usize {
        self.anchor_line.min(line_count).max(1)
    }
}

/// Added/removed line totals, used for badges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added_lines: usize,
    pub removed_lines: usize,
}

impl DiffSummary {
    pub fn is_unchanged(&self) -> bool {
        self.added_lines == 0 && self.removed_lines == 0
    }
}

/// Split text into lines. Empty text has no lines and a trailing newline
/// does not start a new one.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// Number of lines in `text` under the [`split_lines`] convention
pub fn line_count(text: &str) -> usize {
    text.lines().count()
}

/// Text of the 1-based `line`, if it exists
pub fn line_at(text: &str, line: usize) -> Option<&str> {
    line.checked_sub(1).and_then(|index| text.lines().nth(index))
}

/// Compute added/removed line ranges turning `before` into `after`.
///
/// Pure and deterministic: the same inputs always align the same way.
pub fn compute_diff(before: &str, after: &str) -> Vec<DiffRange> {
    let old = split_lines(before);
    let new = split_lines(after);

    let mut ranges = Vec::new();

    for op in capture_diff_slices(Algorithm::Myers, &old, &new) {
        let (tag, old_range, new_range) = op.as_tag_tuple();

        match tag {
            DiffTag::Equal => {}
            DiffTag::Delete => {
                ranges.push(removed(old_range.start, old_range.end, new_range.start));
            }
            DiffTag::Insert => {
                ranges.push(added(new_range.start, new_range.end));
            }
            DiffTag::Replace => {
                ranges.push(removed(old_range.start, old_range.end, new_range.start));
                ranges.push(added(new_range.start, new_range.end));
            }
        }
    }

    ranges
}

/// Totals over a list of ranges
pub fn summarize(ranges: &[DiffRange]) -> DiffSummary {
    ranges.iter().fold(DiffSummary::default(), |mut acc, range| {
        match range.kind {
            ChangeKind::Added => acc.added_lines += range.len(),
            ChangeKind::Removed => acc.removed_lines += range.len(),
        }
        acc
    })
}

fn added(start: usize, end: usize) -> DiffRange {
    DiffRange {
        kind: ChangeKind::Added,
        line_start: start + 1,
        line_end: end,
        anchor_line: start + 1,
    }
}

fn removed(start: usize, end: usize, new_position: usize) -> DiffRange {
    DiffRange {
        kind: ChangeKind::Removed,
        line_start: start + 1,
        line_end: end,
        anchor_line: new_position + 1,
    }
}
