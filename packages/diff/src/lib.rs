//! # Folio Diff
//!
//! Line-level diff between document snapshots and the decoration layers the
//! editing surfaces draw from it.
//!
//! ```rust,ignore
//! use folio_diff::{compute_diff, compute_decorations};
//!
//! let ranges = compute_diff("a\nb", "a\nb\nc");
//! assert_eq!(ranges[0].line_start, 3);
//!
//! let layers = compute_decorations(current, Some(saved), Some(branch_point));
//! ```

mod diff;
mod highlight;

pub use diff::{
    compute_diff, line_at, line_count, split_lines, summarize, ChangeKind, DiffRange, DiffSummary,
};
pub use highlight::{compute_decorations, decorate, DecorationLayer, LayerKind, LineDecoration};
