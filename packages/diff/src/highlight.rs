//! Decoration layers drawn over the current document.
//!
//! Two independent layers are computed on every render pass: the last saved
//! state against the current text, and the branch point (the saved state's
//! parent) against the current text. Both are recomputed from scratch with
//! whatever canonical values are current at render time.

use serde::{Deserialize, Serialize};

use crate::diff::{compute_diff, line_count, ChangeKind};

/// Which pair of snapshots a layer compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    SavedVsCurrent,
    BranchPointVsCurrent,
}

/// Highlight on a single line of the current document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDecoration {
    pub line: usize,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorationLayer {
    pub kind: LayerKind,
    pub decorations: Vec<LineDecoration>,
}

impl DecorationLayer {
    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    /// Decorations landing on `line`
    pub fn at_line(&self, line: usize) -> impl Iterator<Item = &LineDecoration> {
        self.decorations.iter().filter(move |d| d.line == line)
    }
}

/// Build one layer comparing `before` to the `current` text.
///
/// Added lines are tagged one by one. A removed run collapses into a single
/// marker at its anchor, clamped so it never points past the end of a
/// document that shrank.
pub fn decorate(kind: LayerKind, before: &str, current: &str) -> DecorationLayer {
    let current_lines = line_count(current);
    let mut decorations: Vec<LineDecoration> = Vec::new();

    for range in compute_diff(before, current) {
        match range.kind {
            ChangeKind::Added => {
                decorations.extend((range.line_start..=range.line_end).map(|line| {
                    LineDecoration {
                        line,
                        kind: ChangeKind::Added,
                    }
                }));
            }
            ChangeKind::Removed => {
                let marker = LineDecoration {
                    line: range.clamped_anchor(current_lines),
                    kind: ChangeKind::Removed,
                };
                if !decorations.contains(&marker) {
                    decorations.push(marker);
                }
            }
        }
    }

    decorations.sort_by_key(|d| (d.line, d.kind == ChangeKind::Added));

    DecorationLayer { kind, decorations }
}

/// Compute both layers. A missing snapshot (nothing saved yet, or the saved
/// state is the root) yields no layer for that comparison.
pub fn compute_decorations(
    current: &str,
    saved: Option<&str>,
    branch_point: Option<&str>,
) -> Vec<DecorationLayer> {
    let mut layers = Vec::with_capacity(2);

    if let Some(saved) = saved {
        layers.push(decorate(LayerKind::SavedVsCurrent, saved, current));
    }
    if let Some(branch_point) = branch_point {
        layers.push(decorate(LayerKind::BranchPointVsCurrent, branch_point, current));
    }

    layers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_lines_tagged_individually() {
        let layer = decorate(LayerKind::SavedVsCurrent, "a", "a\nb\nc");
        assert_eq!(
            layer.decorations,
            vec![
                LineDecoration { line: 2, kind: ChangeKind::Added },
                LineDecoration { line: 3, kind: ChangeKind::Added },
            ]
        );
    }

    #[test]
    fn test_removed_marker_clamped_into_shrunk_document() {
        let layer = decorate(LayerKind::SavedVsCurrent, "a\nb\nc\nd", "a");
        assert_eq!(
            layer.decorations,
            vec![LineDecoration { line: 1, kind: ChangeKind::Removed }]
        );
    }

    #[test]
    fn test_removed_marker_on_empty_document_points_at_line_one() {
        let layer = decorate(LayerKind::BranchPointVsCurrent, "a\nb", "");
        assert_eq!(layer.decorations.len(), 1);
        assert_eq!(layer.decorations[0].line, 1);
    }

    #[test]
    fn test_layers_are_independent() {
        let layers = compute_decorations("# Title\nAlt", Some("# Title\nAlt"), Some("# Title"));
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].kind, LayerKind::SavedVsCurrent);
        assert!(layers[0].is_empty());
        assert_eq!(layers[1].kind, LayerKind::BranchPointVsCurrent);
        assert_eq!(layers[1].at_line(2).count(), 1);
    }

    #[test]
    fn test_missing_snapshots_produce_no_layers() {
        assert!(compute_decorations("text", None, None).is_empty());
    }
}
