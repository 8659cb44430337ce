//! # Graph Layout
//!
//! Turns the append-ordered event list into a drawable tree.
//!
//! Rows are append positions (root on top, latest at the bottom). Columns are
//! lanes: the first child of an event continues its parent's lane, every later
//! sibling opens a new one. A lane is busy from the row its first link leaves
//! the parent until the last event of the chain, and may be reused only by a
//! branch whose parent sits strictly below that point.
//!
//! ```text
//! row 0   ● v1          lane 0
//!         │╲
//! row 1   ● │ v2        lane 0 ends here
//!           │
//! row 2     ● v3        lane 1
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::event::{EventId, LineageEvent};

/// One event placed on the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLayoutNode<'a> {
    pub event: &'a LineageEvent,
    pub column: usize,
    pub y_index: usize,
}

/// Parent → child edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLayoutLink {
    pub source_id: EventId,
    pub target_id: EventId,
    pub source_column: usize,
    pub source_y: usize,
    pub target_column: usize,
    pub target_y: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLayout<'a> {
    pub nodes: Vec<GraphLayoutNode<'a>>,
    pub links: Vec<GraphLayoutLink>,
    pub max_column: usize,
}

impl<'a> GraphLayout<'a> {
    pub fn node(&self, id: &EventId) -> Option<&GraphLayoutNode<'a>> {
        self.nodes.iter().find(|n| &n.event.id == id)
    }

    /// Number of lanes needed to draw the graph
    pub fn width(&self) -> usize {
        if self.nodes.is_empty() {
            0
        } else {
            self.max_column + 1
        }
    }
}

/// Lay out `events`, which must be in append order.
///
/// An event whose parent is missing, or appears later in the list, is laid
/// out as an extra root rather than dropped.
pub fn calculate_graph_layout(events: &[LineageEvent]) -> GraphLayout<'_> {
    let mut row_of: HashMap<&EventId, usize> = HashMap::with_capacity(events.len());
    for (row, event) in events.iter().enumerate() {
        row_of.entry(&event.id).or_insert(row);
    }

    let parent_rows: Vec<Option<usize>> = events
        .iter()
        .enumerate()
        .map(|(row, event)| {
            event
                .parent_id
                .as_ref()
                .and_then(|parent| row_of.get(parent).copied())
                .filter(|&parent_row| parent_row < row)
        })
        .collect();

    // First child in append order continues the parent's lane
    let mut continuation: Vec<Option<usize>> = vec![None; events.len()];
    for (row, parent_row) in parent_rows.iter().enumerate() {
        if let Some(p) = *parent_row {
            continuation[p].get_or_insert(row);
        }
    }

    // None = lane open, Some(row) = lane's chain ended at row
    let mut lanes: Vec<Option<usize>> = Vec::new();
    let mut columns: Vec<usize> = Vec::with_capacity(events.len());

    for row in 0..events.len() {
        let column = match parent_rows[row] {
            Some(p) if continuation[p] == Some(row) => columns[p],
            Some(p) => claim_lane(&mut lanes, p),
            None => claim_lane(&mut lanes, row),
        };

        lanes[column] = if continuation[row].is_some() {
            None
        } else {
            Some(row)
        };
        columns.push(column);
    }

    let nodes: Vec<GraphLayoutNode<'_>> = events
        .iter()
        .zip(&columns)
        .enumerate()
        .map(|(y_index, (event, &column))| GraphLayoutNode {
            event,
            column,
            y_index,
        })
        .collect();

    let links = parent_rows
        .iter()
        .enumerate()
        .filter_map(|(row, parent_row)| {
            parent_row.map(|p| GraphLayoutLink {
                source_id: events[p].id.clone(),
                target_id: events[row].id.clone(),
                source_column: columns[p],
                source_y: p,
                target_column: columns[row],
                target_y: row,
            })
        })
        .collect();

    let max_column = columns.iter().copied().max().unwrap_or(0);

    GraphLayout {
        nodes,
        links,
        max_column,
    }
}

/// Lowest lane whose chain ended strictly above `from_row`, or a new lane
fn claim_lane(lanes: &mut Vec<Option<usize>>, from_row: usize) -> usize {
    let free = lanes
        .iter()
        .position(|end| matches!(end, Some(end) if *end < from_row));

    match free {
        Some(column) => column,
        None => {
            lanes.push(None);
            lanes.len() - 1
        }
    }
}

/// Pixel geometry used to turn grid positions into drawing coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub row_height: f32,
    pub column_width: f32,
    pub padding: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            row_height: 40.0,
            column_width: 24.0,
            padding: 16.0,
        }
    }
}

impl LayoutMetrics {
    /// Center of the cell at (`column`, `y_index`)
    pub fn position(&self, column: usize, y_index: usize) -> Point {
        Point {
            x: self.padding + column as f32 * self.column_width,
            y: self.padding + y_index as f32 * self.row_height + self.row_height / 2.0,
        }
    }

    pub fn canvas_size(&self, layout: &GraphLayout<'_>) -> (f32, f32) {
        let width = self.padding * 2.0 + layout.width().saturating_sub(1) as f32 * self.column_width;
        let height = self.padding * 2.0 + layout.nodes.len() as f32 * self.row_height;
        (width, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Cubic curve leaving and entering vertically
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BezierCurve {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl BezierCurve {
    /// SVG path data (`M … C …`)
    pub fn to_svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

impl GraphLayoutNode<'_> {
    pub fn position(&self, metrics: &LayoutMetrics) -> Point {
        metrics.position(self.column, self.y_index)
    }
}

impl GraphLayoutLink {
    pub fn bezier(&self, metrics: &LayoutMetrics) -> BezierCurve {
        let start = metrics.position(self.source_column, self.source_y);
        let end = metrics.position(self.target_column, self.target_y);
        let bend = (end.y - start.y) / 2.0;

        BezierCurve {
            start,
            control1: Point {
                x: start.x,
                y: start.y + bend,
            },
            control2: Point {
                x: end.x,
                y: end.y - bend,
            },
            end,
        }
    }

    /// True when the link stays inside one lane
    pub fn is_straight(&self) -> bool {
        self.source_column == self.target_column
    }
}
