use chrono::Utc;
use folio_lineage::{calculate_graph_layout, EventId, EventType, LineageEvent};
use proptest::prelude::*;

fn event(index: usize, parent: Option<usize>) -> LineageEvent {
    LineageEvent {
        id: EventId::from(format!("e{}", index).as_str()),
        parent_id: parent.map(|p| EventId::from(format!("e{}", p).as_str())),
        timestamp: Utc::now(),
        event_type: EventType::Save,
        content: format!("content {}", index),
        summary: None,
        version: index as u64 + 1,
    }
}

/// Build a history from parent indices; `parents[i]` is the parent of event i + 1
fn history(parents: &[usize]) -> Vec<LineageEvent> {
    let mut events = vec![event(0, None)];
    for (i, parent) in parents.iter().enumerate() {
        events.push(event(i + 1, Some(*parent)));
    }
    events
}

/// Row interval each chain occupies in its column: from the row its incoming
/// link leaves the parent to the row of its last event
fn chain_intervals(parents: &[Option<usize>], columns: &[usize]) -> Vec<(usize, usize, usize)> {
    let n = parents.len();
    let mut first_child: Vec<Option<usize>> = vec![None; n];
    for (row, parent) in parents.iter().enumerate() {
        if let Some(p) = parent {
            first_child[*p].get_or_insert(row);
        }
    }

    let mut intervals = Vec::new();
    for head in 0..n {
        let continues = parents[head]
            .map(|p| first_child[p] == Some(head))
            .unwrap_or(false);
        if continues {
            continue;
        }

        let start = parents[head].unwrap_or(head);
        let mut end = head;
        while let Some(next) = first_child[end] {
            end = next;
        }
        intervals.push((columns[head], start, end));
    }
    intervals
}

#[test]
fn test_three_siblings_of_root_get_distinct_columns() {
    let events = history(&[0, 0, 0]);
    let layout = calculate_graph_layout(&events);

    let columns: Vec<usize> = layout.nodes.iter().map(|n| n.column).collect();
    assert_eq!(columns, vec![0, 0, 1, 2]);
    assert_eq!(layout.max_column, 2);
    assert_eq!(layout.links.len(), 3);
}

#[test]
fn test_interleaved_branches_from_root() {
    // Two branches off the root, saved alternately
    let events = history(&[0, 0, 1, 2, 3, 4]);
    let layout = calculate_graph_layout(&events);

    let columns: Vec<usize> = layout.nodes.iter().map(|n| n.column).collect();
    assert_eq!(columns, vec![0, 0, 1, 0, 1, 0, 1]);
}

#[test]
fn test_links_point_from_parent_cell_to_child_cell() {
    let events = history(&[0, 0, 2]);
    let layout = calculate_graph_layout(&events);

    for link in &layout.links {
        let source = layout.node(&link.source_id).unwrap();
        let target = layout.node(&link.target_id).unwrap();
        assert_eq!((link.source_column, link.source_y), (source.column, source.y_index));
        assert_eq!((link.target_column, link.target_y), (target.column, target.y_index));
        assert!(link.source_y < link.target_y);
    }
}

#[test]
fn test_layout_serializes_camel_case() {
    let events = history(&[0]);
    let layout = calculate_graph_layout(&events);
    let json = serde_json::to_value(&layout).unwrap();

    assert_eq!(json["maxColumn"], 0);
    assert_eq!(json["nodes"][1]["yIndex"], 1);
    assert_eq!(json["links"][0]["sourceId"], "e0");
    assert_eq!(json["links"][0]["targetY"], 1);
}

proptest! {
    #[test]
    fn prop_open_branches_never_share_a_column(
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..60)
    ) {
        let parents: Vec<usize> = picks
            .iter()
            .enumerate()
            .map(|(i, pick)| pick.index(i + 1))
            .collect();
        let events = history(&parents);
        let layout = calculate_graph_layout(&events);

        prop_assert_eq!(layout.nodes[0].column, 0);
        prop_assert_eq!(layout.links.len(), parents.len());

        let columns: Vec<usize> = layout.nodes.iter().map(|n| n.column).collect();
        prop_assert_eq!(
            layout.max_column,
            columns.iter().copied().max().unwrap_or(0)
        );

        let all_parents: Vec<Option<usize>> = std::iter::once(None)
            .chain(parents.iter().map(|p| Some(*p)))
            .collect();
        let intervals = chain_intervals(&all_parents, &columns);

        for (i, a) in intervals.iter().enumerate() {
            for b in intervals.iter().skip(i + 1) {
                if a.0 == b.0 {
                    let disjoint = a.2 < b.1 || b.2 < a.1;
                    prop_assert!(disjoint, "chains {:?} and {:?} overlap", a, b);
                }
            }
        }
    }
}
