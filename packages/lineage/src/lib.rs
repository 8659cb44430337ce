//! # Folio Lineage
//!
//! Branching history of document snapshots.
//!
//! ```text
//! NewEvent ──▶ LineageStore ──▶ HistoryRepository ──▶ KeyValueStorage
//!                   │
//!                   └──▶ LineageView ──▶ calculate_graph_layout ──▶ GraphLayout
//! ```
//!
//! Every event stores the full document text. Events form a tree rooted at a
//! single parentless event; append order drives both version numbers and the
//! vertical order of the rendered graph.

pub mod errors;
pub mod event;
pub mod layout;
pub mod persistence;
pub mod store;

pub use errors::{LineageError, LineageResult};
pub use event::{DocumentId, EventId, EventType, LineageEvent, NewEvent};
pub use layout::{
    calculate_graph_layout, BezierCurve, GraphLayout, GraphLayoutLink, GraphLayoutNode,
    LayoutMetrics, Point,
};
pub use persistence::{latest_content_key, lineage_key, HistoryRepository};
pub use store::{LineageStore, LineageView, LoadState, LoadTicket};
