//! # Lineage Store
//!
//! Owns the event log of the currently loaded document.
//!
//! ## Lifecycle
//!
//! ```text
//! Unloaded ──begin_load(A)──▶ Loading(A) ──complete_load──▶ Loaded(A)
//!                                 ▲                            │
//!                                 └──────── begin_load(B) ─────┘
//! ```
//!
//! Every mutation names the document it expects. A mutation against a store
//! that is still loading, or that has since switched to another document, is
//! dropped with a warning: the UI state that issued it is already stale.
//!
//! ## Invariants
//!
//! - The log is append-only apart from summary amendments and whole-log
//!   clears; at most one event is a root.
//! - `version` is `last appended version + 1`, independent of ancestry.
//! - "Latest" is the last element of the log, not the deepest node.
//! - Every successful mutation persists the entire list. A failed write keeps
//!   the in-memory log and marks the store dirty until [`LineageStore::flush`]
//!   succeeds.

use std::sync::Arc;

use chrono::Utc;
use folio_common::KeyValueStorage;

use crate::errors::{LineageError, LineageResult};
use crate::event::{DocumentId, EventId, EventType, LineageEvent, NewEvent};
use crate::persistence::HistoryRepository;

/// Where the store is in its load lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading { document: DocumentId, serial: u64 },
    Loaded { document: DocumentId },
}

/// Handle for an in-flight load; only the most recent ticket can complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    document: DocumentId,
    serial: u64,
}

impl LoadTicket {
    pub fn document(&self) -> &DocumentId {
        &self.document
    }
}

/// Event log for one document at a time
#[derive(Debug)]
pub struct LineageStore {
    repository: HistoryRepository,
    state: LoadState,
    events: Vec<LineageEvent>,
    next_serial: u64,
    dirty: bool,
}

impl LineageStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            repository: HistoryRepository::new(storage),
            state: LoadState::Unloaded,
            events: Vec::new(),
            next_serial: 0,
            dirty: false,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Document whose history is loaded, if loading finished
    pub fn loaded_document(&self) -> Option<&DocumentId> {
        match &self.state {
            LoadState::Loaded { document } => Some(document),
            _ => None,
        }
    }

    pub fn is_loaded_for(&self, document: &DocumentId) -> bool {
        self.loaded_document() == Some(document)
    }

    /// True when the in-memory log has changes storage has not accepted yet
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Start loading `document`. Invalidates any load still in flight and
    /// any mutation aimed at the previously loaded document.
    pub fn begin_load(&mut self, document: DocumentId) -> LoadTicket {
        if self.dirty {
            if let Some(previous) = self.loaded_document().cloned() {
                tracing::warn!(
                    "[LineageStore] switching away from {} with unpersisted history, retrying write",
                    previous
                );
                self.persist(&previous);
            }
        }

        self.next_serial += 1;
        self.events.clear();
        self.dirty = false;
        self.state = LoadState::Loading {
            document: document.clone(),
            serial: self.next_serial,
        };

        LoadTicket {
            document,
            serial: self.next_serial,
        }
    }

    /// Finish a load started with [`LineageStore::begin_load`]. Returns the
    /// number of events read.
    pub fn complete_load(&mut self, ticket: LoadTicket) -> LineageResult<usize> {
        match &self.state {
            LoadState::Loading { document, serial }
                if *document == ticket.document && *serial == ticket.serial => {}
            _ => {
                tracing::warn!(
                    "[LineageStore] dropping superseded load for {}",
                    ticket.document
                );
                return Err(LineageError::StaleLoad(ticket.document));
            }
        }

        self.events = self.repository.read(&ticket.document);
        tracing::debug!(
            "[LineageStore] loaded {} events for {}",
            self.events.len(),
            ticket.document
        );
        self.state = LoadState::Loaded {
            document: ticket.document,
        };

        Ok(self.events.len())
    }

    /// Load `document` in one step
    pub fn load(&mut self, document: DocumentId) -> LineageResult<usize> {
        let ticket = self.begin_load(document);
        self.complete_load(ticket)
    }

    pub fn unload(&mut self) {
        self.events.clear();
        self.dirty = false;
        self.state = LoadState::Unloaded;
    }

    /// Read access to the history of `document`; `None` unless that exact
    /// document is loaded
    pub fn view(&self, document: &DocumentId) -> Option<LineageView<'_>> {
        if self.is_loaded_for(document) {
            Some(LineageView {
                events: &self.events,
            })
        } else {
            None
        }
    }

    /// Append an event. Version is `last version + 1` regardless of parent.
    pub fn add_event(
        &mut self,
        document: &DocumentId,
        new_event: NewEvent,
    ) -> LineageResult<LineageEvent> {
        self.guard(document, "add_event")?;

        match &new_event.parent_id {
            None if !self.events.is_empty() => {
                tracing::warn!("[LineageStore] rejected second root for {}", document);
                return Err(LineageError::RootExists);
            }
            Some(parent) if !self.events.iter().any(|e| &e.id == parent) => {
                tracing::warn!("[LineageStore] rejected event with unknown parent {}", parent);
                return Err(LineageError::EventNotFound(parent.clone()));
            }
            _ => {}
        }

        let last = self.events.last();
        let version = last.map(|e| e.version).unwrap_or(0) + 1;
        let now = Utc::now();
        let timestamp = last.map(|e| e.timestamp.max(now)).unwrap_or(now);

        let event = LineageEvent {
            id: EventId::generate(),
            parent_id: new_event.parent_id,
            timestamp,
            event_type: new_event.event_type,
            content: new_event.content,
            summary: new_event.summary,
            version,
        };

        tracing::info!(
            "[LineageStore] {} appended v{} ({}) to {}",
            event.event_type,
            event.version,
            event.id,
            document
        );

        self.events.push(event.clone());
        self.persist(document);

        Ok(event)
    }

    /// Append a copy of event `id` as the new latest event, parented to `id`
    pub fn restore_as_latest(
        &mut self,
        document: &DocumentId,
        id: &EventId,
        summary: Option<String>,
    ) -> LineageResult<LineageEvent> {
        self.guard(document, "restore_as_latest")?;

        let source = self
            .events
            .iter()
            .find(|e| &e.id == id)
            .ok_or_else(|| LineageError::EventNotFound(id.clone()))?;

        let summary = summary.or_else(|| Some(format!("Restored from v{}", source.version)));
        let new_event = NewEvent {
            content: source.content.clone(),
            event_type: EventType::Save,
            parent_id: Some(source.id.clone()),
            summary,
        };

        self.add_event(document, new_event)
    }

    /// Discard the whole log and its persisted copy
    pub fn clear_events(&mut self, document: &DocumentId) -> LineageResult<()> {
        self.guard(document, "clear_events")?;

        self.events.clear();
        match self.repository.remove(document) {
            Ok(()) => self.dirty = false,
            Err(e) => {
                tracing::error!("[LineageStore] failed to clear stored history for {}: {}", document, e);
                self.dirty = true;
            }
        }

        tracing::info!("[LineageStore] cleared history for {}", document);
        Ok(())
    }

    /// Discard the log and seed it with a single root holding `content`
    pub fn reset_with_content(
        &mut self,
        document: &DocumentId,
        content: impl Into<String>,
        summary: Option<String>,
    ) -> LineageResult<LineageEvent> {
        self.guard(document, "reset_with_content")?;

        self.events.clear();
        let mut root = NewEvent::save(content, None);
        root.summary = summary;

        self.add_event(document, root)
    }

    /// Amend the annotation of one event in place
    pub fn update_event_summary(
        &mut self,
        document: &DocumentId,
        id: &EventId,
        summary: Option<String>,
    ) -> LineageResult<()> {
        self.guard(document, "update_event_summary")?;

        let event = self
            .events
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| LineageError::EventNotFound(id.clone()))?;

        event.summary = summary.filter(|s| !s.trim().is_empty());
        self.persist(document);

        Ok(())
    }

    /// Retry a write that failed earlier. Returns true if storage is now in
    /// sync with memory.
    pub fn flush(&mut self, document: &DocumentId) -> LineageResult<bool> {
        self.guard(document, "flush")?;

        if self.dirty {
            self.persist(document);
        }
        Ok(!self.dirty)
    }

    fn guard(&self, document: &DocumentId, operation: &str) -> LineageResult<()> {
        match &self.state {
            LoadState::Loaded { document: loaded } if loaded == document => Ok(()),
            LoadState::Loaded { document: loaded } => {
                tracing::warn!(
                    "[LineageStore] {} for {} dropped, {} is loaded",
                    operation,
                    document,
                    loaded
                );
                Err(LineageError::DocumentMismatch {
                    expected: document.clone(),
                    loaded: loaded.clone(),
                })
            }
            LoadState::Loading { .. } | LoadState::Unloaded => {
                tracing::warn!(
                    "[LineageStore] {} for {} dropped, history not loaded",
                    operation,
                    document
                );
                Err(LineageError::NotLoaded)
            }
        }
    }

    fn persist(&mut self, document: &DocumentId) {
        match self.repository.write(document, &self.events) {
            Ok(()) => self.dirty = false,
            Err(e) => {
                tracing::error!(
                    "[LineageStore] failed to persist {} events for {}: {}",
                    self.events.len(),
                    document,
                    e
                );
                self.dirty = true;
            }
        }
    }
}

/// Read-only window onto a loaded history
#[derive(Debug, Clone, Copy)]
pub struct LineageView<'a> {
    events: &'a [LineageEvent],
}

impl<'a> LineageView<'a> {
    /// All events in append order
    pub fn events(&self) -> &'a [LineageEvent] {
        self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Last appended event
    pub fn latest(&self) -> Option<&'a LineageEvent> {
        self.events.last()
    }

    pub fn is_latest(&self, id: &EventId) -> bool {
        self.latest().map(|e| &e.id == id).unwrap_or(false)
    }

    pub fn root(&self) -> Option<&'a LineageEvent> {
        self.events.iter().find(|e| e.is_root())
    }

    pub fn by_id(&self, id: &EventId) -> Option<&'a LineageEvent> {
        self.events.iter().find(|e| &e.id == id)
    }

    pub fn by_version(&self, version: u64) -> Option<&'a LineageEvent> {
        self.events.iter().find(|e| e.version == version)
    }

    /// The event `id` was created from
    pub fn previous(&self, id: &EventId) -> Option<&'a LineageEvent> {
        self.by_id(id)
            .and_then(|e| e.parent_id.as_ref())
            .and_then(|parent| self.by_id(parent))
    }

    /// Direct children of `id` in append order
    pub fn children(&self, id: &EventId) -> Vec<&'a LineageEvent> {
        self.events
            .iter()
            .filter(|e| e.parent_id.as_ref() == Some(id))
            .collect()
    }

    /// Number of ancestors of `id` (root has depth 0)
    pub fn depth(&self, id: &EventId) -> Option<usize> {
        let mut current = self.by_id(id)?;
        let mut depth = 0;

        while let Some(parent) = current.parent_id.as_ref().and_then(|p| self.by_id(p)) {
            depth += 1;
            current = parent;
            if depth > self.events.len() {
                // Corrupt history with a parent cycle
                return None;
            }
        }

        Some(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::MemoryStorage;

    fn loaded_store(document: &DocumentId) -> LineageStore {
        let mut store = LineageStore::new(Arc::new(MemoryStorage::new()));
        store.load(document.clone()).unwrap();
        store
    }

    #[test]
    fn test_store_starts_unloaded() {
        let store = LineageStore::new(Arc::new(MemoryStorage::new()));
        assert_eq!(store.state(), &LoadState::Unloaded);
        assert!(store.view(&DocumentId::new("a")).is_none());
    }

    #[test]
    fn test_versions_follow_append_order() {
        let doc = DocumentId::new("doc");
        let mut store = loaded_store(&doc);

        let root = store.add_event(&doc, NewEvent::save("a", None)).unwrap();
        let v2 = store
            .add_event(&doc, NewEvent::save("b", Some(root.id.clone())))
            .unwrap();
        let v3 = store
            .add_event(&doc, NewEvent::save("c", Some(root.id.clone())))
            .unwrap();

        assert_eq!((root.version, v2.version, v3.version), (1, 2, 3));
        assert!(v3.timestamp >= v2.timestamp);
    }

    #[test]
    fn test_second_root_rejected() {
        let doc = DocumentId::new("doc");
        let mut store = loaded_store(&doc);

        store.add_event(&doc, NewEvent::save("a", None)).unwrap();
        let result = store.add_event(&doc, NewEvent::save("b", None));

        assert_eq!(result, Err(LineageError::RootExists));
        assert_eq!(store.view(&doc).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let doc = DocumentId::new("doc");
        let mut store = loaded_store(&doc);

        let result = store.add_event(&doc, NewEvent::save("a", Some(EventId::from("ghost"))));
        assert_eq!(result, Err(LineageError::EventNotFound(EventId::from("ghost"))));
    }

    #[test]
    fn test_mutation_while_loading_is_dropped() {
        let doc = DocumentId::new("doc");
        let mut store = LineageStore::new(Arc::new(MemoryStorage::new()));

        let ticket = store.begin_load(doc.clone());
        assert_eq!(
            store.add_event(&doc, NewEvent::save("a", None)),
            Err(LineageError::NotLoaded)
        );

        store.complete_load(ticket).unwrap();
        assert!(store.view(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_superseded_load_cannot_complete() {
        let mut store = LineageStore::new(Arc::new(MemoryStorage::new()));

        let first = store.begin_load(DocumentId::new("a"));
        let second = store.begin_load(DocumentId::new("b"));

        assert_eq!(
            store.complete_load(first),
            Err(LineageError::StaleLoad(DocumentId::new("a")))
        );
        store.complete_load(second).unwrap();
        assert!(store.is_loaded_for(&DocumentId::new("b")));
    }

    #[test]
    fn test_summary_amendment_keeps_position_and_version() {
        let doc = DocumentId::new("doc");
        let mut store = loaded_store(&doc);

        let root = store.add_event(&doc, NewEvent::save("a", None)).unwrap();
        store
            .add_event(&doc, NewEvent::save("b", Some(root.id.clone())))
            .unwrap();

        store
            .update_event_summary(&doc, &root.id, Some("first draft".to_string()))
            .unwrap();

        let view = store.view(&doc).unwrap();
        assert_eq!(view.events()[0].summary.as_deref(), Some("first draft"));
        assert_eq!(view.events()[0].version, 1);
        assert_eq!(view.latest().unwrap().version, 2);
    }

    #[test]
    fn test_depth_and_children() {
        let doc = DocumentId::new("doc");
        let mut store = loaded_store(&doc);

        let root = store.add_event(&doc, NewEvent::save("a", None)).unwrap();
        let b = store
            .add_event(&doc, NewEvent::save("b", Some(root.id.clone())))
            .unwrap();
        let c = store
            .add_event(&doc, NewEvent::save("c", Some(b.id.clone())))
            .unwrap();

        let view = store.view(&doc).unwrap();
        assert_eq!(view.depth(&root.id), Some(0));
        assert_eq!(view.depth(&c.id), Some(2));
        assert_eq!(view.children(&root.id).len(), 1);
        assert_eq!(view.previous(&c.id).map(|e| &e.id), Some(&b.id));
        assert!(view.previous(&root.id).is_none());
    }
}
