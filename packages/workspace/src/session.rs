//! # Document Session
//!
//! One open document: its lineage history, the synchronized editing
//! surfaces and the quality checks.
//!
//! ```text
//!               ┌────────── save / restore / reset ──────────┐
//!               │                                             ▼
//! surfaces ──▶ SyncCoordinator ──▶ CanonicalStore      LineageStore ──▶ GraphLayout
//!               ▲                        │                    │
//!               │                        ├──▶ decorations ◀───┘ (head, head's parent)
//!               │                        └──▶ QualityOrchestrator
//!               └──── select_event (read-only) / branch_from_selected
//! ```
//!
//! The head is the event the working text descends from and the parent of
//! the next save. It differs from the positional latest event after a
//! branch.

use folio_diff::{compute_decorations, DecorationLayer};
use folio_editor::{NavigationTarget, SyncCoordinator, ViewMode};
use folio_lineage::{
    calculate_graph_layout, DocumentId, EventId, GraphLayout, LineageError, LineageEvent,
    LineageStore, LineageView, NewEvent,
};
use folio_linter::QualityOrchestrator;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("No document is open")]
    NoDocument,

    #[error("No history event is selected")]
    NoSelection,

    #[error("A past version is displayed; return to the working text first")]
    HistoricalView,

    #[error(transparent)]
    Lineage(#[from] LineageError),
}

pub type SessionResult<T> = Result<T, SessionError>;

pub struct DocumentSession {
    store: LineageStore,
    sync: SyncCoordinator,
    quality: QualityOrchestrator,
    document: Option<DocumentId>,
    head: Option<EventId>,
    selected: Option<EventId>,
}

impl DocumentSession {
    pub fn new(store: LineageStore, sync: SyncCoordinator, quality: QualityOrchestrator) -> Self {
        Self {
            store,
            sync,
            quality,
            document: None,
            head: None,
            selected: None,
        }
    }

    /// Load the history of `document` and make its latest content the
    /// working text. Returns the number of events.
    pub fn open(&mut self, document: DocumentId) -> SessionResult<usize> {
        self.sync.flush();
        self.selected = None;
        self.head = None;
        self.document = None;

        let count = self.store.load(document.clone())?;
        let latest = self
            .store
            .view(&document)
            .and_then(|view| view.latest())
            .map(|event| (event.id.clone(), event.content.clone()));

        let content = match latest {
            Some((id, content)) => {
                self.head = Some(id);
                content
            }
            None => String::new(),
        };

        self.sync.load_working_content(&content);
        self.document = Some(document.clone());

        tracing::info!("[Session] opened {} ({} events)", document, count);
        Ok(count)
    }

    /// Open another document. Unsaved working text of the current one is
    /// dropped with a warning.
    pub fn switch_document(&mut self, document: DocumentId) -> SessionResult<usize> {
        if self.document.as_ref() == Some(&document) {
            return Ok(self.history().map(|view| view.len()).unwrap_or(0));
        }

        self.sync.flush();
        if let Some(current) = &self.document {
            if self.has_unsaved_changes() {
                tracing::warn!("[Session] leaving {} with unsaved changes", current);
            }
        }

        self.open(document)
    }

    pub fn document(&self) -> Option<&DocumentId> {
        self.document.as_ref()
    }

    /// Event the working text descends from
    pub fn head(&self) -> Option<&EventId> {
        self.head.as_ref()
    }

    /// Past event currently displayed or offered for branching
    pub fn selected(&self) -> Option<&EventId> {
        self.selected.as_ref()
    }

    pub fn history(&self) -> Option<LineageView<'_>> {
        self.store.view(self.document.as_ref()?)
    }

    pub fn store(&self) -> &LineageStore {
        &self.store
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut SyncCoordinator {
        &mut self.sync
    }

    pub fn quality(&self) -> &QualityOrchestrator {
        &self.quality
    }

    pub fn quality_mut(&mut self) -> &mut QualityOrchestrator {
        &mut self.quality
    }

    /// Working text in the canonical store
    pub fn working_content(&self) -> String {
        self.sync.canonical().markdown()
    }

    /// True when the working text differs from the head event
    pub fn has_unsaved_changes(&self) -> bool {
        let working = self.working_content();
        match self.head_event() {
            Some(head) => head.content != working,
            None => !working.is_empty(),
        }
    }

    /// Append the working text as a new event parented to the head
    pub fn save(&mut self, summary: Option<String>) -> SessionResult<LineageEvent> {
        let document = self.require_document()?;
        if self.sync.view_mode() == ViewMode::Historical {
            return Err(SessionError::HistoricalView);
        }

        self.sync.flush();
        let mut new_event = NewEvent::save(self.working_content(), self.head.clone());
        new_event.summary = summary.filter(|s| !s.trim().is_empty());

        let event = self.store.add_event(&document, new_event)?;
        self.head = Some(event.id.clone());
        self.selected = None;

        Ok(event)
    }

    /// Display event `id`. Past events are shown read-only; selecting the
    /// latest event returns to the working text, moving the head onto it when
    /// the working text descends from an older event.
    pub fn select_event(&mut self, id: &EventId) -> SessionResult<ViewMode> {
        let document = self.require_document()?;
        let view = self.store.view(&document).ok_or(LineageError::NotLoaded)?;
        let event = view
            .by_id(id)
            .ok_or_else(|| LineageError::EventNotFound(id.clone()))?;

        let mode = if view.is_latest(id) {
            if self.head.as_ref() == Some(id) {
                self.sync.exit_history_view();
            } else {
                self.sync.load_working_content(&event.content);
                self.head = Some(id.clone());
                tracing::info!("[Session] head moved to latest v{}", event.version);
            }
            ViewMode::Live
        } else {
            let content = event.content.clone();
            self.sync.enter_history_view(&content);
            ViewMode::Historical
        };

        tracing::debug!("[Session] selected v{} ({:?})", event.version, mode);
        self.selected = Some(id.clone());
        Ok(mode)
    }

    /// Back to editing the working text
    pub fn exit_history_view(&mut self) {
        self.selected = None;
        self.sync.exit_history_view();
    }

    /// Make the selected event's content the working text. Nothing is
    /// recorded until the next save, which is parented to that event.
    pub fn branch_from_selected(&mut self) -> SessionResult<EventId> {
        let (document, id) = self.require_selection()?;
        let content = self
            .store
            .view(&document)
            .ok_or(LineageError::NotLoaded)?
            .by_id(&id)
            .map(|event| event.content.clone())
            .ok_or_else(|| LineageError::EventNotFound(id.clone()))?;

        self.sync.load_working_content(&content);
        self.head = Some(id.clone());
        self.selected = None;

        tracing::info!("[Session] branching {} from {}", document, id);
        Ok(id)
    }

    /// Append a copy of the selected event as the new latest event
    pub fn restore_selected(&mut self, summary: Option<String>) -> SessionResult<LineageEvent> {
        let (document, id) = self.require_selection()?;

        let event = self.store.restore_as_latest(&document, &id, summary)?;
        self.sync.load_working_content(&event.content);
        self.head = Some(event.id.clone());
        self.selected = None;

        Ok(event)
    }

    /// Replace the whole history with one root holding the working text
    pub fn reset_history(&mut self, summary: Option<String>) -> SessionResult<LineageEvent> {
        let document = self.require_document()?;

        self.exit_history_view();
        self.sync.flush();

        let content = self.working_content();
        let root = self.store.reset_with_content(&document, content, summary)?;
        self.head = Some(root.id.clone());

        Ok(root)
    }

    /// Discard the whole history. The working text is kept.
    pub fn clear_history(&mut self) -> SessionResult<()> {
        let document = self.require_document()?;

        self.store.clear_events(&document)?;
        self.exit_history_view();
        self.head = None;

        Ok(())
    }

    pub fn amend_summary(&mut self, id: &EventId, summary: Option<String>) -> SessionResult<()> {
        let document = self.require_document()?;
        self.store.update_event_summary(&document, id, summary)?;
        Ok(())
    }

    /// Layout of the open document's history
    pub fn graph_layout(&self) -> Option<GraphLayout<'_>> {
        self.history()
            .map(|view| calculate_graph_layout(view.events()))
    }

    /// Saved-vs-current and branch-point-vs-current layers for the working
    /// text
    pub fn decorations(&self) -> Vec<DecorationLayer> {
        let current = self.working_content();
        let Some(view) = self.history() else {
            return Vec::new();
        };
        let Some(head) = self.head.as_ref().and_then(|id| view.by_id(id)) else {
            return Vec::new();
        };

        let branch_point = view.previous(&head.id).map(|event| event.content.as_str());
        compute_decorations(&current, Some(&head.content), branch_point)
    }

    /// Select issue `id` and bring it into view on the active surface
    pub fn jump_to_issue(&mut self, id: &str) -> Option<NavigationTarget> {
        self.quality.jump_to_issue(id, &mut self.sync)
    }

    /// Run quality checks whenever the working text settles
    pub fn watch_quality(&self) -> JoinHandle<()> {
        self.quality.watch(self.sync.canonical())
    }

    fn head_event(&self) -> Option<&LineageEvent> {
        let id = self.head.as_ref()?;
        self.history()?.by_id(id)
    }

    fn require_document(&self) -> SessionResult<DocumentId> {
        self.document.clone().ok_or(SessionError::NoDocument)
    }

    fn require_selection(&self) -> SessionResult<(DocumentId, EventId)> {
        let document = self.require_document()?;
        let id = self.selected.clone().ok_or(SessionError::NoSelection)?;
        Ok((document, id))
    }
}

impl std::fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("document", &self.document)
            .field("head", &self.head)
            .field("selected", &self.selected)
            .field("quality", &self.quality)
            .finish_non_exhaustive()
    }
}
