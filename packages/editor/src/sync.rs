//! # Synchronization Coordinator
//!
//! Keeps the text surface, the block surface and the canonical Markdown
//! store converged without echo loops.
//!
//! ```text
//!   user edit ──▶ surface ──SurfaceEvent──▶ coordinator ──debounce──▶ canonical
//!                    ▲                           │
//!                    └── inject (guarded) ◀──────┘  load / branch / history / mode switch
//! ```
//!
//! ## Loop prevention
//!
//! Every surface fires a change notification even when content is replaced
//! programmatically. An injection therefore runs as:
//!
//! 1. cancel the surface's pending debounced emission
//! 2. raise its [`RemoteUpdateGuard`] (and, for the block surface, turn
//!    editing off)
//! 3. replace the content
//! 4. drain the notifications the replacement produced; the raised guard
//!    suppresses them
//! 5. restore editing and lower the guard
//!
//! ## Read-only view
//!
//! While a historical event is displayed, edits from either surface are
//! ignored and the block surface is not editable. The canonical store keeps
//! the working text throughout.

use std::sync::Arc;
use std::time::Duration;

use folio_common::Debouncer;
use folio_diff::line_count;

use crate::blocks::{blocks_to_canonical, Block, BlockCodec, MarkdownBlockCodec};
use crate::canonical::{CanonicalStore, ChangeOrigin};
use crate::navigation::{locate_block_for_line, NavigationTarget};
use crate::surface::{
    surface_channel, BlockSurface, MemoryBlockSurface, MemoryTextSurface, SurfaceEvent,
    SurfaceEventReceiver, SurfaceKind, TextSurface,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet interval before a surface edit reaches the canonical store
    pub debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
        }
    }
}

/// Which surface is visible and accepts input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    Text,
    #[default]
    Rich,
}

impl EditorMode {
    pub fn surface(self) -> SurfaceKind {
        match self {
            EditorMode::Text => SurfaceKind::Text,
            EditorMode::Rich => SurfaceKind::Rich,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Editing the working text
    #[default]
    Live,
    /// Displaying a past event, read-only
    Historical,
}

/// Marks a surface as receiving an external replacement. Notifications
/// observed while active are not propagated.
#[derive(Debug, Default)]
pub struct RemoteUpdateGuard {
    depth: usize,
}

impl RemoteUpdateGuard {
    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    fn enter(&mut self) {
        self.depth += 1;
    }

    fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

struct TextSlot {
    surface: Box<dyn TextSurface>,
    guard: RemoteUpdateGuard,
    debouncer: Debouncer,
    pending: Option<String>,
}

struct RichSlot {
    surface: Box<dyn BlockSurface>,
    guard: RemoteUpdateGuard,
    debouncer: Debouncer,
    pending: Option<Vec<Block>>,
}

pub struct SyncCoordinator {
    config: SyncConfig,
    canonical: CanonicalStore,
    codec: Arc<dyn BlockCodec>,
    text: TextSlot,
    rich: RichSlot,
    events: SurfaceEventReceiver,
    mode: EditorMode,
    view: ViewMode,
    history_content: Option<String>,
    selected_block: Option<String>,
    suppressed: u64,
}

impl SyncCoordinator {
    /// Wire two surfaces to `canonical`. Both surfaces are loaded with the
    /// current canonical text.
    pub fn new(
        config: SyncConfig,
        canonical: CanonicalStore,
        codec: Arc<dyn BlockCodec>,
        text: Box<dyn TextSurface>,
        rich: Box<dyn BlockSurface>,
        events: SurfaceEventReceiver,
    ) -> Self {
        let mut coordinator = Self {
            config,
            canonical,
            codec,
            text: TextSlot {
                surface: text,
                guard: RemoteUpdateGuard::default(),
                debouncer: Debouncer::new("sync.text"),
                pending: None,
            },
            rich: RichSlot {
                surface: rich,
                guard: RemoteUpdateGuard::default(),
                debouncer: Debouncer::new("sync.rich"),
                pending: None,
            },
            events,
            mode: EditorMode::default(),
            view: ViewMode::Live,
            history_content: None,
            selected_block: None,
            suppressed: 0,
        };

        let initial = coordinator.canonical.markdown();
        coordinator.inject_all(&initial);
        coordinator
    }

    /// Coordinator over in-memory surfaces and the Markdown codec. The
    /// returned surface handles share state with the ones it owns.
    pub fn with_memory_surfaces(
        config: SyncConfig,
        canonical: CanonicalStore,
    ) -> (Self, MemoryTextSurface, MemoryBlockSurface) {
        let (sender, receiver) = surface_channel();
        let text = MemoryTextSurface::new(sender.clone());
        let rich = MemoryBlockSurface::new(sender);

        let coordinator = Self::new(
            config,
            canonical,
            Arc::new(MarkdownBlockCodec),
            Box::new(text.clone()),
            Box::new(rich.clone()),
            receiver,
        );

        (coordinator, text, rich)
    }

    pub fn canonical(&self) -> &CanonicalStore {
        &self.canonical
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn is_read_only(&self) -> bool {
        self.view == ViewMode::Historical
    }

    /// Block the user last placed the cursor in
    pub fn selected_block(&self) -> Option<&str> {
        self.selected_block.as_deref()
    }

    /// Notifications swallowed by a remote-update guard so far
    pub fn suppressed_echoes(&self) -> u64 {
        self.suppressed
    }

    pub fn has_pending_edits(&self) -> bool {
        self.text.debouncer.is_pending() || self.rich.debouncer.is_pending()
    }

    /// Text currently shown: the historical event in read-only view, the
    /// canonical text otherwise
    pub fn displayed_markdown(&self) -> String {
        match &self.history_content {
            Some(content) => content.clone(),
            None => self.canonical.markdown(),
        }
    }

    /// Handle every queued surface notification. Returns how many were read.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for and handle one notification. False once every surface is gone.
    pub async fn process_next(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Emit pending edits now instead of waiting for the quiet interval
    pub fn flush(&mut self) {
        self.process_events();

        if self.text.debouncer.cancel() {
            if let Some(text) = self.text.pending.take() {
                emit_text(&self.canonical, text);
            }
        }
        if self.rich.debouncer.cancel() {
            if let Some(blocks) = self.rich.pending.take() {
                emit_blocks(&self.canonical, self.codec.as_ref(), &blocks);
            }
        }
    }

    /// Switch the visible surface. Edits pending on the surface being left
    /// are flushed first, then the newly visible surface is reloaded.
    pub fn set_mode(&mut self, mode: EditorMode) {
        if mode == self.mode {
            return;
        }

        self.flush();
        self.mode = mode;

        let content = self.displayed_markdown();
        match mode {
            EditorMode::Text => self.inject_text(&content),
            EditorMode::Rich => self.inject_rich(&content),
        }

        tracing::info!("[Sync] switched to {:?} editor", mode);
    }

    /// Replace what both surfaces show without touching the canonical store.
    /// Queued user edits are handled first; their pending emissions are then
    /// cancelled so they cannot overwrite the new content.
    pub fn apply_external(&mut self, content: &str) {
        self.process_events();
        self.inject_all(content);
    }

    /// Make `content` the working text (document open, branch)
    pub fn load_working_content(&mut self, content: &str) {
        self.process_events();
        self.view = ViewMode::Live;
        self.history_content = None;

        self.canonical.publish(content, ChangeOrigin::External);
        self.inject_all(content);
    }

    /// Show a past event read-only. The working text stays in the canonical
    /// store; pending edits to it are flushed before the switch.
    pub fn enter_history_view(&mut self, content: &str) {
        self.flush();

        self.view = ViewMode::Historical;
        self.history_content = Some(content.to_string());
        self.inject_all(content);

        tracing::debug!("[Sync] entered historical view");
    }

    /// Back to editing the working text
    pub fn exit_history_view(&mut self) {
        if self.view == ViewMode::Live {
            return;
        }

        self.view = ViewMode::Live;
        self.history_content = None;

        let working = self.canonical.markdown();
        self.apply_external(&working);

        tracing::debug!("[Sync] left historical view");
    }

    /// Bring `line` (1-based, of the displayed text) into view on the
    /// visible surface
    pub fn navigate_to_line(&mut self, line: usize) -> Option<NavigationTarget> {
        let markdown = self.displayed_markdown();
        let line = line.clamp(1, line_count(&markdown).max(1));

        match self.mode {
            EditorMode::Text => {
                self.text.surface.scroll_to_line(line);
                Some(NavigationTarget::TextLine(line))
            }
            EditorMode::Rich => {
                let blocks = self.rich.surface.document();
                let Some(block_id) = locate_block_for_line(&markdown, &blocks, line) else {
                    tracing::debug!("[Sync] no block matches line {}", line);
                    return None;
                };

                if let Err(e) = self.rich.surface.focus_block(&block_id) {
                    tracing::warn!("[Sync] failed to focus block {}: {}", block_id, e);
                    return None;
                }
                Some(NavigationTarget::Block { block_id })
            }
        }
    }

    fn handle_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::TextChanged(text) => {
                if self.text.guard.is_active() {
                    self.suppressed += 1;
                    tracing::trace!("[Sync] suppressed text echo");
                    return;
                }
                if !self.accepts_edits_from(SurfaceKind::Text) {
                    return;
                }

                self.text.pending = Some(text.clone());
                let canonical = self.canonical.clone();
                self.text.debouncer.schedule(self.config.debounce, async move {
                    emit_text(&canonical, text);
                });
            }
            SurfaceEvent::BlocksChanged => {
                if self.rich.guard.is_active() {
                    self.suppressed += 1;
                    tracing::trace!("[Sync] suppressed block echo");
                    return;
                }
                if !self.accepts_edits_from(SurfaceKind::Rich) {
                    return;
                }
                if !self.rich.surface.is_editable() {
                    tracing::warn!("[Sync] change from non-editable block surface ignored");
                    return;
                }

                let blocks = self.rich.surface.document();
                self.rich.pending = Some(blocks.clone());

                let canonical = self.canonical.clone();
                let codec = self.codec.clone();
                self.rich.debouncer.schedule(self.config.debounce, async move {
                    emit_blocks(&canonical, codec.as_ref(), &blocks);
                });
            }
            SurfaceEvent::SelectionChanged { block_id } => {
                self.selected_block = Some(block_id);
            }
        }
    }

    fn accepts_edits_from(&self, source: SurfaceKind) -> bool {
        if self.view == ViewMode::Historical {
            tracing::debug!("[Sync] {:?} edit ignored in historical view", source);
            return false;
        }
        if source != self.mode.surface() {
            tracing::debug!("[Sync] {:?} edit ignored, surface not active", source);
            return false;
        }
        true
    }

    fn inject_all(&mut self, content: &str) {
        self.inject_text(content);
        self.inject_rich(content);
    }

    fn inject_text(&mut self, content: &str) {
        self.text.debouncer.cancel();
        self.text.pending = None;

        self.text.guard.enter();
        self.text.surface.set_value(content);
        self.process_events();
        self.text.guard.exit();
    }

    fn inject_rich(&mut self, content: &str) {
        self.rich.debouncer.cancel();
        self.rich.pending = None;

        self.rich.guard.enter();
        self.rich.surface.set_editable(false);

        match self.codec.to_blocks(content) {
            Ok(blocks) => self.rich.surface.replace_blocks(blocks),
            Err(e) => {
                tracing::error!(
                    "[Sync] text to blocks failed, block surface keeps previous content: {}",
                    e
                );
            }
        }

        self.process_events();
        self.rich.surface.set_editable(self.view == ViewMode::Live);
        self.rich.guard.exit();
    }
}

fn emit_text(canonical: &CanonicalStore, text: String) {
    canonical.publish(text, ChangeOrigin::TextSurface);
}

fn emit_blocks(canonical: &CanonicalStore, codec: &dyn BlockCodec, blocks: &[Block]) {
    match blocks_to_canonical(codec, blocks) {
        Ok(markdown) => {
            canonical.publish(markdown, ChangeOrigin::RichSurface);
        }
        Err(e) => {
            tracing::error!(
                "[Sync] blocks to text failed, canonical left unchanged: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_nests() {
        let mut guard = RemoteUpdateGuard::default();
        guard.enter();
        guard.enter();
        guard.exit();
        assert!(guard.is_active());
        guard.exit();
        assert!(!guard.is_active());
        guard.exit();
        assert!(!guard.is_active());
    }

    #[test]
    fn test_construction_loads_both_surfaces_without_echo() {
        let canonical = CanonicalStore::new("# Title\n\nBody");
        let (sync, text, rich) =
            SyncCoordinator::with_memory_surfaces(SyncConfig::default(), canonical.clone());

        assert_eq!(text.text(), "# Title\n\nBody");
        assert_eq!(rich.blocks().len(), 2);
        assert!(rich.editable());
        assert_eq!(sync.suppressed_echoes(), 2);
        assert_eq!(canonical.revision(), 0);
    }
}
