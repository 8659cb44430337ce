//! # Editing Surfaces
//!
//! Contracts for the two editors kept in sync, plus in-memory implementations.
//!
//! Both surfaces report changes by sending a [`SurfaceEvent`] into the
//! coordinator's channel. Like the real editors, they also fire a change
//! notification when content is replaced programmatically; telling those
//! apart from user edits is the coordinator's job.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::blocks::{find_block_mut, Block};
use crate::errors::{EditorError, EditorResult};

/// Which editor a notification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Plain-text editor, authoritative for raw Markdown
    Text,
    /// Block editor with a lossy Markdown round trip
    Rich,
}

/// Change notification emitted by a surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Surface T changed; carries the full new text
    TextChanged(String),
    /// Surface R changed; read the tree through [`BlockSurface::document`]
    BlocksChanged,
    SelectionChanged { block_id: String },
}

impl SurfaceEvent {
    pub fn source(&self) -> SurfaceKind {
        match self {
            SurfaceEvent::TextChanged(_) => SurfaceKind::Text,
            SurfaceEvent::BlocksChanged | SurfaceEvent::SelectionChanged { .. } => {
                SurfaceKind::Rich
            }
        }
    }
}

pub type SurfaceEventSender = mpsc::UnboundedSender<SurfaceEvent>;
pub type SurfaceEventReceiver = mpsc::UnboundedReceiver<SurfaceEvent>;

/// Channel shared by both surfaces and drained by the coordinator
pub fn surface_channel() -> (SurfaceEventSender, SurfaceEventReceiver) {
    mpsc::unbounded_channel()
}

/// Plain-text editing surface
pub trait TextSurface: Send {
    fn value(&self) -> String;

    /// Replace the whole text. Fires a change notification.
    fn set_value(&mut self, text: &str);

    fn scroll_to_line(&mut self, line: usize);

    fn has_focus(&self) -> bool;
}

/// Block editing surface
pub trait BlockSurface: Send {
    fn document(&self) -> Vec<Block>;

    /// Replace every block. Fires a change notification.
    fn replace_blocks(&mut self, blocks: Vec<Block>);

    fn set_editable(&mut self, editable: bool);

    fn is_editable(&self) -> bool;

    fn focus_block(&mut self, block_id: &str) -> EditorResult<()>;
}

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock leaves plain data behind; keep going
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn notify(events: &SurfaceEventSender, event: SurfaceEvent) {
    if events.send(event).is_err() {
        tracing::debug!("[Surface] coordinator gone, change notification dropped");
    }
}

#[derive(Debug, Default)]
struct TextState {
    value: String,
    scrolled_to: Option<usize>,
    focused: bool,
}

/// In-memory text surface. Clones share state, so a test can keep a handle
/// while the coordinator owns another.
#[derive(Debug, Clone)]
pub struct MemoryTextSurface {
    state: Arc<Mutex<TextState>>,
    events: SurfaceEventSender,
}

impl MemoryTextSurface {
    pub fn new(events: SurfaceEventSender) -> Self {
        Self {
            state: Arc::new(Mutex::new(TextState::default())),
            events,
        }
    }

    /// Simulate the user typing the full new text
    pub fn type_text(&self, text: &str) {
        lock(&self.state).value = text.to_string();
        notify(&self.events, SurfaceEvent::TextChanged(text.to_string()));
    }

    pub fn text(&self) -> String {
        lock(&self.state).value.clone()
    }

    pub fn scrolled_to(&self) -> Option<usize> {
        lock(&self.state).scrolled_to
    }

    pub fn set_focus(&self, focused: bool) {
        lock(&self.state).focused = focused;
    }
}

impl TextSurface for MemoryTextSurface {
    fn value(&self) -> String {
        self.text()
    }

    fn set_value(&mut self, text: &str) {
        lock(&self.state).value = text.to_string();
        notify(&self.events, SurfaceEvent::TextChanged(text.to_string()));
    }

    fn scroll_to_line(&mut self, line: usize) {
        let mut state = lock(&self.state);
        state.scrolled_to = Some(line);
        state.focused = true;
    }

    fn has_focus(&self) -> bool {
        lock(&self.state).focused
    }
}

#[derive(Debug)]
struct BlockState {
    blocks: Vec<Block>,
    editable: bool,
    focused_block: Option<String>,
}

/// In-memory block surface. User edits are refused while not editable.
#[derive(Debug, Clone)]
pub struct MemoryBlockSurface {
    state: Arc<Mutex<BlockState>>,
    events: SurfaceEventSender,
}

impl MemoryBlockSurface {
    pub fn new(events: SurfaceEventSender) -> Self {
        Self {
            state: Arc::new(Mutex::new(BlockState {
                blocks: Vec::new(),
                editable: true,
                focused_block: None,
            })),
            events,
        }
    }

    /// Simulate the user rewriting the document
    pub fn user_replace(&self, blocks: Vec<Block>) -> EditorResult<()> {
        {
            let mut state = lock(&self.state);
            if !state.editable {
                return Err(EditorError::ReadOnly);
            }
            state.blocks = blocks;
        }
        notify(&self.events, SurfaceEvent::BlocksChanged);
        Ok(())
    }

    /// Simulate the user retyping one block
    pub fn user_edit_text(&self, block_id: &str, text: &str) -> EditorResult<()> {
        {
            let mut state = lock(&self.state);
            if !state.editable {
                return Err(EditorError::ReadOnly);
            }
            let block = find_block_mut(&mut state.blocks, block_id)
                .ok_or_else(|| EditorError::UnknownBlock(block_id.to_string()))?;
            block.text = text.to_string();
        }
        notify(&self.events, SurfaceEvent::BlocksChanged);
        Ok(())
    }

    /// Simulate the user moving the cursor into a block
    pub fn user_select(&self, block_id: &str) {
        notify(
            &self.events,
            SurfaceEvent::SelectionChanged {
                block_id: block_id.to_string(),
            },
        );
    }

    pub fn blocks(&self) -> Vec<Block> {
        lock(&self.state).blocks.clone()
    }

    pub fn editable(&self) -> bool {
        lock(&self.state).editable
    }

    pub fn focused_block(&self) -> Option<String> {
        lock(&self.state).focused_block.clone()
    }
}

impl BlockSurface for MemoryBlockSurface {
    fn document(&self) -> Vec<Block> {
        self.blocks()
    }

    fn replace_blocks(&mut self, blocks: Vec<Block>) {
        lock(&self.state).blocks = blocks;
        notify(&self.events, SurfaceEvent::BlocksChanged);
    }

    fn set_editable(&mut self, editable: bool) {
        lock(&self.state).editable = editable;
    }

    fn is_editable(&self) -> bool {
        self.editable()
    }

    fn focus_block(&mut self, block_id: &str) -> EditorResult<()> {
        let mut state = lock(&self.state);
        if find_block_mut(&mut state.blocks, block_id).is_none() {
            return Err(EditorError::UnknownBlock(block_id.to_string()));
        }
        state.focused_block = Some(block_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_programmatic_set_fires_notification() {
        let (tx, mut rx) = surface_channel();
        let mut surface = MemoryTextSurface::new(tx);

        surface.set_value("hello");

        assert_eq!(
            rx.try_recv().unwrap(),
            SurfaceEvent::TextChanged("hello".to_string())
        );
        assert_eq!(surface.value(), "hello");
    }

    #[test]
    fn test_read_only_block_surface_refuses_user_edits() {
        let (tx, mut rx) = surface_channel();
        let mut surface = MemoryBlockSurface::new(tx);
        surface.replace_blocks(vec![Block::paragraph("b1", "text")]);
        rx.try_recv().unwrap();

        surface.set_editable(false);
        assert_eq!(
            surface.user_edit_text("b1", "changed"),
            Err(EditorError::ReadOnly)
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(surface.blocks()[0].text, "text");
    }

    #[test]
    fn test_focus_unknown_block_is_an_error() {
        let (tx, _rx) = surface_channel();
        let mut surface = MemoryBlockSurface::new(tx);
        assert_eq!(
            surface.focus_block("missing"),
            Err(EditorError::UnknownBlock("missing".to_string()))
        );
    }
}
