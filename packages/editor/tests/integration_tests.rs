//! Integration tests for the synchronization protocol

use std::sync::Arc;
use std::time::Duration;

use folio_editor::{
    surface_channel, Block, BlockCodec, CanonicalStore, ChangeOrigin, EditorError, EditorMode,
    EditorResult, MarkdownBlockCodec, MemoryBlockSurface, MemoryTextSurface, NavigationTarget,
    SyncConfig, SyncCoordinator, ViewMode,
};

fn coordinator(markdown: &str) -> (SyncCoordinator, MemoryTextSurface, MemoryBlockSurface, CanonicalStore) {
    let canonical = CanonicalStore::new(markdown);
    let (sync, text, rich) =
        SyncCoordinator::with_memory_surfaces(SyncConfig::default(), canonical.clone());
    (sync, text, rich, canonical)
}

/// Let every debounce window elapse
async fn settle() {
    tokio::time::sleep(Duration::from_millis(600)).await;
}

#[tokio::test(start_paused = true)]
async fn test_text_edits_are_debounced_into_one_write() {
    let (mut sync, text, _rich, canonical) = coordinator("");
    sync.set_mode(EditorMode::Text);

    text.type_text("H");
    text.type_text("He");
    text.type_text("Hello");
    sync.process_events();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(canonical.markdown(), "");
    assert!(sync.has_pending_edits());

    settle().await;
    assert_eq!(canonical.markdown(), "Hello");
    assert_eq!(canonical.revision(), 1);
    assert_eq!(canonical.snapshot().origin, ChangeOrigin::TextSurface);
}

#[tokio::test(start_paused = true)]
async fn test_rich_edit_reaches_canonical_as_markdown() {
    let (mut sync, _text, rich, canonical) = coordinator("# Title\n\nBody");

    let heading = rich.blocks()[0].id.clone();
    rich.user_edit_text(&heading, "Renamed").unwrap();
    sync.process_events();
    settle().await;

    assert_eq!(canonical.markdown(), "# Renamed\n\nBody");
    assert_eq!(canonical.snapshot().origin, ChangeOrigin::RichSurface);
}

#[tokio::test(start_paused = true)]
async fn test_external_replacement_is_not_echoed_back() {
    // "* " bullets come back from the block serializer as "- "
    let (mut sync, _text, rich, canonical) = coordinator("# Working");

    sync.load_working_content("* one\n* two");
    let revision = canonical.revision();
    assert_eq!(rich.blocks().len(), 2);

    sync.process_events();
    settle().await;

    assert_eq!(canonical.markdown(), "* one\n* two");
    assert_eq!(canonical.revision(), revision);
    assert!(sync.suppressed_echoes() >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_history_view_injection_leaves_canonical_alone() {
    let (mut sync, text, rich, canonical) = coordinator("# Current");
    let revision = canonical.revision();

    sync.enter_history_view("# Old\n\n- a");
    sync.process_events();
    settle().await;

    assert_eq!(text.text(), "# Old\n\n- a");
    assert_eq!(rich.blocks().len(), 2);
    assert_eq!(canonical.markdown(), "# Current");
    assert_eq!(canonical.revision(), revision);
}

#[tokio::test(start_paused = true)]
async fn test_read_only_view_rejects_edits_from_both_surfaces() {
    let (mut sync, text, rich, canonical) = coordinator("# Current");
    sync.enter_history_view("# Old");

    assert_eq!(sync.view_mode(), ViewMode::Historical);
    assert!(!rich.editable());

    let id = rich.blocks()[0].id.clone();
    assert_eq!(rich.user_edit_text(&id, "hack"), Err(EditorError::ReadOnly));

    sync.set_mode(EditorMode::Text);
    text.type_text("# Hacked");
    sync.process_events();
    settle().await;

    assert_eq!(canonical.markdown(), "# Current");

    sync.exit_history_view();
    assert_eq!(sync.view_mode(), ViewMode::Live);
    assert!(rich.editable());
    assert_eq!(text.text(), "# Current");
}

#[tokio::test(start_paused = true)]
async fn test_escaped_backslash_survives_block_round_trip() {
    let (mut sync, _text, rich, canonical) = coordinator("Use \\\\ here");

    // Block model holds the unescaped character
    assert_eq!(rich.blocks()[0].text, "Use \\ here");

    let mut blocks = rich.blocks();
    blocks.push(Block::paragraph("new", "more"));
    rich.user_replace(blocks).unwrap();
    sync.process_events();
    settle().await;

    let markdown = canonical.markdown();
    assert_eq!(markdown, "Use \\ here\n\nmore");
    assert!(!markdown.contains("\\\\"));
}

#[tokio::test(start_paused = true)]
async fn test_mode_switch_flushes_pending_edit() {
    let (mut sync, text, rich, canonical) = coordinator("");
    sync.set_mode(EditorMode::Text);

    text.type_text("# Draft");
    sync.process_events();
    sync.set_mode(EditorMode::Rich);

    assert_eq!(canonical.markdown(), "# Draft");
    assert_eq!(rich.blocks()[0].text, "Draft");
    assert!(!sync.has_pending_edits());
}

#[tokio::test(start_paused = true)]
async fn test_external_update_cancels_stale_pending_edit() {
    let (mut sync, text, _rich, canonical) = coordinator("");
    sync.set_mode(EditorMode::Text);

    text.type_text("stale");
    sync.load_working_content("fresh");
    settle().await;

    assert_eq!(canonical.markdown(), "fresh");
    assert_eq!(text.text(), "fresh");
}

#[tokio::test(start_paused = true)]
async fn test_edits_from_hidden_surface_are_ignored() {
    let (mut sync, text, _rich, canonical) = coordinator("visible");
    assert_eq!(sync.mode(), EditorMode::Rich);

    text.type_text("typed into hidden editor");
    sync.process_events();
    settle().await;

    assert_eq!(canonical.markdown(), "visible");
}

#[tokio::test(start_paused = true)]
async fn test_navigation_on_each_surface() {
    let (mut sync, text, rich, _canonical) = coordinator("# Title\n\nfirst\n\nsecond");

    let target = sync.navigate_to_line(5);
    let expected = rich.blocks()[2].id.clone();
    assert_eq!(target, Some(NavigationTarget::Block { block_id: expected.clone() }));
    assert_eq!(rich.focused_block(), Some(expected));

    sync.set_mode(EditorMode::Text);
    assert_eq!(sync.navigate_to_line(99), Some(NavigationTarget::TextLine(5)));
    assert_eq!(text.scrolled_to(), Some(5));
}

#[tokio::test(start_paused = true)]
async fn test_selection_is_tracked() {
    let (mut sync, _text, rich, _canonical) = coordinator("para");
    let id = rich.blocks()[0].id.clone();

    rich.user_select(&id);
    sync.process_events();

    assert_eq!(sync.selected_block(), Some(id.as_str()));
}

/// Parses fine, never serializes
struct BrokenSerializer;

impl BlockCodec for BrokenSerializer {
    fn to_blocks(&self, markdown: &str) -> EditorResult<Vec<Block>> {
        MarkdownBlockCodec.to_blocks(markdown)
    }

    fn to_markdown(&self, _blocks: &[Block]) -> EditorResult<String> {
        Err(EditorError::Conversion("serializer crashed".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_serialization_failure_leaves_canonical_unchanged() {
    let canonical = CanonicalStore::new("keep me");
    let (sender, receiver) = surface_channel();
    let text = MemoryTextSurface::new(sender.clone());
    let rich = MemoryBlockSurface::new(sender);

    let mut sync = SyncCoordinator::new(
        SyncConfig::default(),
        canonical.clone(),
        Arc::new(BrokenSerializer),
        Box::new(text),
        Box::new(rich.clone()),
        receiver,
    );

    let id = rich.blocks()[0].id.clone();
    rich.user_edit_text(&id, "edited").unwrap();
    sync.process_events();
    settle().await;

    assert_eq!(canonical.markdown(), "keep me");
    assert_eq!(canonical.revision(), 0);
}
