//! # Folio Editor
//!
//! Synchronization core for the two editing surfaces.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Surface T (text) │     │ Surface R (rich) │
//! └────────┬─────────┘     └────────┬─────────┘
//!          │   SurfaceEvent (mpsc)  │
//!          └──────────┬─────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ SyncCoordinator                             │
//! │  - remote-update guards (no echo loops)     │
//! │  - debounced outbound sync                  │
//! │  - lossy block round trip + correction      │
//! │  - read-only historical view                │
//! │  - line → block navigation                  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ CanonicalStore: markdown (watch channel)    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Canonical text is source of truth**: surfaces are views of it
//! 2. **One writer at a time**: only the visible surface propagates edits
//! 3. **Guard, don't diff**: externally applied content is never re-emitted
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{CanonicalStore, SyncConfig, SyncCoordinator};
//!
//! let canonical = CanonicalStore::new("# Title");
//! let (mut sync, text, rich) =
//!     SyncCoordinator::with_memory_surfaces(SyncConfig::default(), canonical.clone());
//!
//! rich.user_edit_text(&rich.blocks()[0].id, "Renamed")?;
//! sync.process_events();
//! sync.flush();
//! assert_eq!(canonical.markdown(), "# Renamed");
//! ```

mod blocks;
mod canonical;
mod errors;
mod navigation;
mod surface;
mod sync;

pub use blocks::{
    blocks_to_canonical, correct_lossy_markdown, flatten_blocks, write_blocks, Block, BlockCodec,
    BlockKind, MarkdownBlockCodec,
};
pub use canonical::{CanonicalSnapshot, CanonicalStore, ChangeOrigin};
pub use errors::{EditorError, EditorResult};
pub use navigation::{locate_block_for_line, normalize_line, NavigationTarget};
pub use surface::{
    surface_channel, BlockSurface, MemoryBlockSurface, MemoryTextSurface, SurfaceEvent,
    SurfaceEventReceiver, SurfaceEventSender, SurfaceKind, TextSurface,
};
pub use sync::{EditorMode, RemoteUpdateGuard, SyncConfig, SyncCoordinator, ViewMode};
