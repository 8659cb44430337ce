//! Canonical Markdown store.
//!
//! Single source of truth for the save-worthy document text. One writer at a
//! time by convention, any number of readers through [`CanonicalStore::subscribe`].

use std::sync::Arc;

use tokio::sync::watch;

/// Who produced the current canonical value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    Initial,
    TextSurface,
    RichSurface,
    /// Document load, branch or session-level replacement
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSnapshot {
    pub markdown: String,
    /// Bumped on every accepted change
    pub revision: u64,
    pub origin: ChangeOrigin,
}

/// Shared handle to the canonical text; clones observe the same value
#[derive(Debug, Clone)]
pub struct CanonicalStore {
    sender: Arc<watch::Sender<CanonicalSnapshot>>,
}

impl CanonicalStore {
    pub fn new(markdown: impl Into<String>) -> Self {
        let (sender, _) = watch::channel(CanonicalSnapshot {
            markdown: markdown.into(),
            revision: 0,
            origin: ChangeOrigin::Initial,
        });

        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn snapshot(&self) -> CanonicalSnapshot {
        self.sender.borrow().clone()
    }

    pub fn markdown(&self) -> String {
        self.sender.borrow().markdown.clone()
    }

    pub fn revision(&self) -> u64 {
        self.sender.borrow().revision
    }

    /// Replace the text. Identical text is not a change and returns false.
    pub fn publish(&self, markdown: impl Into<String>, origin: ChangeOrigin) -> bool {
        let markdown = markdown.into();

        let changed = self.sender.send_if_modified(|current| {
            if current.markdown == markdown {
                return false;
            }
            current.markdown = markdown;
            current.revision += 1;
            current.origin = origin;
            true
        });

        if changed {
            tracing::debug!(
                "[Canonical] revision {} from {:?}",
                self.revision(),
                origin
            );
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<CanonicalSnapshot> {
        self.sender.subscribe()
    }
}

impl Default for CanonicalStore {
    fn default() -> Self {
        Self::new(String::new())
    }
}
