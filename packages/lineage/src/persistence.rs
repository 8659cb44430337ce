//! Durable per-document history storage.
//!
//! The whole event list is written as one JSON array on every mutation.
//! A second key mirrors the latest event's content for subsystems that only
//! need the current text.

use std::sync::Arc;

use folio_common::{CommonResult, KeyValueStorage};

use crate::event::{DocumentId, LineageEvent};

const LINEAGE_KEY_PREFIX: &str = "folio.lineage.";
const LATEST_CONTENT_KEY_PREFIX: &str = "folio.latest_content.";

/// Storage key holding the serialized event list of `document`
pub fn lineage_key(document: &DocumentId) -> String {
    format!("{}{}", LINEAGE_KEY_PREFIX, document)
}

/// Storage key mirroring the latest content of `document`
pub fn latest_content_key(document: &DocumentId) -> String {
    format!("{}{}", LATEST_CONTENT_KEY_PREFIX, document)
}

/// Reads and writes whole event lists through a key-value backend
#[derive(Clone)]
pub struct HistoryRepository {
    storage: Arc<dyn KeyValueStorage>,
}

impl HistoryRepository {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Read the event list of `document`.
    ///
    /// Missing, unreadable or corrupt history reads as empty; the failure is
    /// logged and editing carries on.
    pub fn read(&self, document: &DocumentId) -> Vec<LineageEvent> {
        let key = lineage_key(document);

        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::error!(
                    "[HistoryRepository] Failed to read history for {}: {}",
                    document,
                    e
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<LineageEvent>>(&raw) {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(
                    "[HistoryRepository] Corrupt history for {} ({} bytes), starting empty: {}",
                    document,
                    raw.len(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Persist the full event list and refresh the latest-content mirror
    pub fn write(&self, document: &DocumentId, events: &[LineageEvent]) -> CommonResult<()> {
        let json = serde_json::to_string(events)?;
        self.storage.set(&lineage_key(document), &json)?;

        if let Some(latest) = events.last() {
            // The mirror is a convenience; losing it never fails the write
            if let Err(e) = self.storage.set(&latest_content_key(document), &latest.content) {
                tracing::warn!(
                    "[HistoryRepository] Failed to mirror latest content for {}: {}",
                    document,
                    e
                );
            }
        }

        Ok(())
    }

    /// Drop everything stored for `document`
    pub fn remove(&self, document: &DocumentId) -> CommonResult<()> {
        self.storage.remove(&lineage_key(document))?;
        self.storage.remove(&latest_content_key(document))?;
        Ok(())
    }

    /// Last persisted content of `document`, if any
    pub fn latest_content(&self, document: &DocumentId) -> Option<String> {
        match self.storage.get(&latest_content_key(document)) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    "[HistoryRepository] Failed to read latest content for {}: {}",
                    document,
                    e
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for HistoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryRepository").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::MemoryStorage;

    #[test]
    fn test_keys_embed_document_identity() {
        let doc = DocumentId::new("doc-7");
        assert_eq!(lineage_key(&doc), "folio.lineage.doc-7");
        assert_eq!(latest_content_key(&doc), "folio.latest_content.doc-7");
    }

    #[test]
    fn test_corrupt_history_reads_as_empty() {
        let storage = Arc::new(MemoryStorage::new());
        let doc = DocumentId::new("doc");
        storage.set(&lineage_key(&doc), "{not json").unwrap();

        let repo = HistoryRepository::new(storage);
        assert!(repo.read(&doc).is_empty());
    }

    #[test]
    fn test_missing_history_reads_as_empty() {
        let repo = HistoryRepository::new(Arc::new(MemoryStorage::new()));
        assert!(repo.read(&DocumentId::new("nobody")).is_empty());
        assert_eq!(repo.latest_content(&DocumentId::new("nobody")), None);
    }
}
