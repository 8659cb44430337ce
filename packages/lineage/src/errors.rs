//! Error types for the lineage store

use thiserror::Error;

use crate::event::{DocumentId, EventId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LineageError {
    #[error("History is not loaded")]
    NotLoaded,

    #[error("History loaded for '{loaded}', operation targeted '{expected}'")]
    DocumentMismatch {
        expected: DocumentId,
        loaded: DocumentId,
    },

    #[error("Load for '{0}' was superseded by a newer load")]
    StaleLoad(DocumentId),

    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    #[error("History already has a root event")]
    RootExists,
}

pub type LineageResult<T> = Result<T, LineageError>;
