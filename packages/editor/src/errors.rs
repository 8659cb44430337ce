//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Surface is read-only")]
    ReadOnly,

    #[error("Unknown block: {0}")]
    UnknownBlock(String),
}

pub type EditorResult<T> = Result<T, EditorError>;
