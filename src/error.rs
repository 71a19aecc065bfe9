//! Error types for XAY export operations.

use thiserror::Error;

/// Result type for XAY export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors that can occur while writing an XAY document.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Too many sections for the document's 16-bit section count field.
    #[error("section count {count} exceeds the format limit of 65535")]
    SectionCountOverflow {
        /// Number of sections in the offending LOD.
        count: usize,
    },

    /// I/O error from the underlying output stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
