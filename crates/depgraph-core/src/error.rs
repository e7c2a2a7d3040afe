//! Core error types for depgraph-core.
//!
//! Covers the failure modes of the codec layer: stream I/O, unknown
//! polymorphic tags, and malformed payloads.

use thiserror::Error;

/// Errors produced while encoding or decoding graph elements.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Reading from or writing to the underlying stream failed.
    #[error("codec I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A polymorphic payload carried a tag with no registered constructor.
    #[error("unknown record tag: {tag}")]
    UnknownTag { tag: u16 },

    /// Two constructors were registered under the same tag.
    #[error("duplicate record tag: {tag}")]
    DuplicateTag { tag: u16 },

    /// The payload decoded but does not describe a valid value.
    #[error("malformed payload: {reason}")]
    Malformed { reason: String },

    /// A JSON-framed payload failed to (de)serialize.
    #[error("JSON payload error: {0}")]
    Json(#[from] serde_json::Error),
}
