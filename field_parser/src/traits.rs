//! Core trait and shared types for streaming field parsers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("accumulated buffer exceeds maximum size of {0} bytes")]
    BufferOverflow(usize),

    #[error("unknown parser kind: {0}")]
    UnknownParserKind(String),
}

/// One named field and the literal marker that introduces it in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMarker {
    pub name: &'static str,
    pub token: &'static str,
}

/// Configuration for a marker-delimited field parser.
///
/// Markers are ordered: field *i* ends where the marker of field *i + 1*
/// begins, and the terminal field runs to the end of the buffer.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub markers: Vec<FieldMarker>,
    pub max_buffer_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            max_buffer_size: 65536,
        }
    }
}

/// A visible change to one field, produced by a `feed` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDelta {
    pub name: &'static str,
    pub value: String,
}

/// Incremental parser over an append-only text buffer.
///
/// Implementations own the accumulated text for exactly one request and are
/// never shared across requests.
pub trait FieldParser: Send {
    /// Append one content fragment and report every field whose visible
    /// value changed. A field is reported only when its newly computed value
    /// is non-empty; a computed empty value never retracts an earlier one.
    fn feed(&mut self, delta: &str) -> Result<Vec<FieldDelta>, ParseError>;

    /// Last reported value of a field, if any.
    fn value(&self, name: &str) -> Option<&str>;

    /// The full accumulated text so far.
    fn buffer(&self) -> &str;

    /// Clear all state for reuse.
    fn reset(&mut self);
}
