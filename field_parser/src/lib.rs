//! Incremental extraction of marker-delimited fields from streaming model
//! output.
//!
//! A completion stream carrying structured output prefixes each section with
//! a literal bracketed marker (`[grammar]`, `[phrases]`, `[tip]`). Markers
//! arrive token by token, so a field's value is only ever partially known
//! while the stream is live. The parsers here maintain the full accumulated
//! text and re-derive every field on each new fragment, reporting only the
//! fields whose visible value changed.

pub mod factory;
pub mod parsers;
pub mod traits;

pub use factory::ParserFactory;
pub use parsers::{split_phrases, AnalysisParser, AnalysisSnapshot, BaseFieldParser};
pub use traits::{FieldDelta, FieldMarker, FieldParser, ParseError, ParserConfig};
