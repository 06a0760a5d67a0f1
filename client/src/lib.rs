//! Client for the memo gateway's streaming endpoints.
//!
//! Reassembles the gateway's event-stream framing from arbitrarily chunked
//! bytes, exposes each analysis or chat response as a token stream, and
//! provides the incremental consumers that sit on top: the analysis session
//! (marker-delimited fields) and the chat transcript with its display
//! formatter.

pub mod analysis;
pub mod codec;
pub mod format;
pub mod stream;
pub mod transcript;

use thiserror::Error;

pub use analysis::AnalysisSession;
pub use codec::FrameReassembler;
pub use format::render_markup;
pub use stream::{GatewayClient, GatewayTokenStream, TokenStream};
pub use transcript::{ChatEntry, ChatTranscript, Speaker};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to reach gateway: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("gateway returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("stream read failed: {0}")]
    Read(#[source] reqwest::Error),

    #[error(transparent)]
    Parse(#[from] field_parser::ParseError),
}
