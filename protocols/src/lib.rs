//! Protocol definitions for the memo gateway.
//!
//! Three surfaces share these types:
//! - the upstream OpenAI-style chat completion API ([`chat`]),
//! - the gateway's own client-facing API ([`api`]),
//! - the event-stream framing both sides speak ([`stream`]).

pub mod api;
pub mod chat;
pub mod stream;

pub use api::{AnalysisFields, AnalyzeRequest, ChatRequest};
pub use chat::{ChatCompletionChunk, ChatCompletionRequest, ChatMessage, Role};
