//! Streaming relay between the memo reading assistant and an OpenAI-style
//! completion endpoint.
//!
//! One request drives one pipeline: open a streaming completion upstream,
//! extract the text delta from each event line, and re-emit the deltas as a
//! normalized `data:<token>` event stream toward the client. The relay is
//! structure-agnostic — marker interpretation of the analysis stream happens
//! entirely on the client side.

pub mod config;
pub mod error;
pub mod prompts;
pub mod relay;
pub mod routes;
pub mod sse;
pub mod upstream;
