//! Incremental consumer for the structured analysis stream.

use bytes::Bytes;
use field_parser::{AnalysisParser, FieldDelta, FieldParser};
use futures::{Stream, StreamExt};
use memo_protocol::api::AnalysisFields;
use tracing::debug;

use crate::{stream::TokenStream, ClientError};

/// Drives one analysis request: owns the accumulated buffer (via the
/// parser), feeds tokens strictly in arrival order, and reports visible
/// field changes. One session per request; sessions are never shared.
#[derive(Default)]
pub struct AnalysisSession {
    parser: AnalysisParser,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one content token, returning the fields whose visible value
    /// changed.
    pub fn feed(&mut self, token: &str) -> Result<Vec<FieldDelta>, ClientError> {
        Ok(self.parser.feed(token)?)
    }

    /// The current field set. After the stream ends this is the frozen
    /// final result.
    pub fn fields(&self) -> AnalysisFields {
        let snapshot = self.parser.snapshot();
        AnalysisFields {
            grammar: snapshot.grammar.unwrap_or_default(),
            phrases: snapshot.phrases,
            memory_tip: snapshot.tip.unwrap_or_default(),
        }
    }

    /// Consume a token stream to completion, invoking `on_delta` for every
    /// field change, and return the frozen fields.
    ///
    /// A transport error mid-stream ends the session softly: whatever was
    /// assembled so far becomes the final result.
    pub async fn run<S>(
        mut self,
        tokens: TokenStream<S>,
        mut on_delta: impl FnMut(&FieldDelta),
    ) -> Result<AnalysisFields, ClientError>
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>>,
    {
        let mut tokens = std::pin::pin!(tokens);
        while let Some(next) = tokens.next().await {
            match next {
                Ok(token) => {
                    for delta in self.feed(&token)? {
                        on_delta(&delta);
                    }
                }
                Err(err) => {
                    debug!(error = %err, "analysis stream ended early");
                    break;
                }
            }
        }
        Ok(self.fields())
    }
}
