//! Gateway client and the token stream it returns.

use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{stream::BoxStream, Stream, StreamExt};
use memo_protocol::{
    api::{AnalyzeRequest, ChatRequest},
    stream::{event_payload, DONE_SENTINEL},
};
use pin_project_lite::pin_project;
use serde::Serialize;
use tracing::debug;

use crate::{codec::FrameReassembler, ClientError};

/// Token stream over a type-erased response body.
pub type GatewayTokenStream = TokenStream<BoxStream<'static, Result<Bytes, reqwest::Error>>>;

/// HTTP client for the gateway's two streaming endpoints.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Request a structured analysis of `text`.
    pub async fn analyze(&self, text: impl Into<String>) -> Result<GatewayTokenStream, ClientError> {
        self.open("/api/analyze", &AnalyzeRequest { text: text.into() })
            .await
    }

    /// Ask a free-form follow-up question about previously analyzed text.
    pub async fn chat(
        &self,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<GatewayTokenStream, ClientError> {
        self.open(
            "/api/chat",
            &ChatRequest {
                context: context.into(),
                message: message.into(),
            },
        )
        .await
    }

    async fn open<B>(&self, path: &str, body: &B) -> Result<GatewayTokenStream, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(ClientError::Connect)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }
        debug!(url = %url, "gateway stream opened");
        Ok(TokenStream::new(response.bytes_stream().boxed()))
    }
}

pin_project! {
    /// Decodes a chunked response body into content tokens.
    ///
    /// Ends on the `[DONE]` sentinel or on EOF; EOF without the sentinel is
    /// an incomplete-but-not-erroneous result, and every token assembled up
    /// to that point is still yielded.
    pub struct TokenStream<S> {
        #[pin]
        inner: S,
        reassembler: FrameReassembler,
        pending: VecDeque<String>,
        done: bool,
    }
}

impl<S> std::fmt::Debug for TokenStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStream")
            .field("pending", &self.pending)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<S> TokenStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reassembler: FrameReassembler::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }
}

/// Queue the payload of one reassembled line, if it carries one.
fn enqueue(pending: &mut VecDeque<String>, done: &mut bool, line: &str) {
    let Some(payload) = event_payload(line) else {
        return;
    };
    if payload == DONE_SENTINEL {
        *done = true;
    } else if !payload.is_empty() {
        pending.push_back(payload.to_string());
    }
}

impl<S> Stream for TokenStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>>,
{
    type Item = Result<String, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(token) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(token)));
            }
            if *this.done {
                return Poll::Ready(None);
            }
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    for line in this.reassembler.push(&chunk) {
                        if *this.done {
                            break;
                        }
                        enqueue(this.pending, this.done, &line);
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(ClientError::Read(err))));
                }
                Poll::Ready(None) => {
                    if let Some(rest) = this.reassembler.finish() {
                        if !*this.done {
                            enqueue(this.pending, this.done, &rest);
                        }
                    }
                    *this.done = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
