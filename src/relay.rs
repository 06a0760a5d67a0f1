//! Relay emitter: pumps one upstream completion stream to the client as a
//! normalized token stream.
//!
//! The emitter performs no semantic interpretation of the content — it is a
//! structure-agnostic pass-through. Fragments are forwarded in arrival
//! order, one framed unit each, never coalesced and never reordered.

use std::{io, time::Duration};

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use memo_protocol::chat::ChatMessage;

use crate::{
    error,
    prompts,
    routes::AppContext,
    sse::{self, DeltaLine, LineFramer},
};

/// Channel capacity between the pump and the client-facing body stream.
/// This bound is the backpressure contract: the pump stops reading upstream
/// once the client falls this far behind.
const RELAY_CHANNEL_SIZE: usize = 32;

/// Stream a structured analysis of `text`.
pub async fn analyze_stream(ctx: &AppContext, text: &str) -> Response {
    let messages = vec![
        ChatMessage::system(prompts::SYSTEM_ANALYZER),
        ChatMessage::user(format!("Analyze: \"{text}\"")),
    ];
    run_relay(ctx, messages, prompts::debug_tag("Analysis", text)).await
}

/// Stream a free-form follow-up answer about `context`.
pub async fn chat_stream(ctx: &AppContext, context: &str, message: &str) -> Response {
    let messages = vec![
        ChatMessage::system(prompts::system_chat(context)),
        ChatMessage::user(message),
    ];
    run_relay(ctx, messages, prompts::debug_tag("Chat Query", message)).await
}

/// Open the upstream stream and hand it to a spawned pump; the response
/// body drains the pump's channel.
async fn run_relay(ctx: &AppContext, messages: Vec<ChatMessage>, tag: String) -> Response {
    let response = match ctx.upstream.open_stream(messages).await {
        Ok(response) => response,
        Err(err) => {
            warn!(tag = %tag, error = %err, "AI request failed before streaming");
            return err.into_error_response();
        }
    };
    info!(tag = %tag, "AI request started");

    let (tx, rx) = mpsc::channel::<Result<Bytes, io::Error>>(RELAY_CHANNEL_SIZE);
    let idle_timeout = ctx.config.idle_timeout;

    tokio::spawn(async move {
        match pump_stream(&tx, response.bytes_stream(), idle_timeout).await {
            Ok(PumpOutcome::Completed) => debug!(tag = %tag, "stream completed"),
            Ok(PumpOutcome::PrematureEnd) => {
                debug!(tag = %tag, "upstream closed without sentinel; soft end")
            }
            Ok(PumpOutcome::IdleTimeout) => {
                warn!(tag = %tag, idle = ?idle_timeout, "upstream went idle; soft end")
            }
            Ok(PumpOutcome::DownstreamClosed) => {
                debug!(tag = %tag, "client disconnected; upstream cancelled")
            }
            Err(reason) => {
                warn!(tag = %tag, error = %reason, "AI request failed mid-stream");
                let _ = sse::send_bytes(&tx, sse::format_error_event()).await;
            }
        }
        // Dropping tx (and with it the upstream response) closes the client
        // stream and releases the upstream connection.
    });

    let body = Body::from_stream(tokio_stream::wrappers::ReceiverStream::new(rx));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .unwrap_or_else(|e| {
            error!("failed to build streaming response: {e}");
            error::internal_error("response_build_failed", "Failed to build response")
        })
}

// ============================================================================
// Pump
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum PumpOutcome {
    /// Upstream sent the termination sentinel.
    Completed,
    /// Upstream closed without a sentinel — incomplete but not erroneous;
    /// whatever was forwarded stands.
    PrematureEnd,
    /// No upstream data within the idle window; treated like a premature
    /// end.
    IdleTimeout,
    /// The client went away; upstream consumption stopped promptly.
    DownstreamClosed,
}

enum LineAction {
    Continue,
    Done,
    Closed,
}

/// Consume the upstream byte stream and forward extracted tokens.
async fn pump_stream<S, E>(
    tx: &mpsc::Sender<Result<Bytes, io::Error>>,
    mut stream: S,
    idle: Duration,
) -> Result<PumpOutcome, String>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut framer = LineFramer::new();
    loop {
        let next = match timeout(idle, stream.next()).await {
            Ok(next) => next,
            Err(_) => return Ok(PumpOutcome::IdleTimeout),
        };
        match next {
            Some(Ok(chunk)) => {
                let lines = framer.push(&chunk).map_err(|e| e.to_string())?;
                for line in lines {
                    match relay_line(tx, &line).await {
                        LineAction::Continue => {}
                        LineAction::Done => return Ok(PumpOutcome::Completed),
                        LineAction::Closed => return Ok(PumpOutcome::DownstreamClosed),
                    }
                }
            }
            Some(Err(err)) => return Err(format!("upstream read failed: {err}")),
            None => {
                // Transport EOF. The trailing carry may still hold one line.
                if let Some(line) = framer.finish() {
                    match relay_line(tx, &line).await {
                        LineAction::Done => return Ok(PumpOutcome::Completed),
                        LineAction::Closed => return Ok(PumpOutcome::DownstreamClosed),
                        LineAction::Continue => {}
                    }
                }
                return Ok(PumpOutcome::PrematureEnd);
            }
        }
    }
}

/// Relay one upstream line. Empty fragments are dropped rather than
/// emitted; they carry no text.
async fn relay_line(tx: &mpsc::Sender<Result<Bytes, io::Error>>, line: &str) -> LineAction {
    match sse::extract_delta(line) {
        DeltaLine::Done => LineAction::Done,
        DeltaLine::Skip => LineAction::Continue,
        DeltaLine::Token(token) if token.is_empty() => LineAction::Continue,
        DeltaLine::Token(token) => {
            if sse::send_token(tx, &token).await {
                LineAction::Continue
            } else {
                LineAction::Closed
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunk_line(content: &str) -> Bytes {
        Bytes::from(format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{content}\"}}}}]}}\n"
        ))
    }

    fn ok_stream(
        chunks: Vec<Bytes>,
    ) -> impl Stream<Item = Result<Bytes, io::Error>> + Unpin {
        stream::iter(chunks.into_iter().map(Ok))
    }

    async fn drain(mut rx: mpsc::Receiver<Result<Bytes, io::Error>>) -> String {
        let mut out = String::new();
        while let Some(item) = rx.recv().await {
            out.push_str(&String::from_utf8_lossy(&item.unwrap()));
        }
        out
    }

    #[tokio::test]
    async fn tokens_are_forwarded_in_arrival_order() {
        let (tx, rx) = mpsc::channel(32);
        let chunks = vec![
            chunk_line("Past"),
            chunk_line(" tense"),
            Bytes::from_static(b"data: [DONE]\n"),
        ];

        let outcome = pump_stream(&tx, ok_stream(chunks), Duration::from_secs(1))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(outcome, PumpOutcome::Completed);
        assert_eq!(drain(rx).await, "data:Past\n\ndata: tense\n\n");
    }

    #[tokio::test]
    async fn lines_split_across_chunks_are_reassembled() {
        let (tx, rx) = mpsc::channel(32);
        let whole = chunk_line("hello");
        let chunks = vec![
            Bytes::copy_from_slice(&whole[..10]),
            Bytes::copy_from_slice(&whole[10..]),
            Bytes::from_static(b"data: [DONE]\n"),
        ];

        let outcome = pump_stream(&tx, ok_stream(chunks), Duration::from_secs(1))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(outcome, PumpOutcome::Completed);
        assert_eq!(drain(rx).await, "data:hello\n\n");
    }

    #[tokio::test]
    async fn malformed_and_empty_lines_do_not_abort_the_stream() {
        let (tx, rx) = mpsc::channel(32);
        let chunks = vec![
            Bytes::from_static(b"garbage line\n\n"),
            chunk_line(""),
            chunk_line("kept"),
            Bytes::from_static(b"data: [DONE]\n"),
        ];

        let outcome = pump_stream(&tx, ok_stream(chunks), Duration::from_secs(1))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(outcome, PumpOutcome::Completed);
        assert_eq!(drain(rx).await, "data:kept\n\n");
    }

    #[tokio::test]
    async fn eof_without_sentinel_is_a_soft_end_and_flushes_the_tail() {
        let (tx, rx) = mpsc::channel(32);
        // Final line has no terminator; it must still be relayed.
        let chunks = vec![chunk_line("first"), {
            let whole = chunk_line("tail");
            Bytes::copy_from_slice(&whole[..whole.len() - 1])
        }];

        let outcome = pump_stream(&tx, ok_stream(chunks), Duration::from_secs(1))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(outcome, PumpOutcome::PrematureEnd);
        assert_eq!(drain(rx).await, "data:first\n\ndata:tail\n\n");
    }

    #[tokio::test]
    async fn downstream_close_cancels_the_pump() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let chunks = vec![chunk_line("never seen")];

        let outcome = pump_stream(&tx, ok_stream(chunks), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcome, PumpOutcome::DownstreamClosed);
    }

    #[tokio::test]
    async fn idle_upstream_times_out_softly() {
        let (tx, _rx) = mpsc::channel(1);
        let outcome = pump_stream(
            &tx,
            stream::pending::<Result<Bytes, io::Error>>(),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert_eq!(outcome, PumpOutcome::IdleTimeout);
    }

    #[tokio::test]
    async fn upstream_read_error_is_surfaced() {
        let (tx, _rx) = mpsc::channel(1);
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(chunk_line("one")),
            Err(io::Error::other("connection reset")),
        ];

        let result = pump_stream(&tx, stream::iter(chunks), Duration::from_secs(1)).await;
        assert!(result.is_err());
    }
}
