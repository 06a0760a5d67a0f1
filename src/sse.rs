//! SSE primitives for the relay.
//!
//! Provides upstream line framing, content-delta extraction, outbound event
//! formatting, and the channel send helpers used by the relay pump.

use std::io;

use bytes::{Bytes, BytesMut};
use memchr::memchr;
use thiserror::Error;
use tokio::sync::mpsc;

use memo_protocol::stream::{DATA_PREFIX, DONE_SENTINEL};

// ============================================================================
// Constants
// ============================================================================

/// Maximum carry-over for a single upstream line (1 MB). Guards against an
/// upstream that never sends a line terminator.
const MAX_LINE_BUFFER_SIZE: usize = 1024 * 1024;

// ============================================================================
// Upstream line framing
// ============================================================================

#[derive(Debug, Error)]
#[error("upstream line exceeded {MAX_LINE_BUFFER_SIZE} bytes without a terminator")]
pub struct LineOverflow;

/// Reassembles raw event lines from an upstream byte stream.
///
/// Bytes accumulate until a `\n`; complete lines are handed out with the
/// terminator (and a trailing `\r`) stripped, and the unterminated tail is
/// retained for the next chunk. Multi-byte characters split across chunks
/// stay buffered as bytes until their line completes.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, LineOverflow> {
        self.buf.extend_from_slice(chunk);
        if self.buf.len() > MAX_LINE_BUFFER_SIZE {
            return Err(LineOverflow);
        }

        let mut lines = Vec::new();
        while let Some(pos) = memchr(b'\n', &self.buf) {
            let line = self.buf.split_to(pos + 1);
            let mut end = line.len() - 1;
            if end > 0 && line[end - 1] == b'\r' {
                end -= 1;
            }
            lines.push(String::from_utf8_lossy(&line[..end]).into_owned());
        }
        Ok(lines)
    }

    /// Flush the unterminated tail after the upstream closes.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

// ============================================================================
// Delta extraction
// ============================================================================

/// What one raw upstream line contributes to the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaLine {
    /// A content fragment — possibly empty, which means "present but
    /// contributes no text" and is distinct from `Skip`.
    Token(String),
    /// The termination sentinel: clean end-of-stream, not an error.
    Done,
    /// Nothing usable on this line. Blank lines, framing noise, and
    /// malformed payloads all land here; a single bad line never aborts the
    /// stream.
    Skip,
}

/// Extract the content delta carried by one raw upstream line.
pub fn extract_delta(line: &str) -> DeltaLine {
    let data = line.trim();
    let data = data.strip_prefix(DATA_PREFIX).map(str::trim).unwrap_or(data);

    if data == DONE_SENTINEL {
        return DeltaLine::Done;
    }
    if data.is_empty() {
        return DeltaLine::Skip;
    }
    match find_content_value(data) {
        Some(raw) => DeltaLine::Token(unescape_fragment(raw)),
        None => DeltaLine::Skip,
    }
}

/// Locate the raw (still escaped) value of the first well-formed
/// `"content": "..."` pair in `data`.
///
/// The closing quote is the first `"` not consumed by a preceding backslash
/// escape, found with a single left-to-right scan — escaped quotes inside
/// the value do not terminate it.
fn find_content_value(data: &str) -> Option<&str> {
    const KEY: &str = "\"content\"";

    let mut search_from = 0;
    while let Some(found) = data[search_from..].find(KEY) {
        let key_end = search_from + found + KEY.len();
        let rest = data[key_end..].trim_start();
        if let Some(rest) = rest.strip_prefix(':') {
            let rest = rest.trim_start();
            if let Some(value) = rest.strip_prefix('"') {
                return find_closing_quote(value).map(|end| &value[..end]);
            }
        }
        // Key-looking text that is not a string-valued "content" pair
        // (e.g. "content": null); try the next occurrence.
        search_from = key_end;
    }
    None
}

fn find_closing_quote(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Unescape `\n`, `\"`, and `\\` in one left-to-right pass.
///
/// A single pass is load-bearing: sequential global replacements turn the
/// source text `\\n` (a literal backslash followed by `n`) into a newline.
/// Unknown escapes pass through untouched.
fn unescape_fragment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ============================================================================
// Outbound event formatting and sending
// ============================================================================

/// Format one content fragment as a single outbound framed unit.
///
/// A fragment containing embedded newlines becomes one multi-line frame
/// (`data:` per line), keeping the transport framing line-safe.
pub fn format_token_event(token: &str) -> Bytes {
    let mut out = String::with_capacity(token.len() + 16);
    for line in token.split('\n') {
        out.push_str(DATA_PREFIX);
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    Bytes::from(out)
}

/// Best-effort failure indicator: a data-less event, invisible to payload
/// consumers but observable by monitoring clients.
pub fn format_error_event() -> Bytes {
    Bytes::from_static(b"event: relay_error\n\n")
}

/// Send pre-formatted bytes to the client. Returns `false` when the client
/// is gone.
pub(crate) async fn send_bytes(
    tx: &mpsc::Sender<Result<Bytes, io::Error>>,
    bytes: Bytes,
) -> bool {
    tx.send(Ok(bytes)).await.is_ok()
}

/// Format and send one token. Returns `false` when the client is gone.
pub(crate) async fn send_token(
    tx: &mpsc::Sender<Result<Bytes, io::Error>>,
    token: &str,
) -> bool {
    send_bytes(tx, format_token_event(token)).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(extract_delta(line), DeltaLine::Token("Hello".to_string()));
    }

    #[test]
    fn escaped_quote_does_not_truncate_the_value() {
        let line = r#"data: {"choices":[{"delta":{"content":"He said \"hi\""}}]}"#;
        assert_eq!(
            extract_delta(line),
            DeltaLine::Token(r#"He said "hi""#.to_string())
        );
    }

    #[test]
    fn newline_escape_is_unescaped() {
        let line = r#"data: {"choices":[{"delta":{"content":"a\nb"}}]}"#;
        assert_eq!(extract_delta(line), DeltaLine::Token("a\nb".to_string()));
    }

    #[test]
    fn literal_backslash_n_survives_unescaping() {
        // Source text contains the two characters `\` and `n`, escaped on
        // the wire as `\\n`. Three sequential global replaces would turn
        // this into a newline.
        let line = r#"data: {"choices":[{"delta":{"content":"a\\nb"}}]}"#;
        assert_eq!(extract_delta(line), DeltaLine::Token("a\\nb".to_string()));
    }

    #[test]
    fn done_sentinel_is_a_clean_end_not_an_error() {
        assert_eq!(extract_delta("data: [DONE]"), DeltaLine::Done);
        assert_eq!(extract_delta("data:[DONE]"), DeltaLine::Done);
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(extract_delta(""), DeltaLine::Skip);
        assert_eq!(extract_delta("   "), DeltaLine::Skip);
        assert_eq!(extract_delta("data:"), DeltaLine::Skip);
    }

    #[test]
    fn malformed_lines_are_skipped_silently() {
        assert_eq!(extract_delta("not json at all"), DeltaLine::Skip);
        assert_eq!(
            extract_delta(r#"data: {"choices":[{"delta":{}}]}"#),
            DeltaLine::Skip
        );
        // Unterminated content value.
        assert_eq!(
            extract_delta(r#"data: {"delta":{"content":"runs off"#),
            DeltaLine::Skip
        );
    }

    #[test]
    fn null_content_is_skipped_but_later_pair_is_found() {
        let line = r#"data: {"a":{"content":null},"delta":{"content":"x"}}"#;
        assert_eq!(extract_delta(line), DeltaLine::Token("x".to_string()));
    }

    #[test]
    fn empty_content_is_a_fragment_not_a_skip() {
        let line = r#"data: {"choices":[{"delta":{"content":""}}]}"#;
        assert_eq!(extract_delta(line), DeltaLine::Token(String::new()));
    }

    #[test]
    fn whitespace_around_the_colon_is_tolerated() {
        let line = r#"data: {"delta":{"content"  :  "spaced"}}"#;
        assert_eq!(extract_delta(line), DeltaLine::Token("spaced".to_string()));
    }

    #[test]
    fn framer_reassembles_lines_across_chunk_boundaries() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"data: {\"cont").unwrap().is_empty());
        let lines = framer.push(b"ent\":\"x\"}\ndata: next").unwrap();
        assert_eq!(lines, vec!["data: {\"content\":\"x\"}"]);
        assert_eq!(framer.finish().as_deref(), Some("data: next"));
    }

    #[test]
    fn framer_strips_crlf() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"one\r\ntwo\n").unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn framer_holds_split_multibyte_bytes_until_the_line_completes() {
        let mut framer = LineFramer::new();
        let bytes = "data:好\n".as_bytes();
        assert!(framer.push(&bytes[..6]).unwrap().is_empty());
        assert_eq!(framer.push(&bytes[6..]).unwrap(), vec!["data:好"]);
    }

    #[test]
    fn framer_rejects_terminator_free_floods() {
        let mut framer = LineFramer::new();
        let chunk = vec![b'x'; MAX_LINE_BUFFER_SIZE + 1];
        assert!(framer.push(&chunk).is_err());
    }

    #[test]
    fn token_event_is_one_blank_line_terminated_frame() {
        let bytes = format_token_event("Hello");
        assert_eq!(&bytes[..], b"data:Hello\n\n");
    }

    #[test]
    fn multiline_token_stays_inside_one_frame() {
        let bytes = format_token_event("a\nb");
        assert_eq!(&bytes[..], b"data:a\ndata:b\n\n");
    }

    #[test]
    fn error_event_carries_no_payload() {
        let bytes = format_error_event();
        assert!(!bytes.windows(5).any(|w| w == &b"data:"[..]));
    }
}
