//! Byte-to-line reassembly for the gateway's event stream.
//!
//! The transport chunks bytes at arbitrary boundaries — including in the
//! middle of a multi-byte UTF-8 scalar — so decoding state carries across
//! reads instead of being reset per chunk. Lines are reassembled from a
//! carry-over buffer holding the trailing unterminated segment.

/// Incremental decoder + line splitter.
///
/// Mode-agnostic: it yields complete logical lines verbatim and leaves
/// `data:` payload extraction to the consumer
/// (`memo_protocol::stream::event_payload`).
#[derive(Debug, Default)]
pub struct FrameReassembler {
    /// Decoded text of the last, possibly-incomplete line.
    carry: String,
    /// Trailing bytes of an incomplete UTF-8 scalar (at most 3).
    partial: Vec<u8>,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk, returning every line it completed.
    ///
    /// A logical line is never split across two calls, and no byte is ever
    /// dropped or duplicated, regardless of where the transport cut the
    /// chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);
        self.drain_lines()
    }

    /// Flush the trailing carry-over after the stream ends.
    pub fn finish(&mut self) -> Option<String> {
        let mut rest = std::mem::take(&mut self.carry);
        if !self.partial.is_empty() {
            // The stream ended inside a scalar; decode what there is.
            self.partial.clear();
            rest.push('\u{FFFD}');
        }
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    fn decode(&mut self, chunk: &[u8]) {
        let stitched: Vec<u8>;
        let mut bytes: &[u8] = if self.partial.is_empty() {
            chunk
        } else {
            self.partial.extend_from_slice(chunk);
            stitched = std::mem::take(&mut self.partial);
            &stitched
        };

        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    self.carry.push_str(text);
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&bytes[..valid]) {
                        self.carry.push_str(text);
                    }
                    match err.error_len() {
                        // Scalar cut off by the chunk boundary: keep its
                        // prefix for the next read.
                        None => {
                            self.partial = bytes[valid..].to_vec();
                            break;
                        }
                        // Genuinely invalid bytes: substitute and move on.
                        Some(skip) => {
                            self.carry.push('\u{FFFD}');
                            bytes = &bytes[valid + skip..];
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(pos) = self.carry.find('\n') {
            let mut line: String = self.carry.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }
}
