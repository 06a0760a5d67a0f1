//! Generic marker-delimited field parser.

use crate::traits::{FieldDelta, FieldParser, ParseError, ParserConfig};

/// Config-driven parser over an append-only buffer.
///
/// Every `feed` rescans the entire buffer rather than tracking marker
/// offsets incrementally. That is quadratic in total buffer size per
/// fragment, which is fine for buffers bounded by model output length (low
/// thousands of characters) and keeps the rendering contract easy to reason
/// about: what a field shows depends only on the buffer content, never on
/// how the fragments were chunked.
pub struct BaseFieldParser {
    config: ParserConfig,
    buffer: String,
    rendered: Vec<Option<String>>,
}

impl BaseFieldParser {
    pub fn new(config: ParserConfig) -> Self {
        let rendered = vec![None; config.markers.len()];
        Self {
            config,
            buffer: String::new(),
            rendered,
        }
    }

    /// Current value of field `index` derived from the full buffer, trimmed.
    /// `None` while the field's marker has not appeared.
    fn derive(&self, index: usize) -> Option<&str> {
        let marker = &self.config.markers[index];
        let start = self.buffer.find(marker.token)? + marker.token.len();
        let rest = &self.buffer[start..];
        let end = self
            .config
            .markers
            .get(index + 1)
            .and_then(|next| rest.find(next.token))
            .unwrap_or(rest.len());
        Some(rest[..end].trim())
    }
}

impl FieldParser for BaseFieldParser {
    fn feed(&mut self, delta: &str) -> Result<Vec<FieldDelta>, ParseError> {
        if self.buffer.len() + delta.len() > self.config.max_buffer_size {
            return Err(ParseError::BufferOverflow(self.config.max_buffer_size));
        }
        self.buffer.push_str(delta);

        let mut changed = Vec::new();
        for index in 0..self.config.markers.len() {
            // A freshly appeared marker with no content yet computes to an
            // empty value; skipping it keeps whatever was rendered before.
            let value = match self.derive(index) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => continue,
            };
            if self.rendered[index].as_deref() == Some(value.as_str()) {
                continue;
            }
            changed.push(FieldDelta {
                name: self.config.markers[index].name,
                value: value.clone(),
            });
            self.rendered[index] = Some(value);
        }
        Ok(changed)
    }

    fn value(&self, name: &str) -> Option<&str> {
        let index = self
            .config
            .markers
            .iter()
            .position(|marker| marker.name == name)?;
        self.rendered[index].as_deref()
    }

    fn buffer(&self) -> &str {
        &self.buffer
    }

    fn reset(&mut self) {
        self.buffer.clear();
        for slot in &mut self.rendered {
            *slot = None;
        }
    }
}
