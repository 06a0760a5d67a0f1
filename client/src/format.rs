//! Display formatting for the free-form chat stream.
//!
//! The chat response is plain text with a restricted markup subset. The
//! whole accumulated text is re-rendered on every delta; buffers are
//! bounded by model output length, so the repeated work stays cheap.

/// Convert accumulated chat text into display-safe markup.
///
/// HTML metacharacters are escaped BEFORE any markup substitution: the
/// substituted tags are never re-escaped, and user content can never
/// smuggle markup past the escaping.
pub fn render_markup(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    let formatted = wrap_delimited(&escaped, "**", "<strong>", "</strong>");
    let formatted = wrap_delimited(&formatted, "`", "<code>", "</code>");
    formatted
        .replace("\n\n", "<br><span class=\"memo-gap\"></span>")
        .replace('\n', "<br>")
}

/// Wrap text between pairs of `delim` in open/close tags. An unpaired
/// trailing delimiter — common while the stream is still arriving — is left
/// verbatim.
fn wrap_delimited(input: &str, delim: &str, open: &str, close: &str) -> String {
    let parts: Vec<&str> = input.split(delim).collect();
    if parts.len() < 2 {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    for (index, part) in parts.iter().enumerate() {
        if index % 2 == 1 {
            if index == parts.len() - 1 {
                out.push_str(delim);
                out.push_str(part);
            } else {
                out.push_str(open);
                out.push_str(part);
                out.push_str(close);
            }
        } else {
            out.push_str(part);
        }
    }
    out
}
