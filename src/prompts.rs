//! System prompts for the two request modes, and log preview helpers.

/// Instructs the model to structure its analysis with the three literal
/// markers the client-side field parser looks for. There is deliberately no
/// end marker after `[tip]` — the terminal field runs to end of output.
pub const SYSTEM_ANALYZER: &str = "You are an expert English tutor. Analyze the sentence structure and vocabulary.\n\
Structure your response using these exact markers:\n\
[grammar] - Grammar analysis in Chinese\n\
[phrases] - Key phrases, comma separated\n\
[tip] - Mnemonic tip in Chinese";

/// System prompt for a free-form follow-up question about `context`.
pub fn system_chat(context: &str) -> String {
    format!(
        "You are an expert English tutor. The user is asking about this specific text: \"{context}\".\n\
Provide a helpful, professional, and concise answer in Chinese.\n\
Focus on linguistic nuances, alternative usages, or clarifying confusion."
    )
}

/// Short request preview for log lines. Truncation is character-based, so
/// multi-byte text never splits mid-scalar.
pub fn debug_tag(kind: &str, text: &str) -> String {
    const PREVIEW_CHARS: usize = 30;
    let preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        format!("{kind}: {preview}...")
    } else {
        format!("{kind}: {preview}")
    }
}
