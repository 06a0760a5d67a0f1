//! Client-facing API types for the gateway's two streaming endpoints.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

/// Request body for `POST /api/chat` — a free-form follow-up question about
/// previously analyzed text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub context: String,
    pub message: String,
}

/// The frozen field set of a completed analysis stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFields {
    pub grammar: String,
    pub phrases: Vec<String>,
    #[serde(rename = "memoryTip")]
    pub memory_tip: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_fields_uses_wire_name_for_memory_tip() {
        let fields = AnalysisFields {
            grammar: "past tense".to_string(),
            phrases: vec!["go".to_string(), "went".to_string()],
            memory_tip: "go→went".to_string(),
        };
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["memoryTip"], "go→went");
        assert!(json.get("memory_tip").is_none());
    }
}
