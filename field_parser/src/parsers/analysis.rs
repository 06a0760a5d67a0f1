//! Sentence-analysis field parser.
//!
//! Parses the three-field structure the analyzer prompt asks the model for:
//! `[grammar]...[phrases]...[tip]...`, with no end marker after the tip.

use crate::{
    parsers::BaseFieldParser,
    traits::{FieldDelta, FieldMarker, FieldParser, ParseError, ParserConfig},
};

pub const GRAMMAR: &str = "grammar";
pub const PHRASES: &str = "phrases";
pub const TIP: &str = "tip";

/// Split a raw phrase-list value into display tags. Both ASCII and
/// full-width commas separate tags; blank tags are dropped.
pub fn split_phrases(raw: &str) -> Vec<String> {
    raw.split([',', '，'])
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Frozen view of the field set, taken when the stream ends. No
/// recomputation happens after this point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSnapshot {
    pub grammar: Option<String>,
    pub phrases: Vec<String>,
    pub tip: Option<String>,
}

/// Incremental parser for the analysis stream.
pub struct AnalysisParser {
    base: BaseFieldParser,
}

impl AnalysisParser {
    pub fn new() -> Self {
        let config = ParserConfig {
            markers: vec![
                FieldMarker {
                    name: GRAMMAR,
                    token: "[grammar]",
                },
                FieldMarker {
                    name: PHRASES,
                    token: "[phrases]",
                },
                FieldMarker {
                    name: TIP,
                    token: "[tip]",
                },
            ],
            ..ParserConfig::default()
        };
        Self {
            base: BaseFieldParser::new(config),
        }
    }

    /// Current phrase tags, split from the raw phrases field.
    pub fn phrase_tags(&self) -> Vec<String> {
        self.base
            .value(PHRASES)
            .map(split_phrases)
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        AnalysisSnapshot {
            grammar: self.base.value(GRAMMAR).map(str::to_string),
            phrases: self.phrase_tags(),
            tip: self.base.value(TIP).map(str::to_string),
        }
    }
}

impl Default for AnalysisParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldParser for AnalysisParser {
    fn feed(&mut self, delta: &str) -> Result<Vec<FieldDelta>, ParseError> {
        self.base.feed(delta)
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.base.value(name)
    }

    fn buffer(&self) -> &str {
        self.base.buffer()
    }

    fn reset(&mut self) {
        self.base.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_appear_incrementally_as_fragments_arrive() {
        let mut parser = AnalysisParser::new();

        parser.feed("[grammar]Past tense").unwrap();
        assert_eq!(parser.value(GRAMMAR), Some("Past tense"));
        assert_eq!(parser.value(PHRASES), None);
        assert_eq!(parser.value(TIP), None);

        parser.feed(" used here.[phrases]go,").unwrap();
        assert_eq!(parser.value(GRAMMAR), Some("Past tense used here."));
        // Trailing comma: the second tag is still pending.
        assert_eq!(parser.phrase_tags(), vec!["go"]);
        assert_eq!(parser.value(TIP), None);

        parser.feed(" went[tip]Remember go→went").unwrap();
        assert_eq!(parser.phrase_tags(), vec!["go", "went"]);
        assert_eq!(parser.value(TIP), Some("Remember go→went"));
    }

    #[test]
    fn final_fields_are_chunk_size_independent() {
        let text = "[grammar]一般过去时，描述过去的动作。[phrases]go to school, went home，come back[tip]go 的过去式是 went";

        let mut whole = AnalysisParser::new();
        whole.feed(text).unwrap();

        for chunk_size in [1, 2, 3, 5, 7, 11, 64] {
            let mut chunked = AnalysisParser::new();
            let chars: Vec<char> = text.chars().collect();
            for chunk in chars.chunks(chunk_size) {
                chunked.feed(&chunk.iter().collect::<String>()).unwrap();
            }
            assert_eq!(
                chunked.snapshot(),
                whole.snapshot(),
                "diverged at chunk size {chunk_size}"
            );
        }
    }

    #[test]
    fn rendered_value_never_regresses_to_empty() {
        let mut parser = AnalysisParser::new();
        let fragments = ["[grammar]", "present", " simple", "[phrases]", "a, b", "[tip]", "t"];

        let mut last_grammar = String::new();
        for fragment in fragments {
            parser.feed(fragment).unwrap();
            let grammar = parser.value(GRAMMAR).unwrap_or("");
            assert!(
                !(grammar.is_empty() && !last_grammar.is_empty()),
                "grammar regressed from {last_grammar:?} to empty"
            );
            last_grammar = grammar.to_string();
        }
        assert_eq!(last_grammar, "present simple");
    }

    #[test]
    fn split_phrases_handles_both_comma_kinds() {
        assert_eq!(
            split_phrases("go to school, 回家，come back"),
            vec!["go to school", "回家", "come back"]
        );
        assert_eq!(split_phrases(" , ，"), Vec::<String>::new());
    }

    #[test]
    fn missing_middle_marker_runs_field_to_next_present_marker() {
        // The model skipped [phrases]; grammar runs up to [tip] only if its
        // own next marker is absent, so here it swallows the tip text too —
        // graceful degradation, not an error.
        let mut parser = AnalysisParser::new();
        parser.feed("[grammar]all of it[tip]still inside grammar").unwrap();
        assert_eq!(
            parser.value(GRAMMAR),
            Some("all of it[tip]still inside grammar")
        );
        assert_eq!(parser.value(PHRASES), None);
        // The tip field itself still resolves independently.
        assert_eq!(parser.value(TIP), Some("still inside grammar"));
    }

    #[test]
    fn snapshot_of_empty_stream_is_all_unknown() {
        let parser = AnalysisParser::new();
        assert_eq!(parser.snapshot(), AnalysisSnapshot::default());
    }

    #[test]
    fn marker_split_across_fragments_is_found_on_rescan() {
        let mut parser = AnalysisParser::new();
        parser.feed("[gram").unwrap();
        assert_eq!(parser.value(GRAMMAR), None);
        parser.feed("mar]found").unwrap();
        assert_eq!(parser.value(GRAMMAR), Some("found"));
    }
}
