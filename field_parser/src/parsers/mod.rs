mod analysis;
mod base;

pub use analysis::{split_phrases, AnalysisParser, AnalysisSnapshot};
pub use base::BaseFieldParser;
