//! Parser factory.
//!
//! Hands out an owned parser per request. Requests never share parser
//! state: two concurrent streams each get their own accumulated buffer, so
//! they cannot cross-contaminate each other's fields.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{
    parsers::AnalysisParser,
    traits::{FieldParser, ParseError},
};

type Constructor = fn() -> Box<dyn FieldParser>;

pub struct ParserFactory {
    registry: RwLock<HashMap<&'static str, Constructor>>,
}

impl ParserFactory {
    pub fn new() -> Self {
        let factory = Self {
            registry: RwLock::new(HashMap::new()),
        };
        factory.register("analysis", || Box::new(AnalysisParser::new()));
        factory
    }

    pub fn register(&self, kind: &'static str, constructor: Constructor) {
        self.registry.write().insert(kind, constructor);
    }

    /// Create a fresh parser for one request.
    pub fn create(&self, kind: &str) -> Result<Box<dyn FieldParser>, ParseError> {
        self.registry
            .read()
            .get(kind)
            .map(|constructor| constructor())
            .ok_or_else(|| ParseError::UnknownParserKind(kind.to_string()))
    }
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}
