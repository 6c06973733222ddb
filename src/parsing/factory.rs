//! Parser factory for creating language-specific extractors.

use super::{Language, LanguageParser, PythonParser};
use crate::IndexResult;

/// Creates extractors based on detected language. Parsers hold mutable
/// tree-sitter state, so each extraction thread gets its own instance.
#[derive(Debug, Default)]
pub struct ParserFactory;

impl ParserFactory {
    pub fn new() -> Self {
        Self
    }

    /// Create a parser for the specified language
    pub fn create_parser(&self, language: Language) -> IndexResult<Box<dyn LanguageParser>> {
        match language {
            Language::Python => {
                let parser = PythonParser::new()?;
                Ok(Box::new(parser))
            }
        }
    }
}
