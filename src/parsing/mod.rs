pub mod factory;
pub mod language;
pub mod parser;
pub mod python;

pub use factory::ParserFactory;
pub use language::Language;
pub use parser::{LanguageParser, sanitize_call_name};
pub use python::PythonParser;
