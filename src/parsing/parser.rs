//! Language parser trait
//!
//! Defines the common interface every language extractor implements to work
//! with the indexing system. A parser turns one file into an ordered list
//! of profiles in a single pass over the syntax tree.

use crate::parsing::Language;
use crate::{FileId, IndexResult, Profile};

/// Common interface for all language extractors.
///
/// Contract:
/// - The first returned profile is the file profile; unit profiles follow
///   in source order.
/// - Profile ids are allocated from `counter` and are local to the call;
///   the caller rebases them into the workspace id space.
/// - `parent_id` links between the returned profiles form a tree rooted at
///   the file profile.
/// - Identical input bytes yield an identical, identically-ordered list.
pub trait LanguageParser: Send {
    /// Extract structural profiles from one file.
    fn extract(
        &mut self,
        source: &str,
        relative_path: &str,
        file_id: FileId,
        counter: &mut u32,
    ) -> IndexResult<Vec<Profile>>;

    /// Get the language this parser handles
    fn language(&self) -> Language;
}

/// Strip all whitespace from a call expression as written in source, so
/// `obj .method` and `obj.method` resolve identically.
pub fn sanitize_call_name(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_call_name() {
        assert_eq!(sanitize_call_name("foo"), "foo");
        assert_eq!(sanitize_call_name("obj .method"), "obj.method");
        assert_eq!(sanitize_call_name("f (\n)"), "f()");
        assert_eq!(sanitize_call_name("a. b .c"), "a.b.c");
    }
}
