use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProfileId(NonZeroU32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(NonZeroU32);

/// Source span of a profile. Line numbers are 1-based; byte offsets index
/// into the file's raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub end_line: u32,
    pub start_byte: u32,
    pub end_byte: u32,
}

/// Kind of structural unit. Containment between kinds forms a forest:
/// the root contains directories, directories contain files, files contain
/// classes and functions, classes contain methods and nested classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Root,
    Directory,
    File,
    Class,
    Function,
    Method,
}

impl ProfileKind {
    /// Units produced directly by a parser pass, as opposed to the
    /// root/directory profiles synthesized during workspace assembly.
    pub fn is_unit(self) -> bool {
        matches!(
            self,
            Self::File | Self::Class | Self::Function | Self::Method
        )
    }
}

/// Enrichment lifecycle of a profile. `Pending` is the initial state;
/// `Done` and `Failed` (after the attempt ceiling) are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentState {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl Default for EnrichmentState {
    fn default() -> Self {
        Self::Pending
    }
}

/// How a call reference was resolved to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Matched by qualified name in the same file, or through an explicit
    /// `self`/`cls` receiver on the enclosing class.
    Exact,
    /// Matched as the unique bare-name candidate across the workspace.
    Heuristic,
}

impl ProfileId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

impl FileId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

impl Range {
    pub fn new(start_line: u32, end_line: u32, start_byte: u32, end_byte: u32) -> Self {
        Self {
            start_line,
            end_line,
            start_byte,
            end_byte,
        }
    }

    pub fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_id_creation() {
        assert!(ProfileId::new(0).is_none());

        let id = ProfileId::new(42).unwrap();
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn test_file_id_creation() {
        assert!(FileId::new(0).is_none());

        let id = FileId::new(7).unwrap();
        assert_eq!(id.value(), 7);
    }

    #[test]
    fn test_range_line_count() {
        let range = Range::new(10, 14, 120, 300);
        assert_eq!(range.line_count(), 5);

        let single = Range::new(3, 3, 40, 60);
        assert_eq!(single.line_count(), 1);
    }

    #[test]
    fn test_unit_kinds() {
        assert!(ProfileKind::File.is_unit());
        assert!(ProfileKind::Class.is_unit());
        assert!(ProfileKind::Function.is_unit());
        assert!(ProfileKind::Method.is_unit());
        assert!(!ProfileKind::Directory.is_unit());
        assert!(!ProfileKind::Root.is_unit());
    }

    #[test]
    fn test_id_equality_and_hash() {
        let id1 = ProfileId::new(42).unwrap();
        let id2 = ProfileId::new(42).unwrap();
        let id3 = ProfileId::new(43).unwrap();

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);

        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(id1);
        assert!(set.contains(&id2));
        assert!(!set.contains(&id3));
    }
}
