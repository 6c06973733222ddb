//! The structural unit record produced by extraction.
//!
//! A `Profile` is one node of the workspace hierarchy: the workspace root,
//! a directory, a file, a class, or a function/method. Profiles are created
//! once per parse pass; only the enrichment record is mutated afterwards,
//! and only by the dispatch/worker subsystem.

use crate::{Confidence, EnrichmentState, FileId, ProfileId, ProfileKind, Range};
use serde::{Deserialize, Serialize};

/// One parameter of a function or method. Variadic parameters keep their
/// `*`/`**` marker as a name prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default: None,
        }
    }
}

/// Enrichment bookkeeping for a profile. The attempt count is persisted so
/// a restarted worker resumes from the stored count instead of zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub state: EnrichmentState,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub kind: ProfileKind,
    /// Display name: function/method/class name, file name, or directory name.
    pub name: String,
    /// Workspace-unique identifier: `<relative file path>::<dotted local path>`
    /// for units, the relative path itself for files and directories.
    pub qualified_name: String,
    /// Relative path of the owning file. Directory and root profiles carry
    /// their own relative path here.
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
    pub range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    /// Raw outbound call references as written in source, in source order.
    /// Resolved into edges only by the whole-workspace resolver.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<String>,
    /// Containment parent. `None` only for the workspace root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ProfileId>,
    #[serde(default)]
    pub enrichment: EnrichmentRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Profile {
    /// Dotted path of the unit inside its file (`Helper.run`, `g`). Empty
    /// for file, directory and root profiles.
    pub fn local_name(&self) -> &str {
        match self.qualified_name.split_once("::") {
            Some((_, local)) => local,
            None => "",
        }
    }

    /// Name of the enclosing class path for methods and nested classes
    /// (`Helper` for `Helper.run`, `Outer.Inner` for `Outer.Inner.run`).
    pub fn class_path(&self) -> Option<&str> {
        let local = self.local_name();
        local.rsplit_once('.').map(|(head, _)| head)
    }
}

/// A resolved caller→callee edge. Produced only by the resolver, after all
/// profiles of the workspace exist; both endpoints are guaranteed present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: ProfileId,
    pub callee: ProfileId,
    pub confidence: Confidence,
}
