//! Serializable snapshot of a fully indexed workspace.

use crate::{CallEdge, FileId, Profile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct IndexData {
    pub profiles: Vec<Profile>,
    pub edges: Vec<CallEdge>,
    pub file_map: HashMap<String, FileId>,
    /// Files the parser could not process; recorded, never fatal.
    #[serde(default)]
    pub failed_files: Vec<String>,
}

impl IndexData {
    pub fn new() -> Self {
        Self::default()
    }
}
