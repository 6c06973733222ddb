//! Generation context assembly.
//!
//! Collects what the generation service sees for one profile: docstring,
//! a truncated source excerpt sliced by the profile's byte offsets, and
//! the summaries of immediate call neighbors that already finished. For
//! directories the context is the children's summaries instead.

use crate::pipeline::GenerateRequest;
use crate::storage::{CallGraph, ProfileStore};
use crate::{Profile, ProfileId};
use std::path::PathBuf;
use std::sync::Arc;

/// Cap on how many neighbor summaries ride along in one request.
const MAX_NEIGHBORS: usize = 8;

pub struct ContextBuilder {
    store: Arc<dyn ProfileStore>,
    graph: Arc<CallGraph>,
    /// Where `file_path`s resolve; `None` means excerpts are skipped
    /// (workers without a checkout still produce usable context).
    workspace_root: Option<PathBuf>,
    max_excerpt_chars: usize,
}

impl ContextBuilder {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        graph: Arc<CallGraph>,
        workspace_root: Option<PathBuf>,
        max_excerpt_chars: usize,
    ) -> Self {
        Self {
            store,
            graph,
            workspace_root,
            max_excerpt_chars,
        }
    }

    pub fn build_unit(&self, profile: &Profile) -> GenerateRequest {
        GenerateRequest {
            name: profile.name.clone(),
            qualified_name: profile.qualified_name.clone(),
            kind: profile.kind,
            docstring: profile.doc.clone(),
            code_excerpt: self.read_excerpt(profile),
            neighbor_summaries: self.neighbor_summaries(profile.id),
        }
    }

    pub fn build_directory(&self, profile: &Profile) -> GenerateRequest {
        let child_summaries = self
            .store
            .children(profile.id)
            .into_iter()
            .filter_map(|child| {
                child
                    .enrichment
                    .summary
                    .map(|summary| format!("{}: {summary}", child.qualified_name))
            })
            .collect();

        GenerateRequest {
            name: profile.name.clone(),
            qualified_name: profile.qualified_name.clone(),
            kind: profile.kind,
            docstring: None,
            code_excerpt: String::new(),
            neighbor_summaries: child_summaries,
        }
    }

    fn neighbor_summaries(&self, id: ProfileId) -> Vec<String> {
        let mut neighbor_ids = self.graph.callees(id);
        for caller in self.graph.callers(id) {
            if !neighbor_ids.contains(&caller) {
                neighbor_ids.push(caller);
            }
        }

        neighbor_ids
            .into_iter()
            .filter(|n| *n != id)
            .filter_map(|n| self.store.get(n))
            .filter_map(|p| {
                p.enrichment
                    .summary
                    .map(|summary| format!("{}: {summary}", p.qualified_name))
            })
            .take(MAX_NEIGHBORS)
            .collect()
    }

    /// Slice the profile's byte range out of its file, soft-failing to an
    /// empty excerpt when the file is unavailable.
    fn read_excerpt(&self, profile: &Profile) -> String {
        let Some(root) = &self.workspace_root else {
            return String::new();
        };

        let Ok(bytes) = std::fs::read(root.join(&profile.file_path)) else {
            return String::new();
        };

        let start = (profile.range.start_byte as usize).min(bytes.len());
        let end = (profile.range.end_byte as usize).min(bytes.len());
        if start >= end {
            return String::new();
        }

        let text = String::from_utf8_lossy(&bytes[start..end]);
        truncate_chars(&text, self.max_excerpt_chars)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => text[..offset].to_string(),
        None => text.to_string(),
    }
}
