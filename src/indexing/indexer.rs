//! Whole-workspace indexing orchestration.
//!
//! Pipeline: walk the workspace, extract every file in parallel (each file
//! is an isolated unit of work; a failed file is recorded and skipped),
//! merge the per-file profile lists into one id space, synthesize the
//! directory/root containment skeleton, then run the two whole-workspace
//! passes behind the extraction barrier: call resolution and ranking.

use crate::indexing::{FileWalker, Resolver};
use crate::parsing::{Language, ParserFactory};
use crate::storage::{CallGraph, IndexData};
use crate::{
    EnrichmentRecord, FileId, IndexError, IndexResult, Profile, ProfileId, ProfileKind, Range,
    Settings, ranking,
};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub files_failed: usize,
    pub profiles: usize,
    pub edges: usize,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files indexed ({} failed), {} profiles, {} call edges",
            self.files_indexed, self.files_failed, self.profiles, self.edges
        )
    }
}

pub struct IndexOutcome {
    pub data: IndexData,
    pub stats: IndexStats,
}

impl IndexOutcome {
    /// Call graph over the unit profiles, in workspace order.
    pub fn call_graph(&self) -> CallGraph {
        CallGraph::build(
            self.data
                .profiles
                .iter()
                .filter(|p| p.kind.is_unit())
                .map(|p| p.id),
            &self.data.edges,
        )
    }
}

pub struct WorkspaceIndexer {
    settings: Arc<Settings>,
}

impl WorkspaceIndexer {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Index a workspace from scratch. Only workspace-level problems (an
    /// unreadable root, a broken thread pool) abort; per-file failures are
    /// recorded in the outcome and the rest of the workspace proceeds.
    pub fn index(&self, root: &Path) -> IndexResult<IndexOutcome> {
        if !root.is_dir() {
            return Err(IndexError::InvalidWorkspace {
                path: root.to_path_buf(),
            });
        }

        let files = FileWalker::new(Arc::clone(&self.settings)).walk(root);
        tracing::info!("Discovered {} source files", files.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.indexing.parallel_threads)
            .build()
            .map_err(|e| IndexError::Config(format!("thread pool: {e}")))?;

        // Per-file extraction: no shared mutable state, order preserved by
        // the indexed parallel iterator.
        let results: Vec<Result<Vec<Profile>, (String, String)>> = pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .map(|(i, path)| {
                    let relative = relative_path(path, root);
                    let file_id =
                        FileId::new(i as u32 + 1).expect("file id space exhausted");

                    let source = fs::read_to_string(path)
                        .map_err(|e| (relative.clone(), e.to_string()))?;

                    let language = Language::from_path(path)
                        .ok_or_else(|| (relative.clone(), "unsupported language".to_string()))?;
                    let mut parser = ParserFactory::new()
                        .create_parser(language)
                        .map_err(|e| (relative.clone(), e.to_string()))?;

                    let mut counter = 0;
                    parser
                        .extract(&source, &relative, file_id, &mut counter)
                        .map_err(|e| (relative.clone(), e.to_string()))
                })
                .collect()
        });

        // Merge into a single id space, in file order.
        let mut profiles: Vec<Profile> = Vec::new();
        let mut file_map: HashMap<String, FileId> = HashMap::new();
        let mut failed_files: Vec<String> = Vec::new();
        let mut base: u32 = 0;

        for result in results {
            match result {
                Ok(local) => {
                    let count = local.len() as u32;
                    for profile in local {
                        let rebased = rebase(profile, base);
                        if rebased.kind == ProfileKind::File
                            && let Some(file_id) = rebased.file_id
                        {
                            file_map.insert(rebased.file_path.clone(), file_id);
                        }
                        profiles.push(rebased);
                    }
                    base += count;
                }
                Err((path, reason)) => {
                    tracing::warn!("Skipping {path}: {reason}");
                    failed_files.push(path);
                }
            }
        }

        let files_indexed = file_map.len();
        let files_failed = failed_files.len();

        synthesize_containment(&mut profiles, root, &mut base);

        // Barrier: resolution and ranking need the complete profile set.
        let resolver = Resolver::new(&profiles);
        let edges = resolver.resolve(&profiles);

        let graph = CallGraph::build(
            profiles.iter().filter(|p| p.kind.is_unit()).map(|p| p.id),
            &edges,
        );
        let scores = ranking::rank(&graph, &self.settings.ranking);
        for profile in &mut profiles {
            if let Some(score) = scores.get(&profile.id) {
                profile.score = Some(*score);
            }
        }

        let stats = IndexStats {
            files_indexed,
            files_failed,
            profiles: profiles.len(),
            edges: edges.len(),
        };
        tracing::info!("Indexing complete: {stats}");

        Ok(IndexOutcome {
            data: IndexData {
                profiles,
                edges,
                file_map,
                failed_files,
            },
            stats,
        })
    }
}

fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Shift a profile's local ids into the workspace id space.
fn rebase(mut profile: Profile, base: u32) -> Profile {
    profile.id =
        ProfileId::new(profile.id.value() + base).expect("profile id space exhausted");
    profile.parent_id = profile
        .parent_id
        .and_then(|p| ProfileId::new(p.value() + base));
    profile
}

/// Attach file profiles to synthesized directory profiles and a single
/// workspace root, so containment forms one forest per workspace.
fn synthesize_containment(profiles: &mut Vec<Profile>, root: &Path, next_id: &mut u32) {
    fn alloc(next_id: &mut u32) -> ProfileId {
        *next_id += 1;
        ProfileId::new(*next_id).expect("profile id space exhausted")
    }

    let root_name = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(".")
        .to_string();
    let root_id = alloc(next_id);

    // Distinct ancestor directories of all files, parents before children.
    let mut dirs: BTreeSet<String> = BTreeSet::new();
    for profile in profiles.iter() {
        if profile.kind != ProfileKind::File {
            continue;
        }
        let mut ancestor = Path::new(&profile.file_path);
        while let Some(parent) = ancestor.parent() {
            if !parent.as_os_str().is_empty() {
                dirs.insert(parent.to_string_lossy().replace('\\', "/"));
            }
            ancestor = parent;
        }
    }

    let mut dir_ids: HashMap<String, ProfileId> = HashMap::new();
    let mut synthesized: Vec<Profile> = Vec::new();

    for dir in &dirs {
        let id = alloc(next_id);
        let parent_id = Path::new(dir)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| dir_ids[&p.to_string_lossy().replace('\\', "/")])
            .unwrap_or(root_id);
        dir_ids.insert(dir.clone(), id);

        let name = Path::new(dir)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(dir)
            .to_string();
        synthesized.push(Profile {
            id,
            kind: ProfileKind::Directory,
            name,
            qualified_name: dir.clone(),
            file_path: dir.clone(),
            file_id: None,
            range: Range::new(0, 0, 0, 0),
            doc: None,
            params: Vec::new(),
            calls: Vec::new(),
            parent_id: Some(parent_id),
            enrichment: EnrichmentRecord::default(),
            score: None,
        });
    }

    for profile in profiles.iter_mut() {
        if profile.kind == ProfileKind::File {
            let parent = Path::new(&profile.file_path)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .and_then(|p| dir_ids.get(&p.to_string_lossy().replace('\\', "/")).copied())
                .unwrap_or(root_id);
            profile.parent_id = Some(parent);
        }
    }

    profiles.push(Profile {
        id: root_id,
        kind: ProfileKind::Root,
        name: root_name,
        qualified_name: ".".to_string(),
        file_path: ".".to_string(),
        file_id: None,
        range: Range::new(0, 0, 0, 0),
        doc: None,
        params: Vec::new(),
        calls: Vec::new(),
        parent_id: None,
        enrichment: EnrichmentRecord::default(),
        score: None,
    });
    profiles.extend(synthesized);
}
