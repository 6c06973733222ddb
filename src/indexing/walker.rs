//! File system walker for discovering source files to index
//!
//! Directory traversal with support for:
//! - .gitignore rules
//! - Custom ignore patterns from configuration
//! - Language filtering
//! - Hidden file handling
//!
//! Results are sorted so downstream id assignment is deterministic.

use crate::Settings;
use crate::parsing::Language;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct FileWalker {
    settings: Arc<Settings>,
}

impl FileWalker {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Walk a directory and return the source files to index, sorted by
    /// path.
    pub fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(root);

        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .max_depth(None)
            .require_git(false);

        // Custom ignore patterns are added as exclusion overrides.
        let mut override_builder = ignore::overrides::OverrideBuilder::new(root);
        for pattern in &self.settings.indexing.ignore_patterns {
            if let Err(e) = override_builder.add(&format!("!{pattern}")) {
                tracing::warn!("Invalid ignore pattern '{pattern}': {e}");
            }
        }
        if let Ok(overrides) = override_builder.build() {
            builder.overrides(overrides);
        }

        let mut files: Vec<PathBuf> = builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter_map(|entry| {
                let path = entry.path();

                // Skip dot-files
                if path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'))
                {
                    return None;
                }

                Language::from_path(path).map(|_| path.to_path_buf())
            })
            .collect();

        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_walk_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "b.py", "x = 1\n");
        write(root, "a/main.py", "y = 2\n");
        write(root, "notes.txt", "not source\n");
        write(root, ".hidden.py", "z = 3\n");
        write(root, "__pycache__/cached.py", "w = 4\n");

        let walker = FileWalker::new(Arc::new(Settings::default()));
        let files = walker.walk(root);

        let rel: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(rel, vec!["a/main.py".to_string(), "b.py".to_string()]);
    }

    #[test]
    fn test_custom_ignore_patterns() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "keep.py", "a = 1\n");
        write(root, "generated/skip.py", "b = 2\n");

        let mut settings = Settings::default();
        settings
            .indexing
            .ignore_patterns
            .push("generated/**".to_string());

        let walker = FileWalker::new(Arc::new(settings));
        let files = walker.walk(root);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep.py"));
    }
}
