//! On-disk persistence of the index snapshot.
//!
//! The snapshot is one JSON document written atomically (temp file, then
//! rename) so readers never observe a half-written index.

use crate::storage::{IndexData, StorageError, StorageResult};
use std::fs;
use std::path::PathBuf;

const INDEX_FILE: &str = "index.json";

#[derive(Debug)]
pub struct IndexPersistence {
    base_path: PathBuf,
}

impl IndexPersistence {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn index_path(&self) -> PathBuf {
        self.base_path.join(INDEX_FILE)
    }

    #[must_use = "Save errors should be handled to ensure data is persisted"]
    pub fn save(&self, data: &IndexData) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path)?;

        let json = serde_json::to_vec_pretty(data)?;
        let tmp_path = self.base_path.join(format!("{INDEX_FILE}.tmp"));
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, self.index_path())?;
        Ok(())
    }

    #[must_use = "Load errors should be handled appropriately"]
    pub fn load(&self) -> StorageResult<IndexData> {
        let path = self.index_path();
        if !path.exists() {
            return Err(StorageError::IndexNotFound(path));
        }
        let content = fs::read(&path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    pub fn exists(&self) -> bool {
        self.index_path().exists()
    }

    pub fn clear(&self) -> StorageResult<()> {
        let path = self.index_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(temp_dir.path().to_path_buf());

        assert!(!persistence.exists());

        let mut data = IndexData::new();
        data.failed_files.push("broken.py".to_string());
        persistence.save(&data).unwrap();

        assert!(persistence.exists());
        let loaded = persistence.load().unwrap();
        assert_eq!(loaded.failed_files, vec!["broken.py".to_string()]);
    }

    #[test]
    fn test_load_missing_index() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(temp_dir.path().to_path_buf());

        assert!(matches!(
            persistence.load(),
            Err(StorageError::IndexNotFound(_))
        ));
    }

    #[test]
    fn test_clear() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = IndexPersistence::new(temp_dir.path().to_path_buf());

        persistence.save(&IndexData::new()).unwrap();
        assert!(persistence.exists());

        persistence.clear().unwrap();
        assert!(!persistence.exists());
    }
}
