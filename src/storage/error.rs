use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Profile {0} not found")]
    ProfileNotFound(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No index found at {}", .0.display())]
    IndexNotFound(std::path::PathBuf),
}

pub type StorageResult<T> = Result<T, StorageError>;
