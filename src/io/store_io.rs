use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::model::task::Task;

/// Default store file name
pub const STORE_FILE: &str = "tasks.json";

const STORE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no task store at {0} (run `tb init`)")]
    NotFound(PathBuf),
    #[error("task store already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unsupported store version {0}")]
    UnsupportedVersion(u32),
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not serialize tasks: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// On-disk layout of the reference authority
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    tasks: Vec<Task>,
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create an empty store. Fails if one exists.
pub fn init_store(path: &Path) -> Result<(), StoreError> {
    if path.exists() {
        return Err(StoreError::AlreadyExists(path.to_path_buf()));
    }
    save_store(path, &[])
}

pub fn load_store(path: &Path) -> Result<Vec<Task>, StoreError> {
    let text = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(path.to_path_buf())
        } else {
            StoreError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let store: StoreFile = serde_json::from_str(&text).map_err(|e| StoreError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    if store.version != STORE_VERSION {
        return Err(StoreError::UnsupportedVersion(store.version));
    }
    Ok(store.tasks)
}

pub fn save_store(path: &Path, tasks: &[Task]) -> Result<(), StoreError> {
    let store = StoreFile {
        version: STORE_VERSION,
        tasks: tasks.to_vec(),
    };
    let mut json = serde_json::to_string_pretty(&store)?;
    json.push('\n');
    atomic_write(path, json.as_bytes()).map_err(|e| StoreError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), count = tasks.len(), "store saved");
    Ok(())
}
