// storage.rs - RON file helpers shared by the save file, the config and the timeline.
//
// Loaders return a Result so each caller picks its own fallback. The
// callers all log and fall back to defaults rather than crashing.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not determine a data directory")]
    NoDataDir,
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize: {0}")]
    Serialize(#[from] ron::Error),
}

/// Reads and parses a RON file. A missing file is `Ok(None)`, not an error.
pub fn read_ron<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    ron::from_str(&contents)
        .map(Some)
        .map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes `value` as pretty RON, creating parent directories as needed.
pub fn write_ron<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let serialized = ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())?;
    std::fs::write(path, serialized).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("snowfall-storage-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let loaded: Option<u32> = read_ron(&scratch_path("does-not-exist.ron")).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let path = scratch_path("garbage.ron");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "(((not ron").unwrap();

        let result: Result<Option<u32>, _> = read_ron(&path);
        assert!(matches!(result, Err(StorageError::Parse { .. })));
    }

    #[test]
    fn write_creates_missing_directories() {
        let path = scratch_path("nested/dir/value.ron");
        write_ron(&path, &vec![1u32, 2, 3]).unwrap();

        let loaded: Option<Vec<u32>> = read_ron(&path).unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));
    }
}
