use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

const MAX_FILE_NAME_BYTES: usize = 255;
/// Prefix given to every annotated copy.
pub const OUTPUT_PREFIX: &str = "processed_";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to scan '{path}': {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid file name '{0}'")]
    InvalidFileName(String),
}

/// A single path component that cannot climb out of the directory it is
/// joined onto.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_FILE_NAME_BYTES
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

pub fn output_name_for(source_name: &str) -> String {
    format!("{}{}", OUTPUT_PREFIX, source_name)
}

/// Flat upload directory plus an output root split into `00`..`23` hour
/// buckets. Nothing here is ever deleted.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn ensure_layout(&self) -> Result<(), StorageError> {
        ensure_dir(&self.upload_dir)?;
        ensure_dir(&self.output_dir)
    }

    /// Creates (if needed) and returns `outputs/<HH>`.
    pub fn hour_bucket(&self, hour: u8) -> Result<PathBuf, StorageError> {
        let path = self.output_dir.join(bucket_name(hour));
        ensure_dir(&path)?;
        Ok(path)
    }

    /// Writes the raw upload under its client-supplied name. An existing file
    /// with the same name is replaced.
    pub fn save_upload(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        if !is_safe_file_name(file_name) {
            return Err(StorageError::InvalidFileName(file_name.to_string()));
        }
        ensure_dir(&self.upload_dir)?;
        let path = self.upload_dir.join(file_name);
        std::fs::write(&path, content).map_err(|source| StorageError::WriteFile {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Looks for an output first at the root, then in every hour bucket.
    /// When several buckets hold the name, the newest file wins.
    pub fn find_output(&self, file_name: &str) -> Result<Option<PathBuf>, StorageError> {
        if !is_safe_file_name(file_name) {
            return Ok(None);
        }

        let at_root = self.output_dir.join(file_name);
        if at_root.is_file() {
            return Ok(Some(at_root));
        }

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for hour in 0..24u8 {
            let candidate = self.output_dir.join(bucket_name(hour)).join(file_name);
            let metadata = match std::fs::metadata(&candidate) {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(StorageError::Scan {
                        path: candidate,
                        source,
                    })
                }
            };
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            match &newest {
                Some((seen, _)) if *seen >= modified => {}
                _ => newest = Some((modified, candidate)),
            }
        }

        Ok(newest.map(|(_, path)| path))
    }
}

fn bucket_name(hour: u8) -> String {
    format!("{:02}", hour)
}

fn ensure_dir(path: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(path).map_err(|source| StorageError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_names() {
        for name in ["", ".", "..", "../secret", "a/b", "a\\b", "nul\0byte"] {
            assert!(!is_safe_file_name(name), "accepted {name:?}");
        }
        assert!(!is_safe_file_name(&"x".repeat(256)));
    }

    #[test]
    fn accepts_plain_names() {
        for name in ["photo.jpg", "IMG 0001.PNG", "..hidden", "a..b.png"] {
            assert!(is_safe_file_name(name), "rejected {name:?}");
        }
    }

    #[test]
    fn output_names_are_prefixed() {
        assert_eq!(output_name_for("cat.png"), "processed_cat.png");
    }
}
