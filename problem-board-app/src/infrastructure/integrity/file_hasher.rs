use super::IntegrityError;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Absolute file path to lowercase hex SHA-256, in path order.
pub type FileHashes = BTreeMap<PathBuf, String>;

const READ_BUFFER: usize = 8192;

pub struct FileHasher;

impl FileHasher {
    /// SHA-256 over the whole file, streamed.
    pub fn hash_file(path: &Path) -> Result<String, IntegrityError> {
        let read_err = |source| IntegrityError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(read_err)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; READ_BUFFER];
        loop {
            let n = file.read(&mut buffer).map_err(read_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Hashes every regular file under `root` except `skip`, which lets the
    /// baseline file live inside the tree it describes. A missing root is an
    /// empty tree.
    pub fn hash_tree(root: &Path, skip: Option<&Path>) -> Result<FileHashes, IntegrityError> {
        let mut hashes = FileHashes::new();
        if !root.exists() {
            tracing::warn!(root = %root.display(), "Integrity root does not exist");
            return Ok(hashes);
        }

        let root = Self::absolute(root)?;
        let skip = match skip {
            Some(path) => Some(Self::absolute(path)?),
            None => None,
        };
        for entry in WalkDir::new(&root) {
            let entry = entry.map_err(|source| IntegrityError::Walk {
                path: root.clone(),
                source,
            })?;
            if !entry.file_type().is_file() || skip.as_deref() == Some(entry.path()) {
                continue;
            }
            let hash = Self::hash_file(entry.path())?;
            hashes.insert(entry.into_path(), hash);
        }
        Ok(hashes)
    }

    fn absolute(path: &Path) -> Result<PathBuf, IntegrityError> {
        std::path::absolute(path).map_err(|source| IntegrityError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}
