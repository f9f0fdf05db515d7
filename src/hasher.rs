use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Content identity of a file at capture time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDigest {
    /// Lowercase hex SHA-256, empty when the file could not be read.
    pub digest: String,
    pub size: u64,
}

impl FileDigest {
    pub fn is_empty(&self) -> bool {
        self.digest.is_empty()
    }
}

/// Streams the file through SHA-256.
///
/// Never fails: a missing, unreadable or non-regular path yields an empty
/// digest and size `0`.
pub fn hash_file(path: &Path) -> FileDigest {
    match try_hash(path) {
        Ok(digest) => digest,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "file not hashable, continuing without identity");
            FileDigest::default()
        }
    }
}

fn try_hash(path: &Path) -> io::Result<FileDigest> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
    }

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let size = io::copy(&mut reader, &mut hasher)?;

    Ok(FileDigest {
        digest: hex::encode(hasher.finalize()),
        size,
    })
}

/// Hashes on the blocking pool, giving up after `limit`.
///
/// A hash that outlives the limit is abandoned (the read finishes in the
/// background) and the event proceeds with an empty digest.
pub async fn hash_file_bounded(path: PathBuf, limit: Duration) -> FileDigest {
    let path_str = path.display().to_string();
    let task = tokio::task::spawn_blocking(move || hash_file(&path));

    match tokio::time::timeout(limit, task).await {
        Ok(Ok(digest)) => digest,
        Ok(Err(e)) => {
            warn!(path = %path_str, error = %e, "hash task failed");
            FileDigest::default()
        }
        Err(_) => {
            warn!(path = %path_str, timeout_ms = limit.as_millis() as u64, "hashing timed out");
            FileDigest::default()
        }
    }
}
