use chrono::Utc;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QuarantineError {
    #[error("file vanished before it could be quarantined: {0}")]
    Vanished(PathBuf),

    #[error("path has no file name: {0}")]
    InvalidPath(PathBuf),

    #[error("failed to move {path} into quarantine: {source}")]
    Move {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("quarantine task failed: {0}")]
    Task(String),
}

impl QuarantineError {
    /// Failures that a retry cannot fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            QuarantineError::Vanished(_) | QuarantineError::InvalidPath(_)
        )
    }
}

/// Moves suspicious files into an isolated directory.
#[derive(Debug, Clone)]
pub struct Quarantine {
    dir: PathBuf,
    retry_delay: Duration,
}

impl Quarantine {
    pub fn new(dir: impl Into<PathBuf>, retry_delay: Duration) -> Self {
        Quarantine {
            dir: dir.into(),
            retry_delay,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Moves `path` into the quarantine directory and returns its new location.
    ///
    /// The file keeps its name behind a UTC timestamp prefix. Transient
    /// failures are retried once after the configured delay; a file that no
    /// longer exists is reported immediately.
    pub async fn isolate(&self, path: &Path) -> Result<PathBuf, QuarantineError> {
        match self.attempt(path).await {
            Err(e) if !e.is_permanent() => {
                warn!(path = %path.display(), error = %e, "quarantine failed, retrying once");
                tokio::time::sleep(self.retry_delay).await;
                self.attempt(path).await
            }
            result => result,
        }
    }

    async fn attempt(&self, path: &Path) -> Result<PathBuf, QuarantineError> {
        let src = path.to_path_buf();
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || move_into(&src, &dir))
            .await
            .map_err(|e| QuarantineError::Task(e.to_string()))?
    }
}

fn move_into(src: &Path, dir: &Path) -> Result<PathBuf, QuarantineError> {
    let file_name = src
        .file_name()
        .ok_or_else(|| QuarantineError::InvalidPath(src.to_path_buf()))?;

    let move_err = |source: io::Error| {
        if source.kind() == ErrorKind::NotFound {
            QuarantineError::Vanished(src.to_path_buf())
        } else {
            QuarantineError::Move {
                path: src.to_path_buf(),
                source,
            }
        }
    };

    fs::symlink_metadata(src).map_err(move_err)?;
    fs::create_dir_all(dir).map_err(move_err)?;

    let stamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ").to_string();
    let dest = destination(dir, &stamp, file_name);

    if let Err(e) = fs::rename(src, &dest) {
        if e.kind() == ErrorKind::NotFound {
            return Err(QuarantineError::Vanished(src.to_path_buf()));
        }
        debug!(path = %src.display(), error = %e, "rename failed, copying instead");
        copy_then_remove(src, dir, &dest).map_err(move_err)?;
    }

    lock_down(&dest);
    Ok(dest)
}

fn destination(dir: &Path, stamp: &str, file_name: &OsStr) -> PathBuf {
    let name = file_name.to_string_lossy();

    let candidate = dir.join(format!("{stamp}_{name}"));
    if !candidate.exists() {
        return candidate;
    }

    let suffix = Uuid::new_v4().simple().to_string();
    dir.join(format!("{stamp}_{}_{name}", &suffix[..8]))
}

// Cross-device moves: write into the quarantine dir atomically, then drop the original.
fn copy_then_remove(src: &Path, dir: &Path, dest: &Path) -> io::Result<()> {
    let mut input = File::open(src)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    io::copy(&mut input, tmp.as_file_mut())?;
    tmp.persist_noclobber(dest).map_err(|e| e.error)?;

    if let Err(e) = fs::remove_file(src) {
        // The original is still reachable, so the copy does not count as isolation.
        let _ = fs::remove_file(dest);
        return Err(e);
    }
    Ok(())
}

fn lock_down(path: &Path) {
    let result = fs::metadata(path).and_then(|meta| {
        let mut perms = meta.permissions();
        perms.set_readonly(true);
        fs::set_permissions(path, perms)
    });

    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "could not make quarantined file read-only");
    }
}
