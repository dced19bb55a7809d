//! Temp-file staging for inbound images.
//!
//! Every request stages its images as uniquely named files under a shared
//! directory, hands the paths to the decoding stages, and removes them when
//! the run ends. [`StagedFile`] owns that removal: dropping the guard deletes
//! the file, so staged images cannot outlive their request on any exit path,
//! including early `?` returns and cancelled futures.
//!
//! Filenames combine a nanosecond timestamp with a process-wide sequence
//! counter (`image_<nanos>_<seq>.<ext>`). The timestamp alone cannot be
//! trusted to be unique under concurrency; the counter closes that gap
//! without any locking on the shared directory.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::config::StagingConfig;
use crate::encoded::ImageExt;
use crate::error::StageError;

/// Process-wide sequence number folded into staged filenames.
static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Writes inbound image bytes into the staging directory.
///
/// The store itself is stateless apart from the configured directory; clones
/// share nothing and every instance draws filenames from the same
/// process-wide sequence.
///
/// # Examples
///
/// ```rust,no_run
/// use ingest::{ImageExt, StagingConfig, StagingStore};
///
/// let store = StagingStore::new(&StagingConfig::default());
/// let staged = store.stage(b"raw image bytes", ImageExt::Png)?;
/// println!("staged at {}", staged.path().display());
/// // File is removed here when `staged` drops.
/// # Ok::<(), ingest::StageError>(())
/// ```
#[derive(Debug, Clone)]
pub struct StagingStore {
    dir: PathBuf,
}

impl StagingStore {
    /// Creates a store writing into the configured directory.
    pub fn new(config: &StagingConfig) -> Self {
        Self {
            dir: config.dir.clone(),
        }
    }

    /// Returns the staging directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stages `bytes` as a uniquely named file and returns its guard.
    ///
    /// The staging directory is created on demand. The write completes and
    /// the file is closed before this returns, so the path is immediately
    /// readable by other processes (the normalizer in particular).
    ///
    /// # Errors
    ///
    /// - [`StageError::CreateDir`] - staging directory could not be created
    /// - [`StageError::Write`] - file could not be written
    pub fn stage(&self, bytes: &[u8], extension: ImageExt) -> Result<StagedFile, StageError> {
        fs::create_dir_all(&self.dir).map_err(|err| StageError::CreateDir {
            path: self.dir.display().to_string(),
            detail: err.to_string(),
        })?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let seq = STAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!("image_{nanos}_{seq}.{extension}"));

        fs::write(&path, bytes).map_err(|err| StageError::Write {
            path: path.display().to_string(),
            detail: err.to_string(),
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "image_staged");
        Ok(StagedFile { path })
    }
}

/// A staged file owned exclusively by one pipeline run.
///
/// Dropping the guard removes the file. A missing file is not an error (the
/// normalizer may have replaced it, tests may have cleaned up); any other
/// removal failure is logged at WARN and never surfaced.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// The on-disk path of the staged image.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the staged file now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "staged_file_released"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "staged_file_release_failed");
            }
        }
    }
}
