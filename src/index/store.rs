//! Persistence of the whole index as one compressed blob.
//!
//! Format: a zstd stream wrapping a postcard encoded [`StoreSnapshot`].
//! Writes go to a temporary file next to the target and are renamed into
//! place, so readers only ever see a complete snapshot. There is no locking:
//! two concurrent writers race and the last rename wins.

use crate::error::{Error, Result};
use crate::index::types::Index;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tracing::debug;

/// Snapshot format version - increment when changing the layout
pub const STORE_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

/// Everything persisted in the backing blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    /// Unix seconds at save time
    pub saved_at: u64,
    pub index: Index,
}

#[derive(Serialize)]
struct StoreSnapshotRef<'a> {
    version: u32,
    saved_at: u64,
    index: &'a Index,
}

/// File system facts about the backing blob
#[derive(Debug, Clone)]
pub struct StoreMetadata {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// Handle on the backing blob
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the index, or an empty one when nothing has been saved yet.
    ///
    /// A blob that exists but does not decode is an error: returning an
    /// empty index would silently drop every indexed root on the next save.
    pub fn load(&self) -> Result<Index> {
        Ok(self
            .load_snapshot()?
            .map(|snapshot| snapshot.index)
            .unwrap_or_default())
    }

    /// Load the full snapshot, `None` when the blob is absent
    pub fn load_snapshot(&self) -> Result<Option<StoreSnapshot>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("index store {} does not exist yet", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let start = Instant::now();
        let snapshot = self.decode(file)?;
        debug!(
            "read {} ({} roots) in {:?}",
            self.path.display(),
            snapshot.index.len(),
            start.elapsed()
        );

        Ok(Some(snapshot))
    }

    fn decode(&self, file: File) -> Result<StoreSnapshot> {
        let corrupt = |message: String| Error::StoreCorrupt {
            path: self.path.clone(),
            message,
        };

        let mut bytes = Vec::new();
        zstd::Decoder::new(file)
            .and_then(|mut decoder| decoder.read_to_end(&mut bytes))
            .map_err(|e| corrupt(format!("decompression failed: {e}")))?;

        let snapshot: StoreSnapshot =
            postcard::from_bytes(&bytes).map_err(|e| corrupt(format!("decoding failed: {e}")))?;

        if snapshot.version != STORE_VERSION {
            return Err(corrupt(format!(
                "unsupported version {} (expected {})",
                snapshot.version, STORE_VERSION
            )));
        }

        Ok(snapshot)
    }

    /// Replace the blob with a snapshot of `index`.
    pub fn save(&self, index: &Index) -> Result<()> {
        let start = Instant::now();
        debug!("writing index store {}", self.path.display());

        self.write_atomic(index).map_err(|e| Error::StoreWriteFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        debug!(
            "wrote {} ({} roots) in {:?}",
            self.path.display(),
            index.len(),
            start.elapsed()
        );
        Ok(())
    }

    fn write_atomic(&self, index: &Index) -> std::io::Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let snapshot = StoreSnapshotRef {
            version: STORE_VERSION,
            saved_at: unix_now_secs(),
            index,
        };
        let bytes = postcard::to_stdvec(&snapshot)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;

        // Removed on drop unless persisted below
        let tmp = NamedTempFile::new_in(&parent)?;
        {
            let mut encoder = zstd::Encoder::new(BufWriter::new(tmp.as_file()), ZSTD_LEVEL)?;
            encoder.write_all(&bytes)?;
            encoder.finish()?.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Modification time and size of the blob, `None` when absent
    pub fn metadata(&self) -> Result<Option<StoreMetadata>> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(StoreMetadata {
                path: self.path.clone(),
                modified: meta.modified()?,
                size: meta.len(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
