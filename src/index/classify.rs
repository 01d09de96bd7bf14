//! Parallel classification of wanted entries.
//!
//! Every entry becomes one task on a bounded rayon pool. The call returns
//! only after all tasks have finished, with results in input order.

use crate::error::Result;
use crate::index::sniff::ContentSniffer;
use crate::index::types::{IndexEntry, LABEL_DIR, LABEL_LINK, LABEL_NONE, Label};
use crate::utils::progress::ProgressBar;
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::debug;

/// Outcome of classifying one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: Label,
    /// Leading bytes handed to the sniffer, empty for sentinel labels
    pub window: Vec<u8>,
}

impl Classification {
    fn sentinel(label: &str) -> Self {
        Self {
            label: label.to_string(),
            window: Vec::new(),
        }
    }
}

/// Resolve a pool size of 0 to the available parallelism
pub fn effective_jobs(jobs: usize) -> usize {
    if jobs == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    } else {
        jobs
    }
}

/// Classify every entry on a pool of `jobs` workers.
///
/// The i-th result belongs to the i-th entry. Failures on individual
/// entries are absorbed as the `None` label.
pub fn classify_all(
    entries: &[IndexEntry],
    sniffer: &dyn ContentSniffer,
    window_len: u64,
    jobs: usize,
    progress: Option<&ProgressBar>,
) -> Result<Vec<Classification>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(effective_jobs(jobs))
        .thread_name(|i| format!("dutype-classify-{i}"))
        .build()?;

    let window_len = usize::try_from(window_len).unwrap_or(usize::MAX);

    let results: Vec<Classification> = pool.install(|| {
        entries
            .par_iter()
            .map(|entry| {
                let result = classify_entry(Path::new(&entry.path), sniffer, window_len);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                result
            })
            .collect()
    });

    Ok(results)
}

/// Classify a single path without following symlinks.
pub fn classify_entry(path: &Path, sniffer: &dyn ContentSniffer, window_len: usize) -> Classification {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            debug!("cannot stat {}: {}", path.display(), e);
            return Classification::sentinel(LABEL_NONE);
        }
    };

    let file_type = meta.file_type();
    if file_type.is_symlink() {
        return Classification::sentinel(LABEL_LINK);
    }
    if file_type.is_dir() {
        return Classification::sentinel(LABEL_DIR);
    }
    // Opening a fifo or device for reading can block or have side effects
    if !file_type.is_file() {
        debug!("not a regular file: {}", path.display());
        return Classification::sentinel(LABEL_NONE);
    }

    match read_window(path, window_len) {
        Ok(window) => Classification {
            label: sniffer.sniff(&window),
            window,
        },
        Err(e) => {
            debug!("cannot read {}: {}", path.display(), e);
            Classification::sentinel(LABEL_NONE)
        }
    }
}

/// Map the file and copy out at most `window_len` leading bytes
fn read_window(path: &Path, window_len: usize) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 || window_len == 0 {
        return Ok(Vec::new());
    }

    // SAFETY: read-only mapping, copied out before the map is dropped
    let map = unsafe { Mmap::map(&file)? };
    let end = map.len().min(window_len);
    Ok(map[..end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sniff::BuiltinSniffer;

    struct FixedSniffer;

    impl ContentSniffer for FixedSniffer {
        fn sniff(&self, window: &[u8]) -> String {
            format!("fixed/{}", window.len())
        }
    }

    #[test]
    fn test_regular_file_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "x".repeat(100)).unwrap();

        let result = classify_entry(&path, &FixedSniffer, 30);
        assert_eq!(result.label, "fixed/30");
        assert_eq!(result.window.len(), 30);
    }

    #[test]
    fn test_directory_and_missing() {
        let dir = tempfile::tempdir().unwrap();

        let result = classify_entry(dir.path(), &FixedSniffer, 30);
        assert_eq!(result.label, LABEL_DIR);
        assert!(result.window.is_empty());

        let missing = classify_entry(&dir.path().join("gone"), &FixedSniffer, 30);
        assert_eq!(missing.label, LABEL_NONE);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_none() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.bin");
        fs::write(&path, "z".repeat(64)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits
        if File::open(&path).is_ok() {
            return;
        }

        let result = classify_entry(&path, &FixedSniffer, 30);
        assert_eq!(result.label, LABEL_NONE);
        assert!(result.window.is_empty());

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.txt");
        fs::write(&target, "y".repeat(64)).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let result = classify_entry(&link, &FixedSniffer, 30);
        assert_eq!(result.label, LABEL_LINK);
    }

    #[test]
    fn test_classify_all_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut entries = Vec::new();
        for i in 0..50 {
            let path = dir.path().join(format!("f{i}"));
            if i % 2 == 0 {
                fs::write(&path, "plain text content that is long enough to sniff").unwrap();
            } else {
                fs::create_dir(&path).unwrap();
            }
            entries.push(IndexEntry::new(path.to_string_lossy(), 4096));
        }

        let results = classify_all(&entries, &BuiltinSniffer::new(), 30, 4, None).unwrap();

        assert_eq!(results.len(), entries.len());
        for (i, result) in results.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(result.label, "text/plain");
            } else {
                assert_eq!(result.label, LABEL_DIR);
            }
        }
    }

    #[test]
    fn test_effective_jobs() {
        assert!(effective_jobs(0) >= 1);
        assert_eq!(effective_jobs(3), 3);
    }
}
