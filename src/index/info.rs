use crate::error::Result;
use crate::index::store::{Store, StoreMetadata};
use serde::Serialize;
use std::path::PathBuf;

/// Read-only description of the backing store
#[derive(Debug, Clone)]
pub struct StoreReport {
    pub path: PathBuf,
    /// `None` when the store has never been written
    pub metadata: Option<StoreMetadata>,
    pub saved_at: Option<u64>,
    pub roots: Vec<RootSummary>,
}

/// Size of one indexed root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootSummary {
    pub root: String,
    pub entries: usize,
    pub labels: usize,
    /// Sum of regular file sizes
    pub total_size: u64,
}

/// Collect store metadata and the list of indexed roots
pub fn store_report(store: &Store) -> Result<StoreReport> {
    let metadata = store.metadata()?;
    let snapshot = store.load_snapshot()?;

    let (saved_at, roots) = match snapshot {
        Some(snapshot) => {
            let roots = snapshot
                .index
                .iter()
                .map(|(root, record)| RootSummary {
                    root: root.to_string(),
                    entries: record.entry_count(),
                    labels: record.label_count(),
                    total_size: record.iter().flat_map(|(_, e)| e).map(|e| e.size).sum(),
                })
                .collect();
            (Some(snapshot.saved_at), roots)
        }
        None => (None, Vec::new()),
    };

    Ok(StoreReport {
        path: store.path().to_path_buf(),
        metadata,
        saved_at,
        roots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::{Index, IndexEntry, RootRecord};

    #[test]
    fn test_report_on_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let report = store_report(&Store::new(dir.path().join("none.bin.zst"))).unwrap();

        assert!(report.metadata.is_none());
        assert!(report.saved_at.is_none());
        assert!(report.roots.is_empty());
    }

    #[test]
    fn test_report_lists_roots() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("index.bin.zst"));

        let mut record = RootRecord::new();
        record.push("text/plain", IndexEntry::new("/a/x", 100));
        record.push("image/png", IndexEntry::new("/a/y", 50));
        record.push("Dir", IndexEntry::new("/a/z", 0));
        let mut index = Index::new();
        index.insert("/a", record);
        index.insert("/b", RootRecord::new());
        store.save(&index).unwrap();

        let report = store_report(&store).unwrap();
        assert!(report.metadata.is_some());
        assert!(report.saved_at.is_some());
        assert_eq!(report.roots.len(), 2);
        assert_eq!(
            report.roots[0],
            RootSummary {
                root: "/a".into(),
                entries: 3,
                labels: 3,
                total_size: 150
            }
        );
    }
}
