use crate::error::Result;
use crate::index::classify::{Classification, classify_all};
use crate::index::oracle::{Oracle, parse_report};
use crate::index::partition::partition;
use crate::index::sniff::ContentSniffer;
use crate::index::store::Store;
use crate::index::types::{IndexEntry, IndexOptions, LABEL_NONE, RootRecord, is_sentinel};
use crate::utils::paths::normalize;
use crate::utils::progress;
use tracing::{debug, info, warn};

/// Outcome of indexing one root
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Normalized root the record is keyed by
    pub root: String,
    /// New record; empty when the oracle had nothing classifiable
    pub record: RootRecord,
    /// Entries large enough to sniff
    pub wanted: usize,
    /// Entries below the sniff threshold, not recorded
    pub unwanted: usize,
    /// Entries that could not be inspected and were labeled `None`
    pub unreadable: usize,
    /// Whether a previous record for this root existed
    pub replaced: bool,
    /// Whether the store was written
    pub persisted: bool,
}

/// Builds root records and merges them into the persisted index.
///
/// Each call to [`IndexBuilder::index`] is a full load, replace, save cycle.
/// Concurrent builders on the same store race; the last save wins.
pub struct IndexBuilder<'a> {
    store: &'a Store,
    oracle: &'a dyn Oracle,
    sniffer: &'a dyn ContentSniffer,
    options: IndexOptions,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(
        store: &'a Store,
        oracle: &'a dyn Oracle,
        sniffer: &'a dyn ContentSniffer,
        options: IndexOptions,
    ) -> Self {
        Self {
            store,
            oracle,
            sniffer,
            options,
        }
    }

    /// Index `root`, replacing any record previously stored for it.
    ///
    /// When nothing classifiable is found the store is left untouched and
    /// the returned report has an empty record.
    pub fn index(&self, root: &str) -> Result<BuildReport> {
        let root = normalize(root)?;
        let mut index = self.store.load()?;

        let replaced = index.remove(&root).is_some();
        if replaced {
            debug!("re-indexing {}", root);
        }

        let listing = {
            let spinner = self
                .options
                .progress
                .then(|| progress::spinner(format!("Querying oracle for {root}...")));
            let listing = self.oracle.list(&root);
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            listing?
        };

        let split = partition(parse_report(&listing), &root, self.options.min_inspect);
        debug!(
            "{}: {} entries to sniff, {} below {} bytes",
            root,
            split.wanted.len(),
            split.unwanted.len(),
            self.options.min_inspect
        );

        let bar = self
            .options
            .progress
            .then(|| progress::bar(split.wanted.len() as u64, "Classifying..."));
        let classes = classify_all(
            &split.wanted,
            self.sniffer,
            self.options.min_inspect,
            self.options.jobs,
            bar.as_ref(),
        )?;
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        let wanted = split.wanted.len();
        let unwanted = split.unwanted.len();
        let unreadable = classes.iter().filter(|c| c.label == LABEL_NONE).count();
        if unreadable > 0 {
            warn!("{}: {} entries could not be inspected", root, unreadable);
        }

        let record = assemble_record(split.wanted, classes);
        let mut report = BuildReport {
            root: root.clone(),
            record,
            wanted,
            unwanted,
            unreadable,
            replaced,
            persisted: false,
        };

        if report.record.is_empty() {
            info!("{}: nothing to index", root);
            return Ok(report);
        }

        index.insert(root.clone(), report.record.clone());
        self.store.save(&index)?;
        report.persisted = true;

        info!(
            "{}: indexed {} entries under {} labels",
            root,
            report.record.entry_count(),
            report.record.label_count()
        );
        Ok(report)
    }
}

/// Group classified entries by label, keeping production order.
///
/// Sizes of directories, links and uninspectable entries are zeroed: only
/// regular file sizes mean anything to consumers of the index.
pub fn assemble_record(entries: Vec<IndexEntry>, classes: Vec<Classification>) -> RootRecord {
    entries
        .into_iter()
        .zip(classes)
        .map(|(mut entry, class)| {
            if is_sentinel(&class.label) {
                entry.size = 0;
            }
            (class.label, entry)
        })
        .collect()
}

/// Drop the record stored for exactly `root`. Returns whether one existed.
pub fn remove_root(store: &Store, root: &str) -> Result<bool> {
    let root = normalize(root)?;
    let mut index = store.load()?;
    if index.remove(&root).is_none() {
        return Ok(false);
    }
    store.save(&index)?;
    info!("removed {}", root);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::{LABEL_DIR, LABEL_LINK};

    fn class(label: &str) -> Classification {
        Classification {
            label: label.to_string(),
            window: Vec::new(),
        }
    }

    #[test]
    fn test_assemble_zeroes_sentinel_sizes() {
        let entries = vec![
            IndexEntry::new("/r/dir", 4096),
            IndexEntry::new("/r/link", 40),
            IndexEntry::new("/r/gone", 77),
            IndexEntry::new("/r/file.txt", 1234),
        ];
        let classes = vec![
            class(LABEL_DIR),
            class(LABEL_LINK),
            class(LABEL_NONE),
            class("text/plain"),
        ];

        let record = assemble_record(entries, classes);

        assert_eq!(record.get(LABEL_DIR).unwrap()[0].size, 0);
        assert_eq!(record.get(LABEL_LINK).unwrap()[0].size, 0);
        assert_eq!(record.get(LABEL_NONE).unwrap()[0].size, 0);
        assert_eq!(record.get("text/plain").unwrap()[0].size, 1234);
    }

    #[test]
    fn test_assemble_groups_in_order() {
        let entries = vec![
            IndexEntry::new("/r/b", 100),
            IndexEntry::new("/r/x", 100),
            IndexEntry::new("/r/a", 100),
        ];
        let classes = vec![class("text/plain"), class("image/png"), class("text/plain")];

        let record = assemble_record(entries, classes);
        let texts: Vec<&str> = record
            .get("text/plain")
            .unwrap()
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(texts, vec!["/r/b", "/r/a"]);
    }

    #[test]
    fn test_remove_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("index.bin.zst"));

        let mut index = crate::index::types::Index::new();
        let mut record = RootRecord::new();
        record.push("text/plain", IndexEntry::new("/data/a", 40));
        index.insert("/data", record);
        store.save(&index).unwrap();

        assert!(remove_root(&store, "/data").unwrap());
        assert!(!remove_root(&store, "/data").unwrap());
        assert!(store.load().unwrap().is_empty());
    }
}
