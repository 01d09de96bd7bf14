use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label for directories
pub const LABEL_DIR: &str = "Dir";

/// Label for symbolic links
pub const LABEL_LINK: &str = "Link";

/// Label for entries that could not be inspected
pub const LABEL_NONE: &str = "None";

/// Minimum number of leading bytes the sniffer needs
pub const DEFAULT_MIN_INSPECT: u64 = 30;

/// Content classification of an entry: one of the sentinels above or a
/// content-type string such as `text/plain`
pub type Label = String;

/// Absolute, normalized path of an indexed root
pub type RootPath = String;

/// A single (path, size) pair as reported by the oracle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,
    pub size: u64,
}

impl IndexEntry {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// Whether a label marks something other than a sniffed regular file
pub fn is_sentinel(label: &str) -> bool {
    matches!(label, LABEL_DIR | LABEL_LINK | LABEL_NONE)
}

/// Classification of one indexed root, grouped by label.
///
/// Entries inside a label keep the order in which they were produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RootRecord {
    labels: BTreeMap<Label, Vec<IndexEntry>>,
}

impl RootRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry under a label
    pub fn push(&mut self, label: impl Into<Label>, entry: IndexEntry) {
        self.labels.entry(label.into()).or_default().push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of distinct labels
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Total number of entries across all labels
    pub fn entry_count(&self) -> usize {
        self.labels.values().map(Vec::len).sum()
    }

    pub fn get(&self, label: &str) -> Option<&[IndexEntry]> {
        self.labels.get(label).map(Vec::as_slice)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[IndexEntry])> {
        self.labels
            .iter()
            .map(|(label, entries)| (label.as_str(), entries.as_slice()))
    }

    /// Keep only entries whose path starts with `prefix`, dropping labels
    /// that end up empty
    pub fn filter_prefix(&self, prefix: &str) -> RootRecord {
        let labels = self
            .labels
            .iter()
            .filter_map(|(label, entries)| {
                let kept: Vec<IndexEntry> = entries
                    .iter()
                    .filter(|e| e.path.starts_with(prefix))
                    .cloned()
                    .collect();
                (!kept.is_empty()).then(|| (label.clone(), kept))
            })
            .collect();
        RootRecord { labels }
    }

    /// Per-label summary, largest total size first
    pub fn summary(&self) -> Vec<LabelSummary> {
        let mut rows: Vec<LabelSummary> = self
            .labels
            .iter()
            .map(|(label, entries)| LabelSummary {
                label: label.clone(),
                count: entries.len(),
                total_size: entries.iter().map(|e| e.size).sum(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.total_size
                .cmp(&a.total_size)
                .then_with(|| b.count.cmp(&a.count))
                .then_with(|| a.label.cmp(&b.label))
        });
        rows
    }
}

impl FromIterator<(Label, IndexEntry)> for RootRecord {
    fn from_iter<I: IntoIterator<Item = (Label, IndexEntry)>>(iter: I) -> Self {
        let mut record = RootRecord::new();
        for (label, entry) in iter {
            record.push(label, entry);
        }
        record
    }
}

/// Aggregate of one label inside a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSummary {
    pub label: Label,
    pub count: usize,
    pub total_size: u64,
}

/// The whole persisted index: root path to its record.
///
/// Nested or overlapping roots may coexist; re-indexing a root replaces its
/// record wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    roots: BTreeMap<RootPath, RootRecord>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn get(&self, root: &str) -> Option<&RootRecord> {
        self.roots.get(root)
    }

    /// Replace (or create) the record for `root`
    pub fn insert(&mut self, root: impl Into<RootPath>, record: RootRecord) -> Option<RootRecord> {
        self.roots.insert(root.into(), record)
    }

    pub fn remove(&mut self, root: &str) -> Option<RootRecord> {
        self.roots.remove(root)
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RootRecord)> {
        self.roots.iter().map(|(root, record)| (root.as_str(), record))
    }
}

/// Tuning knobs for one index run
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Partition threshold and sniff window size in bytes
    pub min_inspect: u64,
    /// Classifier pool size, 0 means available parallelism
    pub jobs: usize,
    /// Draw progress bars on stderr
    pub progress: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            min_inspect: DEFAULT_MIN_INSPECT,
            jobs: 0,
            progress: false,
        }
    }
}
