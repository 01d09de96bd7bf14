use crate::index::types::IndexEntry;

/// Oracle entries split by whether they are large enough to sniff
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Entries of at least `threshold` bytes, with absolute paths
    pub wanted: Vec<IndexEntry>,
    /// Entries below the threshold, paths left relative to the root
    pub unwanted: Vec<IndexEntry>,
}

/// Split entries on `threshold`: a size equal to the threshold is wanted.
///
/// Wanted paths are rewritten to `root/relative`. The sniffer reads exactly
/// `threshold` leading bytes, so smaller entries are never opened.
pub fn partition(entries: Vec<IndexEntry>, root: &str, threshold: u64) -> Partition {
    let mut out = Partition::default();

    for entry in entries {
        if entry.size < threshold {
            out.unwanted.push(entry);
        } else {
            let path = join_root(root, &entry.path);
            out.wanted.push(IndexEntry::new(path, entry.size));
        }
    }

    out
}

fn join_root(root: &str, relative: &str) -> String {
    let sep = std::path::MAIN_SEPARATOR;
    if root.ends_with(sep) {
        format!("{root}{relative}")
    } else {
        format!("{root}{sep}{relative}")
    }
}
