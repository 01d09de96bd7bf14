use crate::error::{Error, Result};
use crate::index::types::{Index, RootRecord};
use crate::utils::paths::{normalize, separator_count, strip_last_segment};

/// Answer to a query: the covering root and the entries under the query path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Normalized query path
    pub query: String,
    /// Indexed root that covers the query
    pub root: String,
    /// Number of segments stripped before a root matched, 0 for an exact hit
    pub backoff_steps: usize,
    /// Entries whose path starts with the query, grouped by label
    pub view: RootRecord,
}

impl Resolved {
    pub fn is_exact(&self) -> bool {
        self.backoff_steps == 0
    }
}

/// Normalize `query_path` and resolve it against `index`
pub fn resolve(index: &Index, query_path: &str) -> Result<Resolved> {
    let query = normalize(query_path)?;
    resolve_normalized(index, &query)
}

/// Resolve an already normalized path.
///
/// An exact root returns its record unchanged. Otherwise trailing segments
/// are stripped one at a time until a root matches and that root's entries
/// are filtered by string prefix on the query path. Candidates are ordered
/// longest first, then lexically; that order is an implementation choice
/// and only decides which root is consulted first.
pub fn resolve_normalized(index: &Index, query: &str) -> Result<Resolved> {
    let candidates = candidate_roots(index, query);

    if let Some(record) = candidates.iter().find(|&&root| root == query).and_then(|root| index.get(root)) {
        return Ok(Resolved {
            query: query.to_string(),
            root: query.to_string(),
            backoff_steps: 0,
            view: record.clone(),
        });
    }

    let mut working = query;
    for step in 1..=separator_count(query) {
        let Some(parent) = strip_last_segment(working) else {
            break;
        };
        working = parent;

        if let Some(root) = candidates.iter().find(|&&root| root == working) {
            let record = index
                .get(root)
                .ok_or_else(|| Error::PathNotIndexed(query.to_string()))?;
            return Ok(Resolved {
                query: query.to_string(),
                root: root.to_string(),
                backoff_steps: step,
                view: record.filter_prefix(query),
            });
        }
    }

    Err(Error::PathNotIndexed(query.to_string()))
}

/// Roots no longer than the query, longest first then lexical
fn candidate_roots<'a>(index: &'a Index, query: &str) -> Vec<&'a str> {
    let mut roots: Vec<&str> = index.roots().filter(|r| r.len() <= query.len()).collect();
    roots.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    roots
}
