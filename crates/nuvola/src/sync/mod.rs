//! Cached collections and their synchronization with the remote
//!
//! This module provides:
//! - Staleness tracking against an injectable clock
//! - Date-windowed collections with incremental re-sync
//! - Fully listed collections
//! - The lazily loaded time window -> subject -> mark hierarchy
//! - Versioned snapshots and the root that ties everything together

mod hierarchy;
mod root;
mod simple;
mod snapshot;
mod staleness;
mod windowed;

#[cfg(test)]
pub(crate) mod test_support;

pub use hierarchy::{HierarchyIntervals, SubjectNode, TimeWindowNode};
pub use root::{SyncRoot, SyncStats, select_active};
pub use simple::SimpleCollection;
pub use snapshot::{
    CollectionSnapshot, FORMAT_VERSION, Snapshot, SubjectSnapshot, TimeWindowSnapshot,
};
pub use staleness::{Clock, Staleness, SystemClock};
pub use windowed::{ResyncAnchor, WindowPolicy, WindowedCollection, school_year_start};

use serde_json::Value;

use crate::error::Result;

/// Where collections fetch their records from
///
/// `call` is a resource path relative to the student's API root, e.g.
/// `compito/elenco/01-09-2020/16-09-2020`. The result is the list of raw
/// records the remote returned.
pub trait RecordSource {
    fn fetch(&mut self, call: &str) -> Result<Vec<Value>>;
}
