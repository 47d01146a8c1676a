//! Versioned snapshot of all cached collections
//!
//! ```json
//! {
//!   "homeworks": {"mod_time": 1600000000, "data": [ ... ]},
//!   "events": {"mod_time": 1600000000, "data": [ ... ]},
//!   "topics": {"mod_time": null, "data": []},
//!   "timeWindows": [
//!     {
//!       "mod_time": 1600000000,
//!       "raw": { ... },
//!       "subjects": [{"mod_time": 1600000000, "raw": { ... }, "marks": [ ... ]}]
//!     }
//!   ],
//!   "version": 1
//! }
//! ```
//!
//! Records are stored as the raw JSON the remote sent. The `subjects` and
//! `marks` lists are always written. A `mod_time` of `null` on a window or
//! a subject means its list was never loaded and is fetched on first access.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::staleness::Staleness;
use crate::error::{Error, Result};
use crate::models::Record;

/// Format version written by this build
pub const FORMAT_VERSION: u64 = 1;

/// Top-level keys of a snapshot, exactly
const TOP_LEVEL_KEYS: [&str; 5] = ["homeworks", "events", "topics", "timeWindows", "version"];

/// A flat collection: reload time plus raw records
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionSnapshot {
    pub mod_time: Option<i64>,
    pub data: Vec<Value>,
}

impl CollectionSnapshot {
    pub(crate) fn of<R: Record>(records: &[R], staleness: &Staleness) -> Self {
        Self {
            mod_time: staleness.epoch_seconds(),
            data: raws(records),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeWindowSnapshot {
    /// Last subject-list reload; `None` when the subjects were never loaded
    pub mod_time: Option<i64>,
    pub raw: Value,
    #[serde(default)]
    pub subjects: Vec<SubjectSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectSnapshot {
    /// Last marks reload; `None` when the marks were never loaded
    #[serde(default)]
    pub mod_time: Option<i64>,
    pub raw: Value,
    #[serde(default)]
    pub marks: Vec<Value>,
}

/// Everything needed to restart without re-fetching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub homeworks: CollectionSnapshot,
    pub events: CollectionSnapshot,
    pub topics: CollectionSnapshot,
    #[serde(rename = "timeWindows")]
    pub time_windows: Vec<TimeWindowSnapshot>,
    pub version: u64,
}

impl Snapshot {
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| Error::Format(e.to_string()))
    }

    /// Validate and decode a snapshot
    ///
    /// Fails with `Format` unless the top-level keys are exactly the expected
    /// set, and with `VersionMismatch` when the version differs and
    /// `allow_version_mismatch` is false.
    pub fn from_value(value: &Value, allow_version_mismatch: bool) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Format("snapshot is not a JSON object".to_string()))?;

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = TOP_LEVEL_KEYS.to_vec();
        expected.sort_unstable();
        if keys != expected {
            return Err(Error::Format(format!(
                "expected keys {:?}, found {:?}",
                TOP_LEVEL_KEYS, keys
            )));
        }

        let found = obj
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Format("version is not a non-negative integer".to_string()))?;
        if found != FORMAT_VERSION && !allow_version_mismatch {
            return Err(Error::VersionMismatch {
                found,
                expected: FORMAT_VERSION,
            });
        }

        Self::deserialize(value).map_err(|e| Error::Format(e.to_string()))
    }

    /// Write the snapshot as JSON
    pub fn write_to(&self, path: &Path) -> Result<()> {
        config::save_json_file(path, self)?;
        Ok(())
    }

    /// Read a snapshot file written by `write_to`
    pub fn read_from(path: &Path, allow_version_mismatch: bool) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| Error::Format(format!("{}: {}", path.display(), e)))?;
        Self::from_value(&value, allow_version_mismatch)
    }
}

pub(crate) fn raws<R: Record>(records: &[R]) -> Vec<Value> {
    records.iter().map(|r| r.raw().clone()).collect()
}

/// Decode stored raw records
pub(crate) fn decode_all<R: Record>(data: &[Value]) -> Result<Vec<R>> {
    data.iter().cloned().map(R::from_raw).collect()
}
