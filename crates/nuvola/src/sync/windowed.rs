//! Collections fetched by paginating date windows
//!
//! The remote only answers date-ranged queries for these resources and
//! never says when the history ends, so a scan walks forward one window at
//! a time and stops after enough consecutive empty windows.

use chrono::{Datelike, Local, NaiveDate, TimeDelta};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::snapshot::{CollectionSnapshot, decode_all};
use super::staleness::{Clock, Staleness};
use super::RecordSource;
use crate::error::Result;
use crate::models::WindowedRecord;

/// Date format of window bounds in request paths
const WINDOW_DATE_FORMAT: &str = "%d-%m-%Y";

/// Date the incremental re-sync window is measured back from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncAnchor {
    /// Today's date
    Today,
    /// The latest date among the cached records
    LatestRecord,
}

/// How a windowed collection scans the remote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowPolicy {
    /// The day before the first window starts
    pub start_date: NaiveDate,
    pub window_days: i64,
    /// Days of consecutive silence after which a scan stops
    pub max_empty_days: i64,
    /// Days before the anchor that an incremental refresh re-fetches
    pub backwards_refresh_days: i64,
    pub resync_anchor: ResyncAnchor,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            start_date: school_year_start(Local::now().date_naive()),
            window_days: 15,
            max_empty_days: 15 * 4,
            backwards_refresh_days: 15 * 2,
            resync_anchor: ResyncAnchor::Today,
        }
    }
}

impl WindowPolicy {
    /// Consecutive empty windows that end a scan: `ceil(max_empty_days / window_days)`
    pub fn empty_window_limit(&self) -> usize {
        let window = self.window_days.max(1);
        let windows = (self.max_empty_days.max(0) + window - 1) / window;
        usize::try_from(windows).unwrap_or(usize::MAX).max(1)
    }

    /// First day of a full scan
    pub fn first_window_start(&self) -> NaiveDate {
        self.start_date + TimeDelta::days(1)
    }

    /// First day re-fetched by an incremental refresh
    ///
    /// Records dated before this day are kept as they are; those on or after
    /// it are dropped and fetched again.
    pub fn resync_cutoff(&self, today: NaiveDate, latest: Option<NaiveDate>) -> NaiveDate {
        let anchor = match self.resync_anchor {
            ResyncAnchor::Today => today,
            ResyncAnchor::LatestRecord => latest.unwrap_or(today),
        };
        (anchor - TimeDelta::days(self.backwards_refresh_days)).max(self.first_window_start())
    }
}

/// The day before 1 September of the school year containing `today`
pub fn school_year_start(today: NaiveDate) -> NaiveDate {
    let year = if today.month() >= 9 {
        today.year()
    } else {
        today.year() - 1
    };
    NaiveDate::from_ymd_opt(year, 8, 31).unwrap_or(today)
}

/// Walk windows forward from `from` until the empty-window limit is reached
pub(crate) fn scan<R: WindowedRecord>(
    source: &mut dyn RecordSource,
    policy: &WindowPolicy,
    from: NaiveDate,
) -> Result<Vec<R>> {
    let limit = policy.empty_window_limit();
    let step = TimeDelta::days(policy.window_days.max(1));
    let mut start = from;
    let mut end = from + step;
    let mut empty_windows = 0;
    let mut records = Vec::new();

    loop {
        let call = format!(
            "{}/{}/{}",
            R::CALL,
            start.format(WINDOW_DATE_FORMAT),
            end.format(WINDOW_DATE_FORMAT)
        );
        let batch = source.fetch(&call)?;
        debug!("Window {} .. {}: {} records", start, end, batch.len());

        if batch.is_empty() {
            empty_windows += 1;
        } else {
            empty_windows = 0;
            for raw in batch {
                records.push(R::from_raw(raw)?);
            }
        }

        if empty_windows >= limit {
            break;
        }
        start = end + TimeDelta::days(1);
        end += step;
    }

    Ok(records)
}

/// A cached date-windowed collection
#[derive(Debug, Clone)]
pub struct WindowedCollection<R> {
    records: Vec<R>,
    staleness: Staleness,
    policy: WindowPolicy,
}

impl<R: WindowedRecord> WindowedCollection<R> {
    /// An empty collection, loaded on first access
    pub fn new(policy: WindowPolicy, refresh_interval: TimeDelta) -> Self {
        Self {
            records: Vec::new(),
            staleness: Staleness::new(refresh_interval),
            policy,
        }
    }

    /// Rebuild a collection from snapshot data without touching the remote
    pub fn from_snapshot(
        policy: WindowPolicy,
        refresh_interval: TimeDelta,
        snapshot: &CollectionSnapshot,
    ) -> Result<Self> {
        Ok(Self {
            records: decode_all(&snapshot.data)?,
            staleness: Staleness::restored(refresh_interval, snapshot.mod_time),
            policy,
        })
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn staleness(&self) -> &Staleness {
        &self.staleness
    }

    pub fn policy(&self) -> &WindowPolicy {
        &self.policy
    }

    pub fn set_refresh_interval(&mut self, interval: TimeDelta) {
        self.staleness.set_refresh_interval(interval);
    }

    /// Reload if forced or stale; returns whether a reload happened
    pub fn check_and_update(
        &mut self,
        source: &mut dyn RecordSource,
        clock: &dyn Clock,
        force: bool,
    ) -> Result<bool> {
        if !force && !self.staleness.is_stale(clock.now()) {
            return Ok(false);
        }
        self.load(source, clock)?;
        Ok(true)
    }

    /// Reload now: a full scan when nothing is cached, otherwise a re-sync
    /// of the trailing window
    ///
    /// On error the cached records and the reload time are left untouched.
    pub fn load(&mut self, source: &mut dyn RecordSource, clock: &dyn Clock) -> Result<()> {
        let now = clock.now();
        if self.records.is_empty() {
            let from = self.policy.first_window_start();
            self.records = scan(source, &self.policy, from)?;
        } else {
            let latest = self.records.iter().map(R::window_date).max();
            let cutoff = self.policy.resync_cutoff(clock.today(), latest);
            let mut fresh: Vec<R> = scan(source, &self.policy, cutoff)?;

            self.records.retain(|r| r.window_date() < cutoff);
            let kept = &self.records;
            fresh.retain(|r| !kept.iter().any(|k| k.raw() == r.raw()));
            self.records.extend(fresh);
        }

        self.staleness.mark_fresh(now);
        info!("Loaded {} records from {}", self.records.len(), R::CALL);
        Ok(())
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot::of(&self.records, &self.staleness)
    }
}
