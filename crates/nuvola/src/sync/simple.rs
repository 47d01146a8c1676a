//! Collections the remote serves in full from one call

use chrono::TimeDelta;
use log::info;

use super::snapshot::{CollectionSnapshot, decode_all};
use super::staleness::{Clock, Staleness};
use super::RecordSource;
use crate::error::Result;
use crate::models::ListedRecord;

/// A cached collection that is replaced wholesale on every reload
#[derive(Debug, Clone)]
pub struct SimpleCollection<R> {
    records: Vec<R>,
    staleness: Staleness,
}

impl<R: ListedRecord> SimpleCollection<R> {
    pub fn new(refresh_interval: TimeDelta) -> Self {
        Self {
            records: Vec::new(),
            staleness: Staleness::new(refresh_interval),
        }
    }

    pub fn from_snapshot(
        refresh_interval: TimeDelta,
        snapshot: &CollectionSnapshot,
    ) -> Result<Self> {
        Ok(Self {
            records: decode_all(&snapshot.data)?,
            staleness: Staleness::restored(refresh_interval, snapshot.mod_time),
        })
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn staleness(&self) -> &Staleness {
        &self.staleness
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

    /// Replace every record with the remote's current set
    pub fn load(&mut self, source: &mut dyn RecordSource, clock: &dyn Clock) -> Result<()> {
        let now = clock.now();
        let records = decode_all(&source.fetch(R::CALL)?)?;
        self.records = records;
        self.staleness.mark_fresh(now);
        info!("Loaded {} records from {}", self.records.len(), R::CALL);
        Ok(())
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot::of(&self.records, &self.staleness)
    }
}
