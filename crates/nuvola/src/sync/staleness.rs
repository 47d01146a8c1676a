//! Staleness tracking and the clock it is measured against
//!
//! Pure functions and small types that can be tested without a remote.

use chrono::{DateTime, Local, NaiveDate, TimeDelta, Utc};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Today's date in local time
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Last successful reload and how long its data stays fresh
#[derive(Debug, Clone, PartialEq)]
pub struct Staleness {
    mod_time: Option<DateTime<Utc>>,
    refresh_interval: TimeDelta,
}

impl Staleness {
    /// A clock for data that has never been loaded
    pub fn new(refresh_interval: TimeDelta) -> Self {
        Self {
            mod_time: None,
            refresh_interval,
        }
    }

    /// A clock restored from a snapshot's epoch-seconds timestamp
    pub fn restored(refresh_interval: TimeDelta, mod_time: Option<i64>) -> Self {
        Self {
            mod_time: mod_time.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            refresh_interval,
        }
    }

    pub fn mod_time(&self) -> Option<DateTime<Utc>> {
        self.mod_time
    }

    /// Last reload as epoch seconds, as stored in snapshots
    pub fn epoch_seconds(&self) -> Option<i64> {
        self.mod_time.map(|t| t.timestamp())
    }

    pub fn refresh_interval(&self) -> TimeDelta {
        self.refresh_interval
    }

    pub fn set_refresh_interval(&mut self, interval: TimeDelta) {
        self.refresh_interval = interval;
    }

    /// Whether data last reloaded at `mod_time` needs reloading at `now`
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.mod_time {
            // An interval reaching past the end of time never expires
            Some(last) => last
                .checked_add_signed(self.refresh_interval)
                .is_some_and(|expiry| now > expiry),
            None => true,
        }
    }

    /// Record a successful reload
    ///
    /// Truncated to whole seconds so it survives a snapshot unchanged.
    pub fn mark_fresh(&mut self, now: DateTime<Utc>) {
        self.mod_time = DateTime::from_timestamp(now.timestamp(), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_never_loaded_is_stale() {
        let s = Staleness::new(TimeDelta::hours(6));
        assert!(s.is_stale(at(0)));
        assert_eq!(s.epoch_seconds(), None);
    }

    #[test]
    fn test_fresh_until_interval_passes() {
        let mut s = Staleness::new(TimeDelta::seconds(60));
        s.mark_fresh(at(1_000));
        assert!(!s.is_stale(at(1_000)));
        assert!(!s.is_stale(at(1_060)));
        assert!(s.is_stale(at(1_061)));
    }

    #[test]
    fn test_zero_interval_goes_stale_immediately_after() {
        let mut s = Staleness::new(TimeDelta::zero());
        s.mark_fresh(at(5));
        assert!(!s.is_stale(at(5)));
        assert!(s.is_stale(at(6)));
    }

    #[test]
    fn test_huge_interval_never_expires() {
        let mut s = Staleness::new(TimeDelta::MAX);
        s.mark_fresh(at(1_000));
        assert!(!s.is_stale(at(1_000)));
        assert!(!s.is_stale(at(4_000_000_000)));
    }

    #[test]
    fn test_mark_fresh_truncates_to_seconds() {
        let mut s = Staleness::new(TimeDelta::hours(1));
        let now = DateTime::from_timestamp(1_600_000_000, 750_000_000).unwrap();
        s.mark_fresh(now);
        assert_eq!(s.mod_time(), Some(at(1_600_000_000)));

        let restored = Staleness::restored(TimeDelta::hours(1), s.epoch_seconds());
        assert_eq!(restored, s);
    }
}
