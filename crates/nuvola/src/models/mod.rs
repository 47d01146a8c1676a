//! Domain records decoded from the remote API
//!
//! Every record keeps the JSON object it was decoded from in `raw`, so a
//! snapshot can store exactly what the API returned and re-decode it later.

mod assignment;
mod attachment;
mod event;
mod grades;
mod irregularity;
mod topic;

pub use assignment::Assignment;
pub use attachment::{Attachment, AttachmentOwner};
pub use event::Event;
pub use grades::{Mark, Subject, TimeWindow};
pub use irregularity::{Irregularity, IrregularityKind};
pub use topic::Topic;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::error::{Error, Result};

/// A value decoded from one remote JSON object
pub trait Record: Sized {
    /// Decode a record, keeping `raw` as-is
    fn from_raw(raw: Value) -> Result<Self>;

    /// The JSON object this record was decoded from
    fn raw(&self) -> &Value;
}

/// A record served by a date-ranged resource
pub trait WindowedRecord: Record {
    /// Resource call; window bounds are appended as `/{start}/{end}`
    const CALL: &'static str;

    /// The date the remote range query is keyed on
    fn window_date(&self) -> NaiveDate;
}

/// A record served in full by one unparameterized resource
pub trait ListedRecord: Record {
    const CALL: &'static str;
}

/// Parse the date part of an ISO-8601 timestamp (`2020-09-14T00:00:00+02:00`)
pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let date = value.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Combine the date part of an ISO timestamp with a separate `HH:MM` time
pub(crate) fn parse_date_time(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    let date = parse_iso_date(date)?;
    let time = match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
            .ok()?,
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

/// Read a number that the API sends either as a JSON number or a string
pub(crate) fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Parse a percentage string such as `"50%"` into a 0-1 ratio
pub(crate) fn parse_weight(value: &str) -> Option<f64> {
    let digits = value.trim().trim_end_matches('%').trim();
    digits.parse::<f64>().ok().map(|p| p / 100.0)
}

/// Decode a date field, reporting the record kind on failure
pub(crate) fn require_date(what: &str, field: &str, value: &str) -> Result<NaiveDate> {
    parse_iso_date(value)
        .ok_or_else(|| Error::UnexpectedShape(format!("{}: invalid {} '{}'", what, field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(
            parse_iso_date("2020-09-14T00:00:00+02:00"),
            NaiveDate::from_ymd_opt(2020, 9, 14)
        );
        assert_eq!(parse_iso_date("2020-09-14"), NaiveDate::from_ymd_opt(2020, 9, 14));
        assert_eq!(parse_iso_date("14-09-2020"), None);
        assert_eq!(parse_iso_date("2020"), None);
    }

    #[test]
    fn test_parse_date_time() {
        let dt = parse_date_time("2020-09-14T00:00:00+02:00", Some("08:30")).unwrap();
        assert_eq!(dt.to_string(), "2020-09-14 08:30:00");

        let midnight = parse_date_time("2020-09-14T00:00:00", None).unwrap();
        assert_eq!(midnight.to_string(), "2020-09-14 00:00:00");

        assert!(parse_date_time("2020-09-14", Some("late")).is_none());
    }

    #[test]
    fn test_number_from() {
        assert_eq!(number_from(&json!(7.5)), Some(7.5));
        assert_eq!(number_from(&json!("6,75")), Some(6.75));
        assert_eq!(number_from(&json!("8")), Some(8.0));
        assert_eq!(number_from(&json!(null)), None);
    }

    #[test]
    fn test_parse_weight() {
        assert_eq!(parse_weight("50%"), Some(0.5));
        assert_eq!(parse_weight("100%"), Some(1.0));
        assert_eq!(parse_weight(" 25 % "), Some(0.25));
        assert_eq!(parse_weight("heavy"), None);
    }
}
