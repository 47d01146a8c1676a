//! Fakes shared by the sync tests

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde_json::{Value, json};

use super::staleness::Clock;
use super::RecordSource;
use crate::error::{Error, Result};

/// A clock that only moves when told to
pub struct FixedClock(Cell<DateTime<Utc>>);

impl FixedClock {
    /// Noon UTC on `date`
    pub fn on(date: NaiveDate) -> Self {
        Self(Cell::new(date.and_time(NaiveTime::MIN).and_utc() + TimeDelta::hours(12)))
    }

    pub fn advance(&self, by: TimeDelta) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.get()
    }

    fn today(&self) -> NaiveDate {
        self.0.get().date_naive()
    }
}

/// In-memory remote
///
/// Windowed calls (`<resource>/<dd-mm-yyyy>/<dd-mm-yyyy>`) are answered from
/// `dated`, inclusive of both bounds; any other call must have been
/// registered with `set_listed`.
#[derive(Default)]
pub struct FakeSource {
    pub dated: Vec<(NaiveDate, Value)>,
    pub listed: HashMap<String, Vec<Value>>,
    pub calls: RefCell<Vec<String>>,
    pub fail: bool,
    /// Fail every call once this many calls have been made in total
    pub fail_after: Option<usize>,
}

impl FakeSource {
    pub fn add_dated(&mut self, date: NaiveDate, raw: Value) {
        self.dated.push((date, raw));
    }

    /// Replace the record on `date` in place
    pub fn replace_dated(&mut self, date: NaiveDate, raw: Value) {
        if let Some(entry) = self.dated.iter_mut().find(|(d, _)| *d == date) {
            entry.1 = raw;
        }
    }

    pub fn set_listed(&mut self, call: &str, values: Vec<Value>) {
        self.listed.insert(call.to_string(), values);
    }

    fn window(call: &str) -> Option<(NaiveDate, NaiveDate)> {
        let mut parts = call.rsplit('/');
        let end = NaiveDate::parse_from_str(parts.next()?, "%d-%m-%Y").ok()?;
        let start = NaiveDate::parse_from_str(parts.next()?, "%d-%m-%Y").ok()?;
        Some((start, end))
    }
}

impl RecordSource for FakeSource {
    fn fetch(&mut self, call: &str) -> Result<Vec<Value>> {
        let made = self.calls.borrow().len();
        self.calls.borrow_mut().push(call.to_string());
        if self.fail || self.fail_after.is_some_and(|n| made >= n) {
            return Err(Error::Http("connection refused".to_string()));
        }
        if let Some(values) = self.listed.get(call) {
            return Ok(values.clone());
        }
        let (start, end) = Self::window(call)
            .ok_or_else(|| Error::UnexpectedShape(format!("no fake data for {}", call)))?;
        Ok(self
            .dated
            .iter()
            .filter(|(d, _)| *d >= start && *d <= end)
            .map(|(_, raw)| raw.clone())
            .collect())
    }
}

/// 2020-08-31 plus `n` days
pub fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 8, 31).unwrap() + TimeDelta::days(n)
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn assignment_raw(date: NaiveDate, description: &str) -> Value {
    json!({
        "docente": "ROSSI MARIO",
        "materia": "MATEMATICA",
        "allegati": [],
        "classe": "3A",
        "classeId": 77,
        "dataAssegnazione": iso(date),
        "dataConsegna": iso(date + TimeDelta::days(7)),
        "descrizioneCompito": [description]
    })
}

pub fn event_raw(id: i64, date: NaiveDate) -> Value {
    json!({
        "id": id,
        "tipo": "EVENTO",
        "nome": format!("event {}", id),
        "descrizione": "",
        "docente": "BIANCHI LUCA",
        "visto": false,
        "allegati": [],
        "dataInizio": iso(date),
        "oraInizio": "08:00",
        "dataFine": iso(date),
        "oraFine": "09:00"
    })
}

pub fn topic_raw(date: NaiveDate, description: &str) -> Value {
    json!({
        "data": iso(date),
        "materia": "STORIA",
        "docente": "VERDI ANNA",
        "argomento": description
    })
}

pub fn mark_raw(date: NaiveDate, display: &str) -> Value {
    json!({
        "data": iso(date),
        "docente": "ROSSI MARIO",
        "tipologia": "Scritto",
        "valutazione": display,
        "valutazioneMatematica": display,
        "faMedia": true,
        "peso": "100%",
        "descrizione": "",
        "obiettivi": []
    })
}
