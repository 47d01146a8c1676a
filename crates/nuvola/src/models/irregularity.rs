//! Attendance irregularity record (absences, late entries, early exits)

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use super::{ListedRecord, Record, require_date};
use crate::error::{Error, Result};

/// What kind of irregularity was recorded
///
/// A combined late-entry/early-exit record sets both flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IrregularityKind {
    pub absence: bool,
    pub delay: bool,
    pub exit: bool,
}

impl IrregularityKind {
    fn parse(value: &str) -> Option<Self> {
        let mut kind = Self::default();
        for part in value.split('/') {
            match part.trim().to_ascii_uppercase().as_str() {
                "ASSENZA" => kind.absence = true,
                "RITARDO" => kind.delay = true,
                "USCITA" => kind.exit = true,
                _ => return None,
            }
        }
        Some(kind)
    }
}

/// An absence, late entry or early exit
#[derive(Debug, Clone, PartialEq)]
pub struct Irregularity {
    pub id: i64,
    pub kind: IrregularityKind,
    /// Free-text label of the absence type
    pub denomination: Option<String>,
    pub shift: Option<String>,
    /// Lesson number, when the irregularity is tied to one lesson
    pub lesson: Option<i64>,
    pub date: NaiveDate,
    pub justified: bool,
    pub raw: Value,
}

#[derive(Deserialize)]
struct Lesson {
    #[serde(rename = "numeroOra")]
    number: Option<i64>,
}

#[derive(Deserialize)]
struct Fields {
    id: i64,
    #[serde(rename = "tipo")]
    kind: String,
    #[serde(rename = "tipoAssenza", default)]
    denomination: Option<String>,
    #[serde(rename = "turno", default)]
    shift: Option<String>,
    #[serde(rename = "ora", default)]
    lesson: Option<Lesson>,
    #[serde(rename = "data")]
    date: String,
    #[serde(rename = "giustificata", default)]
    justified: Option<bool>,
}

impl Record for Irregularity {
    fn from_raw(raw: Value) -> Result<Self> {
        let f = Fields::deserialize(&raw).map_err(|e| Error::shape("irregularity", e))?;
        let kind = IrregularityKind::parse(&f.kind)
            .ok_or_else(|| Error::shape("irregularity", format!("unknown type '{}'", f.kind)))?;

        Ok(Self {
            id: f.id,
            kind,
            denomination: f.denomination,
            shift: f.shift,
            lesson: f.lesson.and_then(|l| l.number),
            date: require_date("irregularity", "data", &f.date)?,
            justified: f.justified.unwrap_or(false),
            raw,
        })
    }

    fn raw(&self) -> &Value {
        &self.raw
    }
}

impl ListedRecord for Irregularity {
    const CALL: &'static str = "assenze";
}
