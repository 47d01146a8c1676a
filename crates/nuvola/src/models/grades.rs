//! Grade hierarchy records: time windows, subjects and marks

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use super::{Record, number_from, parse_weight, require_date};
use crate::error::{Error, Result};

/// Names the remote uses for the window spanning the whole school year
const FULL_YEAR_NAMES: [&str; 2] = ["INTERO ANNO", "FULL YEAR"];

/// A grading period (term, quarter or the whole year)
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    pub id: i64,
    pub name: String,
    /// Flagged by the remote as the period in progress
    pub current: bool,
    pub raw: Value,
}

#[derive(Deserialize)]
struct TimeWindowFields {
    id: i64,
    #[serde(rename = "nome")]
    name: String,
    #[serde(rename = "corrente", default)]
    current: Option<bool>,
}

impl TimeWindow {
    /// Whether this is the sentinel full-year window
    pub fn is_full_year(&self) -> bool {
        let name = self.name.trim();
        FULL_YEAR_NAMES.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

impl Record for TimeWindow {
    fn from_raw(raw: Value) -> Result<Self> {
        let f = TimeWindowFields::deserialize(&raw).map_err(|e| Error::shape("time window", e))?;
        Ok(Self {
            id: f.id,
            name: f.name,
            current: f.current.unwrap_or(false),
            raw,
        })
    }

    fn raw(&self) -> &Value {
        &self.raw
    }
}

/// A subject graded within one time window
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub kind: Option<String>,
    pub raw: Value,
}

#[derive(Deserialize)]
struct SubjectFields {
    id: i64,
    #[serde(rename = "materia")]
    name: String,
    #[serde(rename = "tipo", default)]
    kind: Option<String>,
}

impl Record for Subject {
    fn from_raw(raw: Value) -> Result<Self> {
        let f = SubjectFields::deserialize(&raw).map_err(|e| Error::shape("subject", e))?;
        Ok(Self {
            id: f.id,
            name: f.name,
            kind: f.kind,
            raw,
        })
    }

    fn raw(&self) -> &Value {
        &self.raw
    }
}

/// A single grade
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub date: NaiveDate,
    pub teacher: Option<String>,
    /// Written, oral, practical...
    pub kind: Option<String>,
    /// The grade as displayed ("7+", "8/9")
    pub display: String,
    /// The grade as a number
    pub value: f64,
    /// Whether the grade counts towards the average
    pub relevant: bool,
    /// Weight as a 0-1 ratio
    pub weight: f64,
    pub description: Option<String>,
    pub objective_name: Option<String>,
    pub objectives: Value,
    pub raw: Value,
}

#[derive(Deserialize)]
struct MarkFields {
    #[serde(rename = "data")]
    date: String,
    #[serde(rename = "docente", default)]
    teacher: Option<String>,
    #[serde(rename = "tipologia", default)]
    kind: Option<String>,
    #[serde(rename = "valutazione", default)]
    display: Option<String>,
    #[serde(rename = "valutazioneMatematica")]
    value: Value,
    #[serde(rename = "faMedia", default)]
    relevant: Option<bool>,
    #[serde(rename = "peso")]
    weight: String,
    #[serde(rename = "descrizione", default)]
    description: Option<String>,
    #[serde(rename = "nomeObiettivo", default)]
    objective_name: Option<String>,
    #[serde(rename = "obiettivi", default)]
    objectives: Value,
}

impl Record for Mark {
    fn from_raw(raw: Value) -> Result<Self> {
        let f = MarkFields::deserialize(&raw).map_err(|e| Error::shape("mark", e))?;
        let value = number_from(&f.value)
            .ok_or_else(|| Error::shape("mark", format!("invalid value {}", f.value)))?;
        let weight = parse_weight(&f.weight)
            .ok_or_else(|| Error::shape("mark", format!("invalid weight '{}'", f.weight)))?;

        Ok(Self {
            date: require_date("mark", "data", &f.date)?,
            teacher: f.teacher,
            kind: f.kind,
            display: f.display.unwrap_or_default(),
            value,
            relevant: f.relevant.unwrap_or(true),
            weight,
            description: f.description,
            objective_name: f.objective_name,
            objectives: f.objectives,
            raw,
        })
    }

    fn raw(&self) -> &Value {
        &self.raw
    }
}
