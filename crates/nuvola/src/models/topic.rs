//! Lesson topic record

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use super::{Record, WindowedRecord, require_date};
use crate::error::{Error, Result};

/// What was covered in one lesson
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub date: NaiveDate,
    pub subject: String,
    pub teacher: Option<String>,
    pub description: String,
    pub raw: Value,
}

#[derive(Deserialize)]
struct Fields {
    #[serde(rename = "data")]
    date: String,
    #[serde(rename = "materia", default)]
    subject: Option<String>,
    #[serde(rename = "docente", default)]
    teacher: Option<String>,
    #[serde(rename = "argomento", default)]
    description: Option<String>,
}

impl Record for Topic {
    fn from_raw(raw: Value) -> Result<Self> {
        let f = Fields::deserialize(&raw).map_err(|e| Error::shape("topic", e))?;
        Ok(Self {
            date: require_date("topic", "data", &f.date)?,
            subject: f.subject.unwrap_or_default(),
            teacher: f.teacher,
            description: f.description.unwrap_or_default(),
            raw,
        })
    }

    fn raw(&self) -> &Value {
        &self.raw
    }
}

impl WindowedRecord for Topic {
    const CALL: &'static str = "argomento-lezione/elenco";

    fn window_date(&self) -> NaiveDate {
        self.date
    }
}
