//! Assignment (homework) record

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use super::{Attachment, Record, WindowedRecord, require_date};
use crate::error::{Error, Result};

/// A homework assignment
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub teacher: String,
    pub subject: String,
    pub class_name: String,
    pub class_id: Option<i64>,
    /// Day the assignment was given
    pub date_assigned: NaiveDate,
    /// Day the assignment is due
    pub date_due: NaiveDate,
    pub description: String,
    pub attachments: Vec<Attachment>,
    pub raw: Value,
}

#[derive(Deserialize)]
struct Fields {
    #[serde(rename = "docente")]
    teacher: String,
    #[serde(rename = "materia")]
    subject: String,
    #[serde(rename = "classe", default)]
    class_name: Option<String>,
    #[serde(rename = "classeId", default)]
    class_id: Option<i64>,
    #[serde(rename = "dataAssegnazione")]
    date_assigned: String,
    #[serde(rename = "dataConsegna")]
    date_due: String,
    #[serde(rename = "descrizioneCompito", default)]
    description: Vec<String>,
    #[serde(rename = "allegati", default)]
    attachments: Vec<Attachment>,
}

impl Record for Assignment {
    fn from_raw(raw: Value) -> Result<Self> {
        let fields = Fields::deserialize(&raw).map_err(|e| Error::shape("assignment", e))?;
        let date_assigned = require_date("assignment", "dataAssegnazione", &fields.date_assigned)?;
        let date_due = require_date("assignment", "dataConsegna", &fields.date_due)?;

        Ok(Self {
            teacher: fields.teacher,
            subject: fields.subject,
            class_name: fields.class_name.unwrap_or_default(),
            class_id: fields.class_id,
            date_assigned,
            date_due,
            description: fields.description.into_iter().next().unwrap_or_default(),
            attachments: fields.attachments,
            raw,
        })
    }

    fn raw(&self) -> &Value {
        &self.raw
    }
}

impl WindowedRecord for Assignment {
    const CALL: &'static str = "compito/elenco";

    fn window_date(&self) -> NaiveDate {
        self.date_assigned
    }
}
