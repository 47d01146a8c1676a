//! Class event record (calendar entries, notices)

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use super::{Attachment, ListedRecord, Record, parse_date_time};
use crate::error::{Error, Result};

/// An event on the class calendar
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    /// Event type as the remote labels it
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    pub teacher: Option<String>,
    pub notes: Option<String>,
    /// Whether the student has already seen the event
    pub seen: bool,
    pub attachments: Vec<Attachment>,
    pub video_link: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub border_color: Option<String>,
    pub notification_id: Option<i64>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub raw: Value,
}

#[derive(Deserialize)]
struct Fields {
    id: i64,
    #[serde(rename = "tipo", default)]
    kind: Option<String>,
    #[serde(rename = "nome", default)]
    name: Option<String>,
    #[serde(rename = "descrizione", default)]
    description: Option<String>,
    #[serde(rename = "docente", default)]
    teacher: Option<String>,
    #[serde(rename = "annotazioni", default)]
    notes: Option<String>,
    #[serde(rename = "visto", default)]
    seen: Option<bool>,
    #[serde(rename = "allegati", default)]
    attachments: Option<Vec<Attachment>>,
    #[serde(rename = "linkVideo", default)]
    video_link: Option<String>,
    #[serde(rename = "coloreSfondo", default)]
    background_color: Option<String>,
    #[serde(rename = "coloreTesto", default)]
    text_color: Option<String>,
    #[serde(rename = "coloreBordo", default)]
    border_color: Option<String>,
    #[serde(rename = "idNotifica", default)]
    notification_id: Option<i64>,
    #[serde(rename = "dataInizio")]
    start_date: String,
    #[serde(rename = "oraInizio", default)]
    start_time: Option<String>,
    #[serde(rename = "dataFine")]
    end_date: String,
    #[serde(rename = "oraFine", default)]
    end_time: Option<String>,
}

impl Event {
    /// Whether the event spans the given day
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.starts_at.date() <= date && date <= self.ends_at.date()
    }
}

impl Record for Event {
    fn from_raw(raw: Value) -> Result<Self> {
        let f = Fields::deserialize(&raw).map_err(|e| Error::shape("event", e))?;
        let starts_at = parse_date_time(&f.start_date, f.start_time.as_deref())
            .ok_or_else(|| Error::shape("event", format!("invalid start '{}'", f.start_date)))?;
        let ends_at = parse_date_time(&f.end_date, f.end_time.as_deref())
            .ok_or_else(|| Error::shape("event", format!("invalid end '{}'", f.end_date)))?;

        Ok(Self {
            id: f.id,
            kind: f.kind.unwrap_or_default(),
            name: f.name.unwrap_or_default(),
            description: f.description,
            teacher: f.teacher,
            notes: f.notes,
            seen: f.seen.unwrap_or(false),
            attachments: f.attachments.unwrap_or_default(),
            video_link: f.video_link,
            background_color: f.background_color,
            text_color: f.text_color,
            border_color: f.border_color,
            notification_id: f.notification_id,
            starts_at,
            ends_at,
            raw,
        })
    }

    fn raw(&self) -> &Value {
        &self.raw
    }
}

impl ListedRecord for Event {
    const CALL: &'static str = "eventi-classe";
}
