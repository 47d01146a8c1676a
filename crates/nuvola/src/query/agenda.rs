//! Filters over assignments, topics, events and irregularities

use chrono::NaiveDate;

use crate::models::{Assignment, Event, Irregularity, Topic};

pub fn assignments_assigned_on(assignments: &[Assignment], date: NaiveDate) -> Vec<&Assignment> {
    assignments.iter().filter(|a| a.date_assigned == date).collect()
}

pub fn assignments_due_on(assignments: &[Assignment], date: NaiveDate) -> Vec<&Assignment> {
    assignments.iter().filter(|a| a.date_due == date).collect()
}

pub fn topics_on(topics: &[Topic], date: NaiveDate) -> Vec<&Topic> {
    topics.iter().filter(|t| t.date == date).collect()
}

/// Events spanning the given day, multi-day events included
pub fn events_on(events: &[Event], date: NaiveDate) -> Vec<&Event> {
    events.iter().filter(|e| e.covers(date)).collect()
}

pub fn events_by_teacher<'a>(events: &'a [Event], teacher: &str) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|e| e.teacher.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(teacher)))
        .collect()
}

pub fn events_by_kind<'a>(events: &'a [Event], kind: &str) -> Vec<&'a Event> {
    events.iter().filter(|e| e.kind.eq_ignore_ascii_case(kind)).collect()
}

pub fn unseen_events(events: &[Event]) -> Vec<&Event> {
    events.iter().filter(|e| !e.seen).collect()
}

pub fn event_by_id(events: &[Event], id: i64) -> Option<&Event> {
    events.iter().find(|e| e.id == id)
}

pub fn irregularities_on(irregularities: &[Irregularity], date: NaiveDate) -> Vec<&Irregularity> {
    irregularities.iter().filter(|i| i.date == date).collect()
}

pub fn unjustified_irregularities(irregularities: &[Irregularity]) -> Vec<&Irregularity> {
    irregularities.iter().filter(|i| !i.justified).collect()
}
