//! Grade hierarchy: time window -> subject -> mark
//!
//! Each level is loaded lazily on first access and keeps its own staleness
//! clock. Children never reach back into their parent; a subject only knows
//! the id of the window it was built under.

use chrono::TimeDelta;
use log::info;
use serde_json::Value;

use super::snapshot::{SubjectSnapshot, TimeWindowSnapshot, decode_all, raws};
use super::staleness::{Clock, Staleness};
use super::RecordSource;
use crate::error::{Error, Result};
use crate::models::{Mark, Record, Subject, TimeWindow};

/// Resource listing the time windows
pub(crate) const TIME_WINDOWS_CALL: &str = "frazioni-temporali";

/// Refresh intervals for the two lazily loaded levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchyIntervals {
    pub time_window: TimeDelta,
    pub subject: TimeDelta,
}

/// A time window and its lazily loaded subjects
#[derive(Debug, Clone)]
pub struct TimeWindowNode {
    window: TimeWindow,
    subjects: Option<Vec<SubjectNode>>,
    staleness: Staleness,
    subject_interval: TimeDelta,
}

impl TimeWindowNode {
    /// A window whose subjects have not been fetched yet
    pub fn from_remote(window: TimeWindow, intervals: HierarchyIntervals) -> Self {
        Self {
            window,
            subjects: None,
            staleness: Staleness::new(intervals.time_window),
            subject_interval: intervals.subject,
        }
    }

    /// Rebuild a window from snapshot data
    ///
    /// A window that was never reloaded has no subject list, whatever the
    /// snapshot's `subjects` holds.
    pub fn from_snapshot(
        snapshot: &TimeWindowSnapshot,
        intervals: HierarchyIntervals,
    ) -> Result<Self> {
        let window = TimeWindow::from_raw(snapshot.raw.clone())?;
        let subjects = match snapshot.mod_time {
            Some(_) => Some(
                snapshot
                    .subjects
                    .iter()
                    .map(|s| SubjectNode::from_snapshot(s, window.id, intervals.subject))
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        Ok(Self {
            window,
            subjects,
            staleness: Staleness::restored(intervals.time_window, snapshot.mod_time),
            subject_interval: intervals.subject,
        })
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Replace the window record, keeping subjects and staleness
    pub(crate) fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn staleness(&self) -> &Staleness {
        &self.staleness
    }

    /// Subjects if they have been loaded, without touching the remote
    pub fn loaded_subjects(&self) -> Option<&[SubjectNode]> {
        self.subjects.as_deref()
    }

    /// Subjects, loading or refreshing them first when needed
    pub fn subjects(
        &mut self,
        source: &mut dyn RecordSource,
        clock: &dyn Clock,
    ) -> Result<&mut [SubjectNode]> {
        self.check_and_update(source, clock, false)?;
        Ok(self.subjects.as_deref_mut().unwrap_or_default())
    }

    /// A subject of this window by id, loading the subject list if needed
    pub fn subject(
        &mut self,
        source: &mut dyn RecordSource,
        clock: &dyn Clock,
        subject_id: i64,
    ) -> Result<Option<&mut SubjectNode>> {
        let subjects = self.subjects(source, clock)?;
        Ok(subjects.iter_mut().find(|s| s.subject.id == subject_id))
    }

    /// Reload the subject list if forced, never loaded or stale
    pub fn check_and_update(
        &mut self,
        source: &mut dyn RecordSource,
        clock: &dyn Clock,
        force: bool,
    ) -> Result<bool> {
        let now = clock.now();
        if !force && self.subjects.is_some() && !self.staleness.is_stale(now) {
            return Ok(false);
        }
        self.load(source, clock)?;
        Ok(true)
    }

    /// Fetch the subject list
    ///
    /// Subjects that were already known keep their marks and their own
    /// staleness clock; only the subject record itself is replaced.
    pub fn load(&mut self, source: &mut dyn RecordSource, clock: &dyn Clock) -> Result<()> {
        let now = clock.now();
        let call = format!("frazione-temporale/{}/voti/materie", self.window.id);
        let fetched: Vec<Subject> = decode_all(&source.fetch(&call)?)?;

        let mut previous = self.subjects.take().unwrap_or_default();
        let nodes = fetched
            .into_iter()
            .map(|subject| match previous.iter().position(|n| n.subject.id == subject.id) {
                Some(i) => {
                    let mut node = previous.swap_remove(i);
                    node.subject = subject;
                    node
                }
                None => SubjectNode::new(subject, self.window.id, self.subject_interval),
            })
            .collect::<Vec<_>>();

        info!("Loaded {} subjects for time window {}", nodes.len(), self.window.name);
        self.subjects = Some(nodes);
        self.staleness.mark_fresh(now);
        Ok(())
    }

    pub fn snapshot(&self) -> TimeWindowSnapshot {
        TimeWindowSnapshot {
            mod_time: self.staleness.epoch_seconds(),
            raw: self.window.raw.clone(),
            subjects: self
                .subjects
                .iter()
                .flatten()
                .map(SubjectNode::snapshot)
                .collect(),
        }
    }
}

/// A subject and its lazily loaded marks
#[derive(Debug, Clone)]
pub struct SubjectNode {
    subject: Subject,
    /// Id of the owning window, used to address the marks resource
    window_id: i64,
    marks: Option<Vec<Mark>>,
    staleness: Staleness,
}

impl SubjectNode {
    fn new(subject: Subject, window_id: i64, interval: TimeDelta) -> Self {
        Self {
            subject,
            window_id,
            marks: None,
            staleness: Staleness::new(interval),
        }
    }

    fn from_snapshot(
        snapshot: &SubjectSnapshot,
        window_id: i64,
        interval: TimeDelta,
    ) -> Result<Self> {
        let marks = match snapshot.mod_time {
            Some(_) => Some(decode_all(&snapshot.marks)?),
            None => None,
        };
        Ok(Self {
            subject: Subject::from_raw(snapshot.raw.clone())?,
            window_id,
            marks,
            staleness: Staleness::restored(interval, snapshot.mod_time),
        })
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn window_id(&self) -> i64 {
        self.window_id
    }

    pub fn staleness(&self) -> &Staleness {
        &self.staleness
    }

    pub fn loaded_marks(&self) -> Option<&[Mark]> {
        self.marks.as_deref()
    }

    /// Marks, loading or refreshing them first when needed
    pub fn marks(&mut self, source: &mut dyn RecordSource, clock: &dyn Clock) -> Result<&[Mark]> {
        self.check_and_update(source, clock, false)?;
        Ok(self.marks.as_deref().unwrap_or_default())
    }

    pub fn check_and_update(
        &mut self,
        source: &mut dyn RecordSource,
        clock: &dyn Clock,
        force: bool,
    ) -> Result<bool> {
        if !force && self.marks.is_some() && !self.staleness.is_stale(clock.now()) {
            return Ok(false);
        }
        self.load(source, clock)?;
        Ok(true)
    }

    /// Fetch this subject's marks
    ///
    /// The resource answers with a one-element list whose `voti` field holds
    /// the marks; an empty list means no marks.
    pub fn load(&mut self, source: &mut dyn RecordSource, clock: &dyn Clock) -> Result<()> {
        let now = clock.now();
        let call = format!(
            "frazione-temporale/{}/voti/materia/{}",
            self.window_id, self.subject.id
        );
        let values = source.fetch(&call)?;
        let marks = match values.first() {
            None => Vec::new(),
            Some(entry) => match entry.get("voti") {
                Some(Value::Array(raw)) => decode_all(raw)?,
                Some(Value::Null) | None if entry.is_object() => Vec::new(),
                _ => {
                    return Err(Error::UnexpectedShape(format!(
                        "marks of subject {} have no 'voti' list",
                        self.subject.id
                    )));
                }
            },
        };

        info!("Loaded {} marks for {}", marks.len(), self.subject.name);
        self.marks = Some(marks);
        self.staleness.mark_fresh(now);
        Ok(())
    }

    pub fn snapshot(&self) -> SubjectSnapshot {
        SubjectSnapshot {
            mod_time: self.staleness.epoch_seconds(),
            raw: self.subject.raw.clone(),
            marks: self.marks.as_deref().map(raws).unwrap_or_default(),
        }
    }
}
