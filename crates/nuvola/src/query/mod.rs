//! Query helpers over cached records
//!
//! Pure filters over record slices as returned by `SyncRoot`; none of them
//! touch the remote.

mod agenda;
mod grades;

pub use agenda::{
    assignments_assigned_on, assignments_due_on, event_by_id, events_by_kind, events_by_teacher,
    events_on, irregularities_on, topics_on, unjustified_irregularities, unseen_events,
};
pub use grades::{
    average, marks_by_kind, marks_by_teacher, marks_in_weight_range, marks_on, relevant_marks,
    subject_by_id, subject_by_name,
};
