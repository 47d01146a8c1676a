//! Filters over subjects and marks

use chrono::NaiveDate;

use crate::models::Mark;
use crate::sync::SubjectNode;

pub fn subject_by_id(subjects: &[SubjectNode], id: i64) -> Option<&SubjectNode> {
    subjects.iter().find(|s| s.subject().id == id)
}

/// Case-insensitive match on the subject name
pub fn subject_by_name<'a>(subjects: &'a [SubjectNode], name: &str) -> Option<&'a SubjectNode> {
    let name = name.trim();
    subjects
        .iter()
        .find(|s| s.subject().name.trim().eq_ignore_ascii_case(name))
}

pub fn marks_by_teacher<'a>(marks: &'a [Mark], teacher: &str) -> Vec<&'a Mark> {
    marks
        .iter()
        .filter(|m| m.teacher.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(teacher)))
        .collect()
}

pub fn marks_on(marks: &[Mark], date: NaiveDate) -> Vec<&Mark> {
    marks.iter().filter(|m| m.date == date).collect()
}

/// Marks whose weight ratio lies in `min..=max`
pub fn marks_in_weight_range(marks: &[Mark], min: f64, max: f64) -> Vec<&Mark> {
    marks.iter().filter(|m| m.weight >= min && m.weight <= max).collect()
}

/// Marks that count towards the average
pub fn relevant_marks(marks: &[Mark]) -> Vec<&Mark> {
    marks.iter().filter(|m| m.relevant).collect()
}

pub fn marks_by_kind<'a>(marks: &'a [Mark], kind: &str) -> Vec<&'a Mark> {
    marks
        .iter()
        .filter(|m| m.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case(kind)))
        .collect()
}

/// Weighted average of the relevant marks
///
/// `None` when no relevant mark carries any weight.
pub fn average(marks: &[Mark]) -> Option<f64> {
    let (sum, weights) = marks
        .iter()
        .filter(|m| m.relevant)
        .fold((0.0, 0.0), |(sum, weights), m| (sum + m.value * m.weight, weights + m.weight));
    (weights > 0.0).then(|| sum / weights)
}
