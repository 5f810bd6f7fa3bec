//! Cascading Branch → Teacher → Track selection for the santri list.
//!
//! Every selector is mandatory. A selection that no longer exists in the
//! data (a branch whose last student moved away, a teacher from another
//! branch) snaps back to the first available value instead of producing an
//! error.

use serde::Serialize;

use crate::model::{Program, Student, StudentStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchySelection {
    pub branch: Option<String>,
    pub teacher_id: Option<String>,
    pub track: Program,
    pub status: StudentStatus,
}

impl Default for HierarchySelection {
    fn default() -> Self {
        Self {
            branch: None,
            teacher_id: None,
            track: Program::Tahfidz,
            status: StudentStatus::Active,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HierarchyView<'a> {
    pub selection: HierarchySelection,
    pub branches: Vec<String>,
    pub teachers: Vec<String>,
    pub students: Vec<&'a Student>,
}

impl HierarchyView<'_> {
    /// Track/status selectors only make sense once a teacher is picked.
    pub fn tracks_visible(&self) -> bool {
        self.selection.teacher_id.is_some()
    }
}

/// Distinct branches in first-seen order.
pub fn distinct_branches(students: &[Student]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in students {
        if !out.iter().any(|b| *b == s.branch) {
            out.push(s.branch.clone());
        }
    }
    out
}

/// Distinct teacher ids with at least one student in `branch`. Students
/// without an assigned teacher do not contribute one.
pub fn teachers_in_branch(students: &[Student], branch: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in students.iter().filter(|s| s.branch == branch) {
        if s.teacher_id.trim().is_empty() {
            continue;
        }
        if !out.iter().any(|t| *t == s.teacher_id) {
            out.push(s.teacher_id.clone());
        }
    }
    out
}

fn keep_or_first(wanted: Option<&str>, available: &[String]) -> Option<String> {
    match wanted {
        Some(w) if available.iter().any(|a| a == w) => Some(w.to_string()),
        _ => available.first().cloned(),
    }
}

pub fn resolve<'a>(students: &'a [Student], wanted: &HierarchySelection) -> HierarchyView<'a> {
    let branches = distinct_branches(students);
    let branch = keep_or_first(wanted.branch.as_deref(), &branches);

    let teachers = match branch.as_deref() {
        Some(b) => teachers_in_branch(students, b),
        None => Vec::new(),
    };
    let teacher_id = keep_or_first(wanted.teacher_id.as_deref(), &teachers);

    let selection = HierarchySelection {
        branch,
        teacher_id,
        track: wanted.track,
        status: wanted.status,
    };

    let matched = match (selection.branch.as_deref(), selection.teacher_id.as_deref()) {
        (Some(b), Some(t)) => students
            .iter()
            .filter(|s| {
                s.branch == b
                    && s.teacher_id == t
                    && s.program == selection.track
                    && s.status == selection.status
            })
            .collect(),
        _ => Vec::new(),
    };

    HierarchyView {
        selection,
        branches,
        teachers,
        students: matched,
    }
}
