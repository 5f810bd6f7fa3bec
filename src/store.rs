use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use crate::model::{Branch, ExamResult, Program, Role, Student, StudentStatus, User};
use crate::seed::Seed;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("student not found: {0}")]
    UnknownStudent(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Partial student update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub branch: Option<String>,
    pub teacher_id: Option<String>,
    pub grade: Option<String>,
    pub program: Option<Program>,
    pub status: Option<StudentStatus>,
    pub parent_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub school: Option<String>,
    pub email: Option<String>,
    pub infaq_amount: Option<i64>,
}

impl StudentPatch {
    pub fn promotion(grade: &str, program: Option<Program>) -> Self {
        Self {
            grade: Some(grade.to_string()),
            program,
            ..Self::default()
        }
    }

    fn apply(self, s: &mut Student) {
        // Moving a student into Tahfidz without naming a Juz clears the old
        // Tahsin level.
        if self.program == Some(Program::Tahfidz)
            && s.program != Program::Tahfidz
            && self.grade.is_none()
        {
            s.grade = "-".to_string();
        }
        if let Some(v) = self.name {
            s.name = v;
        }
        if let Some(v) = self.branch {
            s.branch = v;
        }
        if let Some(v) = self.teacher_id {
            s.teacher_id = v;
        }
        if let Some(v) = self.grade {
            s.grade = v;
        }
        if let Some(v) = self.program {
            s.program = v;
        }
        if let Some(v) = self.status {
            s.status = v;
        }
        if let Some(v) = self.parent_name {
            s.parent_name = v;
        }
        if let Some(v) = self.phone {
            s.phone = v;
        }
        if self.address.is_some() {
            s.address = self.address;
        }
        if self.school.is_some() {
            s.school = self.school;
        }
        if self.email.is_some() {
            s.email = self.email;
        }
        if self.infaq_amount.is_some() {
            s.infaq_amount = self.infaq_amount;
        }
    }
}

/// Fields accepted when registering a new santri; the NIS is assigned.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub teacher_id: String,
    pub grade: String,
    pub program: Program,
    #[serde(default)]
    pub parent_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub infaq_amount: Option<i64>,
}

/// Mutation requests the grading flow sends back to whoever owns the
/// student directory.
pub trait DirectoryUpdates {
    fn save_exam_result(&mut self, student_id: &str, result: ExamResult)
        -> Result<(), StoreError>;
    fn update_student(&mut self, student_id: &str, patch: StudentPatch)
        -> Result<(), StoreError>;
}

/// Root application state: every collection the dashboard reads.
#[derive(Debug, Clone, Default)]
pub struct Store {
    branches: Vec<Branch>,
    users: Vec<User>,
    students: Vec<Student>,
    exam_results: BTreeMap<String, ExamResult>,
}

impl Store {
    pub fn new(seed: Seed) -> Self {
        Self {
            branches: seed.branches,
            users: seed.users,
            students: seed.students,
            exam_results: BTreeMap::new(),
        }
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn exam_results(&self) -> &BTreeMap<String, ExamResult> {
        &self.exam_results
    }

    pub fn exam_result(&self, student_id: &str) -> Option<&ExamResult> {
        self.exam_results.get(student_id)
    }

    pub fn find_user(&self, role: Role, username: &str) -> Option<&User> {
        let wanted = username.trim().to_ascii_lowercase();
        self.users.iter().find(|u| {
            u.role == role
                && u
                    .username
                    .as_deref()
                    .map(|n| n.to_ascii_lowercase() == wanted)
                    .unwrap_or(false)
        })
    }

    /// Teacher display name; unknown ids fall back to "Ustadz <id>".
    pub fn teacher_name(&self, teacher_id: &str) -> String {
        self.users
            .iter()
            .find(|u| u.id == teacher_id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| format!("Ustadz {}", teacher_id))
    }

    /// Smallest `NISnnn` above every numeric NIS already issued.
    pub fn next_nis(&self) -> String {
        let highest = self
            .students
            .iter()
            .filter_map(|s| s.id.strip_prefix("NIS"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("NIS{:03}", highest + 1)
    }

    pub fn add_student(&mut self, new: NewStudent) -> Result<String, StoreError> {
        if new.name.trim().is_empty() {
            return Err(StoreError::EmptyField("name"));
        }
        if new.teacher_id.trim().is_empty() {
            return Err(StoreError::EmptyField("teacherId"));
        }
        let branch = new
            .branch
            .filter(|b| !b.trim().is_empty())
            .or_else(|| self.branches.first().map(|b| b.name.clone()))
            .unwrap_or_else(|| "Pusat".to_string());

        let id = self.next_nis();
        self.students.push(Student {
            id: id.clone(),
            name: new.name.trim().to_string(),
            branch,
            teacher_id: new.teacher_id,
            grade: new.grade,
            program: new.program,
            status: StudentStatus::Active,
            parent_name: new.parent_name,
            phone: new.phone,
            address: new.address,
            school: new.school,
            email: new.email,
            infaq_amount: new.infaq_amount,
        });
        info!(student_id = %id, "student registered");
        Ok(id)
    }

    pub fn patch_student(&mut self, id: &str, patch: StudentPatch) -> Result<&Student, StoreError> {
        let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
        if blank(&patch.name) {
            return Err(StoreError::EmptyField("name"));
        }
        if blank(&patch.teacher_id) {
            return Err(StoreError::EmptyField("teacherId"));
        }
        if blank(&patch.branch) {
            return Err(StoreError::EmptyField("branch"));
        }
        let Some(student) = self.students.iter_mut().find(|s| s.id == id) else {
            return Err(StoreError::UnknownStudent(id.to_string()));
        };
        patch.apply(student);
        Ok(student)
    }
}

impl DirectoryUpdates for Store {
    fn save_exam_result(
        &mut self,
        student_id: &str,
        result: ExamResult,
    ) -> Result<(), StoreError> {
        if self.student(student_id).is_none() {
            return Err(StoreError::UnknownStudent(student_id.to_string()));
        }
        self.exam_results.insert(student_id.to_string(), result);
        Ok(())
    }

    fn update_student(&mut self, student_id: &str, patch: StudentPatch) -> Result<(), StoreError> {
        self.patch_student(student_id, patch).map(|_| ())
    }
}
