use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::exam::ExamCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Program {
    Tahsin,
    Tahfidz,
}

impl Program {
    pub const ALL: [Program; 2] = [Program::Tahfidz, Program::Tahsin];

    pub fn as_str(self) -> &'static str {
        match self {
            Program::Tahsin => "Tahsin",
            Program::Tahfidz => "Tahfidz",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Tahsin" => Some(Program::Tahsin),
            "Tahfidz" => Some(Program::Tahfidz),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "active" => Some(StudentStatus::Active),
            "inactive" => Some(StudentStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Teacher,
    Staff,
    Guardian,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "TEACHER" => Some(Role::Teacher),
            "STAFF" => Some(Role::Staff),
            "GUARDIAN" => Some(Role::Guardian),
            _ => None,
        }
    }
}

/// A santri record. `id` is the NIS and never changes once assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub branch: String,
    pub teacher_id: String,
    pub grade: String,
    pub program: Program,
    pub status: StudentStatus,
    #[serde(default)]
    pub parent_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infaq_amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_name: Option<String>,
}

/// Saved exam outcome for one student. `average` is `None` while no field
/// has been graded, which keeps "not graded yet" apart from a real low score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub student_id: String,
    #[serde(rename = "type")]
    pub category: ExamCategory,
    pub scores: BTreeMap<String, u8>,
    pub average: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}
