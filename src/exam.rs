use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Program;

/// Lowest average that still counts as a pass ("Cukup"). Inclusive.
pub const PASSING_AVERAGE: f64 = 70.0;

/// Score entry that means "not graded yet".
pub const UNGRADED: u8 = 0;

/// Selectable scores, highest first, as offered by the grading form.
pub const SCORE_OPTIONS: [u8; 9] = [100, 95, 90, 85, 80, 75, 70, 65, 60];

const TAHSIN_1_FIELDS: &[&str] = &["Ketelitian Huruf", "Ketelitian Harokat"];
const TAHSIN_2_FIELDS: &[&str] = &[
    "Ketelitian Huruf",
    "Ketelitian Harokat",
    "Kelancaran (Panjang/Pendek)",
    "Dengung",
    "Sukun & Tasydid",
];
const TAHSIN_3_FIELDS: &[&str] = &[
    "Ketelitian Huruf",
    "Ketelitian Harokat",
    "Kelancaran (Panjang/Pendek)",
    "Dengung",
    "Sukun & Tasydid",
    "Tajwid",
    "Gharib",
];
const TAHFIDZ_FIELDS: &[&str] = &[
    "Kelancaran Hafalan",
    "Kelancaran (Panjang/Pendek)",
    "Dengung",
    "Sukun & Tasydid",
    "Tajwid",
    "Gharib",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExamCategory {
    #[serde(rename = "TAHSIN_1")]
    Tahsin1,
    #[serde(rename = "TAHSIN_2")]
    Tahsin2,
    #[serde(rename = "TAHSIN_3")]
    Tahsin3,
    #[serde(rename = "TAHFIDZ")]
    Tahfidz,
}

impl ExamCategory {
    pub const ALL: [ExamCategory; 4] = [
        ExamCategory::Tahsin1,
        ExamCategory::Tahsin2,
        ExamCategory::Tahsin3,
        ExamCategory::Tahfidz,
    ];

    pub fn code(self) -> &'static str {
        match self {
            ExamCategory::Tahsin1 => "TAHSIN_1",
            ExamCategory::Tahsin2 => "TAHSIN_2",
            ExamCategory::Tahsin3 => "TAHSIN_3",
            ExamCategory::Tahfidz => "TAHFIDZ",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn label(self) -> &'static str {
        match self {
            ExamCategory::Tahsin1 => "Tahsin Level 1",
            ExamCategory::Tahsin2 => "Tahsin Level 2",
            ExamCategory::Tahsin3 => "Tahsin Level 3",
            ExamCategory::Tahfidz => "Tahfidz",
        }
    }

    /// Graded fields in form order.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            ExamCategory::Tahsin1 => TAHSIN_1_FIELDS,
            ExamCategory::Tahsin2 => TAHSIN_2_FIELDS,
            ExamCategory::Tahsin3 => TAHSIN_3_FIELDS,
            ExamCategory::Tahfidz => TAHFIDZ_FIELDS,
        }
    }

    pub fn program(self) -> Program {
        match self {
            ExamCategory::Tahfidz => Program::Tahfidz,
            _ => Program::Tahsin,
        }
    }

    pub fn has_field(self, field: &str) -> bool {
        self.fields().contains(&field)
    }

    /// Categories a student of `program` may be examined in.
    pub fn offered_for(program: Program) -> Vec<ExamCategory> {
        Self::ALL
            .into_iter()
            .filter(|c| c.program() == program)
            .collect()
    }

    /// The sheet a student at `grade` sits next. Unknown Tahsin grades start
    /// at Level 1.
    pub fn default_for(program: Program, grade: &str) -> Self {
        match program {
            Program::Tahfidz => ExamCategory::Tahfidz,
            Program::Tahsin => match grade.trim() {
                "Level 2" => ExamCategory::Tahsin2,
                "Level 3" => ExamCategory::Tahsin3,
                _ => ExamCategory::Tahsin1,
            },
        }
    }
}

/// Accepts exactly the values the grading form can produce.
pub fn parse_score(raw: i64) -> Option<u8> {
    if raw == UNGRADED as i64 {
        return Some(UNGRADED);
    }
    SCORE_OPTIONS.into_iter().find(|s| *s as i64 == raw)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldScore {
    Ungraded,
    Scored(u8),
}

impl FieldScore {
    pub fn from_entry(entry: Option<u8>) -> Self {
        match entry {
            None | Some(UNGRADED) => FieldScore::Ungraded,
            Some(v) => FieldScore::Scored(v),
        }
    }
}

/// 1-decimal rounding: `Int(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreAverage {
    /// `None` until at least one field carries a score.
    pub average: Option<f64>,
    pub graded_count: usize,
    pub ungraded_count: usize,
}

/// Mean over exactly `fields`. Ungraded fields still count in the
/// denominator with a value of 0, so a half-filled sheet averages low.
/// Entries for fields outside `fields` are ignored.
pub fn score_average(fields: &[&str], scores: &BTreeMap<String, u8>) -> ScoreAverage {
    let mut sum: u32 = 0;
    let mut graded_count = 0;
    let mut ungraded_count = 0;

    for field in fields {
        match FieldScore::from_entry(scores.get(*field).copied()) {
            FieldScore::Ungraded => ungraded_count += 1,
            FieldScore::Scored(v) => {
                graded_count += 1;
                sum += v as u32;
            }
        }
    }

    let average = if fields.is_empty() || graded_count == 0 {
        None
    } else {
        Some(round_off_1_decimal(sum as f64 / fields.len() as f64))
    };

    ScoreAverage {
        average,
        graded_count,
        ungraded_count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    Kurang,
    Cukup,
    Baik,
    SangatBaik,
}

impl Rating {
    pub fn from_average(average: f64) -> Self {
        if average >= 90.0 {
            Rating::SangatBaik
        } else if average >= 80.0 {
            Rating::Baik
        } else if average >= PASSING_AVERAGE {
            Rating::Cukup
        } else {
            Rating::Kurang
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Kurang => "Kurang",
            Rating::Cukup => "Cukup",
            Rating::Baik => "Baik",
            Rating::SangatBaik => "Sangat Baik",
        }
    }
}

/// Display label for an optional average; "-" when nothing is graded.
pub fn rating_label(average: Option<f64>) -> &'static str {
    average
        .map(|a| Rating::from_average(a).label())
        .unwrap_or("-")
}
