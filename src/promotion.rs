use serde::Serialize;

use crate::exam::{ExamCategory, PASSING_AVERAGE};
use crate::model::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionOption {
    pub label: &'static str,
    pub grade: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_program: Option<Program>,
}

const FROM_TAHSIN_1: &[PromotionOption] = &[PromotionOption {
    label: "Naik ke Level 2",
    grade: "Level 2",
    description: "Lanjut ke materi Tahsin Level 2",
    target_program: None,
}];

const FROM_TAHSIN_2: &[PromotionOption] = &[PromotionOption {
    label: "Naik ke Level 3",
    grade: "Level 3",
    description: "Lanjut ke materi Tajwid & Gharib (Level 3)",
    target_program: None,
}];

const FROM_TAHSIN_3: &[PromotionOption] = &[PromotionOption {
    label: "Lulus ke Tahfidz",
    grade: "Juz 30",
    description: "Wisuda Tahsin & Masuk Tahfidz",
    target_program: Some(Program::Tahfidz),
}];

/// Next-level choices after passing an exam in `category`.
pub fn next_level_options(category: ExamCategory) -> &'static [PromotionOption] {
    match category {
        ExamCategory::Tahsin1 => FROM_TAHSIN_1,
        ExamCategory::Tahsin2 => FROM_TAHSIN_2,
        ExamCategory::Tahsin3 => FROM_TAHSIN_3,
        ExamCategory::Tahfidz => &[],
    }
}

/// Promotion is only ever offered to Tahsin students with a passing average.
pub fn is_eligible(program: Program, average: Option<f64>) -> bool {
    program == Program::Tahsin && average.is_some_and(|a| a >= PASSING_AVERAGE)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum PromotionDecision {
    #[default]
    Unset,
    Eligible,
    Repeat,
    Continue {
        grade: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        program: Option<Program>,
    },
}

impl PromotionDecision {
    /// `CONTINUE` / `REPEAT` status as shown on the grading form.
    pub fn status(&self) -> Option<&'static str> {
        match self {
            PromotionDecision::Continue { .. } => Some("CONTINUE"),
            PromotionDecision::Repeat => Some("REPEAT"),
            PromotionDecision::Unset | PromotionDecision::Eligible => None,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, PromotionDecision::Unset)
    }

    /// Re-derive the decision after the average changed. Losing eligibility
    /// drops any selection; gaining it opens the choice.
    pub fn reconcile(self, program: Program, average: Option<f64>) -> Self {
        if !is_eligible(program, average) {
            return PromotionDecision::Unset;
        }
        match self {
            PromotionDecision::Unset => PromotionDecision::Eligible,
            other => other,
        }
    }

    pub fn advance(option: &PromotionOption) -> Self {
        PromotionDecision::Continue {
            grade: option.grade.to_string(),
            program: option.target_program,
        }
    }
}
