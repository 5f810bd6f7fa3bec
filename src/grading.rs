//! One grading dialog: a single student's exam sheet being edited, the
//! derived average and the promotion choice. Nothing reaches the directory
//! until [`GradingSession::commit`]; dropping the session discards it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::exam::{parse_score, rating_label, score_average, ExamCategory};
use crate::model::{ExamResult, Program, Student};
use crate::promotion::{next_level_options, PromotionDecision, PromotionOption};
use crate::store::{DirectoryUpdates, StoreError, StudentPatch};

#[derive(Debug, Error, PartialEq)]
pub enum GradingError {
    #[error("exam results are read-only for this role")]
    ReadOnly,
    #[error("{category} is not offered for {program} students")]
    CategoryNotOffered {
        category: &'static str,
        program: &'static str,
    },
    #[error("{field} is not graded in {category}")]
    UnknownField {
        field: String,
        category: &'static str,
    },
    #[error("score {0} is not selectable (0 or 60-100 in steps of 5)")]
    InvalidScore(i64),
    #[error("promotion is not available for the current average")]
    NotEligible,
    #[error("no promotion option at index {0}")]
    NoSuchOption(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct GradingSession {
    id: Uuid,
    student_id: String,
    program: Program,
    read_only: bool,
    category: ExamCategory,
    scores: BTreeMap<String, u8>,
    notes: String,
    average: Option<f64>,
    date: Option<DateTime<Utc>>,
    decision: PromotionDecision,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub name: &'static str,
    pub score: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionView {
    pub decision: PromotionDecision,
    pub status: Option<&'static str>,
    pub options: &'static [PromotionOption],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingView {
    pub session_id: String,
    pub student_id: String,
    pub program: Program,
    pub read_only: bool,
    #[serde(rename = "type")]
    pub category: ExamCategory,
    pub type_label: &'static str,
    pub available_types: Vec<ExamCategory>,
    pub fields: Vec<FieldView>,
    pub graded_count: usize,
    pub ungraded_count: usize,
    pub average: Option<f64>,
    pub rating: &'static str,
    pub notes: String,
    /// Absent when the student cannot be promoted right now.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub saved: bool,
    pub promoted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExamResult>,
    pub message: String,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl GradingSession {
    /// Opens the sheet for `student`, continuing from the saved result when
    /// it still fits. A result from another program, or from a level below
    /// the student's current grade, predates a promotion and is not reused.
    pub fn open(student: &Student, existing: Option<&ExamResult>, read_only: bool) -> Self {
        let expected = ExamCategory::default_for(student.program, &student.grade);
        let existing = existing
            .filter(|r| r.category.program() == student.program && r.category >= expected);
        let (category, scores, notes) = match existing {
            Some(r) => (r.category, r.scores.clone(), r.notes.clone()),
            None => (expected, BTreeMap::new(), String::new()),
        };
        let average = score_average(category.fields(), &scores).average;
        let date = existing
            .and_then(|r| r.date.as_deref())
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc));

        Self {
            id: Uuid::new_v4(),
            student_id: student.id.clone(),
            program: student.program,
            read_only,
            category,
            scores,
            notes,
            average,
            date,
            decision: PromotionDecision::Unset.reconcile(student.program, average),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn ensure_writable(&self) -> Result<(), GradingError> {
        if self.read_only {
            return Err(GradingError::ReadOnly);
        }
        Ok(())
    }

    fn recompute(&mut self) {
        self.average = score_average(self.category.fields(), &self.scores).average;
        let previous = std::mem::take(&mut self.decision);
        self.decision = previous.reconcile(self.program, self.average);
    }

    /// Switching category starts a fresh sheet.
    pub fn set_category(&mut self, category: ExamCategory) -> Result<(), GradingError> {
        self.ensure_writable()?;
        if category.program() != self.program {
            return Err(GradingError::CategoryNotOffered {
                category: category.code(),
                program: self.program.as_str(),
            });
        }
        self.category = category;
        self.scores.clear();
        self.decision = PromotionDecision::Unset;
        self.recompute();
        Ok(())
    }

    pub fn set_score(
        &mut self,
        field: &str,
        raw: i64,
        now: DateTime<Utc>,
    ) -> Result<(), GradingError> {
        self.ensure_writable()?;
        let Some(&field) = self.category.fields().iter().find(|f| **f == field) else {
            return Err(GradingError::UnknownField {
                field: field.to_string(),
                category: self.category.code(),
            });
        };
        let score = parse_score(raw).ok_or(GradingError::InvalidScore(raw))?;
        self.scores.insert(field.to_string(), score);
        self.date = Some(now);
        self.recompute();
        debug!(
            student_id = %self.student_id,
            field,
            score,
            average = ?self.average,
            "exam score updated"
        );
        Ok(())
    }

    pub fn set_notes(&mut self, notes: &str) -> Result<(), GradingError> {
        self.ensure_writable()?;
        self.notes = notes.to_string();
        Ok(())
    }

    /// Options on offer right now; empty unless the sheet is eligible.
    pub fn promotion_options(&self) -> &'static [PromotionOption] {
        if self.decision.is_open() {
            next_level_options(self.category)
        } else {
            &[]
        }
    }

    pub fn choose_repeat(&mut self) -> Result<(), GradingError> {
        self.ensure_writable()?;
        if !self.decision.is_open() {
            return Err(GradingError::NotEligible);
        }
        self.decision = PromotionDecision::Repeat;
        Ok(())
    }

    pub fn choose_advance(&mut self, index: usize) -> Result<(), GradingError> {
        self.ensure_writable()?;
        if !self.decision.is_open() {
            return Err(GradingError::NotEligible);
        }
        let option = self
            .promotion_options()
            .get(index)
            .ok_or(GradingError::NoSuchOption(index))?;
        self.decision = PromotionDecision::advance(option);
        Ok(())
    }

    pub fn view(&self) -> GradingView {
        let tally = score_average(self.category.fields(), &self.scores);
        let fields = self
            .category
            .fields()
            .iter()
            .copied()
            .map(|f| FieldView {
                name: f,
                score: self.scores.get(f).copied(),
            })
            .collect();
        let promotion = self.decision.is_open().then(|| PromotionView {
            decision: self.decision.clone(),
            status: self.decision.status(),
            options: self.promotion_options(),
        });
        GradingView {
            session_id: self.id.to_string(),
            student_id: self.student_id.clone(),
            program: self.program,
            read_only: self.read_only,
            category: self.category,
            type_label: self.category.label(),
            available_types: ExamCategory::offered_for(self.program),
            fields,
            graded_count: tally.graded_count,
            ungraded_count: tally.ungraded_count,
            average: self.average,
            rating: rating_label(self.average),
            notes: self.notes.clone(),
            promotion,
        }
    }

    fn to_result(&self, now: DateTime<Utc>) -> ExamResult {
        // Only the active category's fields are ever stored.
        let scores = self
            .scores
            .iter()
            .filter(|(f, _)| self.category.has_field(f))
            .map(|(f, s)| (f.clone(), *s))
            .collect();
        ExamResult {
            student_id: self.student_id.clone(),
            category: self.category,
            scores,
            average: self.average,
            notes: self.notes.clone(),
            date: Some(timestamp(self.date.unwrap_or(now))),
        }
    }

    /// Saves the sheet and, for a chosen promotion, moves the student to the
    /// next level. Read-only sessions close without touching anything.
    pub fn commit<D: DirectoryUpdates>(
        self,
        directory: &mut D,
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome, GradingError> {
        if self.read_only {
            return Ok(CommitOutcome {
                saved: false,
                promoted: false,
                result: None,
                message: String::new(),
            });
        }

        let result = self.to_result(now);
        directory.save_exam_result(&self.student_id, result.clone())?;

        let promotion = match (&self.decision, self.program) {
            (PromotionDecision::Continue { grade, program }, Program::Tahsin) => {
                Some((grade.clone(), *program))
            }
            _ => None,
        };

        let Some((grade, program)) = promotion else {
            info!(student_id = %self.student_id, category = self.category.code(), "exam result saved");
            return Ok(CommitOutcome {
                saved: true,
                promoted: false,
                result: Some(result),
                message: "Data Nilai Ujian berhasil disimpan.".to_string(),
            });
        };

        directory.update_student(&self.student_id, StudentPatch::promotion(&grade, program))?;
        info!(
            student_id = %self.student_id,
            grade = %grade,
            program = ?program,
            "exam result saved with promotion"
        );

        let mut message = format!("Data tersimpan. Santri naik ke {}", grade);
        if let Some(p) = program {
            message.push_str(&format!(" dan pindah program ke {}", p.as_str()));
        }
        Ok(CommitOutcome {
            saved: true,
            promoted: true,
            result: Some(result),
            message,
        })
    }
}
