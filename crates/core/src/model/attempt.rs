use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::assessment::AssessmentKind;
use crate::model::ids::{AnswerId, AssessmentId, QuestionId, StudentId};

//
// ─── SUBMITTED RESPONSE ────────────────────────────────────────────────────────
//

/// One (left, right) selection of a matching submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingSelection {
    pub left_id: AnswerId,
    pub right_id: AnswerId,
}

/// A student's submitted answer to one question.
///
/// One sum type covers the three per-question detail shapes (single
/// answer, answer set, matching selections).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubmittedResponse {
    /// Single selected answer (classic question kinds).
    Single(AnswerId),
    /// Set of selected answers (multiple choice).
    Multiple(Vec<AnswerId>),
    /// Matching selections, one per left item answered.
    Matching(Vec<MatchingSelection>),
}

//
// ─── STUDENT ATTEMPT ───────────────────────────────────────────────────────────
//

/// One graded submission of a student against an assessment.
///
/// Attempt numbers are 1-based and strictly sequential per
/// (student, assessment). The score is computed fully before the attempt
/// is persisted, so it is never observable in a half-graded state.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentAttempt {
    pub id: Option<i64>,
    pub student_id: StudentId,
    pub assessment_id: AssessmentId,
    pub kind: AssessmentKind,
    pub number: u32,
    pub score: u32,
    pub submitted_at: DateTime<Utc>,
}

impl StudentAttempt {
    #[must_use]
    pub fn new(
        student_id: StudentId,
        assessment_id: AssessmentId,
        kind: AssessmentKind,
        number: u32,
        score: u32,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            student_id,
            assessment_id,
            kind,
            number,
            score,
            submitted_at,
        }
    }
}

//
// ─── ATTEMPT DETAIL ────────────────────────────────────────────────────────────
//

/// Per-question grading record of an attempt: what was submitted and what
/// it scored. The attempt's score is the sum of its detail scores.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptDetail {
    pub question_id: QuestionId,
    pub score: u32,
    pub response: SubmittedResponse,
}

impl AttemptDetail {
    #[must_use]
    pub fn new(question_id: QuestionId, score: u32, response: SubmittedResponse) -> Self {
        Self {
            question_id,
            score,
            response,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn attempt_creation_works() {
        let attempt = StudentAttempt::new(
            StudentId::new(7),
            AssessmentId::new(3),
            AssessmentKind::Exam,
            1,
            140,
            fixed_now(),
        );
        assert_eq!(attempt.id, None);
        assert_eq!(attempt.number, 1);
        assert_eq!(attempt.score, 140);
        assert_eq!(attempt.kind, AssessmentKind::Exam);
    }

    #[test]
    fn detail_holds_submitted_shape() {
        let detail = AttemptDetail::new(
            QuestionId::new(1),
            10,
            SubmittedResponse::Multiple(vec![AnswerId::new(1), AnswerId::new(2)]),
        );
        assert!(matches!(
            detail.response,
            SubmittedResponse::Multiple(ref ids) if ids.len() == 2
        ));
    }
}
