use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use course_core::model::{
    Assessment, AssessmentId, AssessmentKind, CourseId, MAX_ASSESSMENT_SCORE,
    reconciled_exam_score,
};
use storage::repository::{
    AssessmentRepository, LessonRepository, QuestionRepository, StorageError,
};

use crate::error::AuthoringError;

//
// ─── CORRECTION REPORT ─────────────────────────────────────────────────────────
//

/// One exam score the reconciliation pass had to reduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreCorrection {
    pub assessment_id: AssessmentId,
    pub old_score: u32,
    pub new_score: u32,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Authoring-time consistency guard over a course's assessments.
///
/// After a course's questions are authored, every assessment's configured
/// score must equal the sum of its question scores, and the exam score
/// plus all test scores must fit the 200-point course budget. Exams that
/// overflow the budget are automatically reduced; grading later relies on
/// these invariants holding.
pub struct AuthoringService {
    assessments: Arc<dyn AssessmentRepository>,
    questions: Arc<dyn QuestionRepository>,
    lessons: Arc<dyn LessonRepository>,
}

impl AuthoringService {
    #[must_use]
    pub fn new(
        assessments: Arc<dyn AssessmentRepository>,
        questions: Arc<dyn QuestionRepository>,
        lessons: Arc<dyn LessonRepository>,
    ) -> Self {
        Self {
            assessments,
            questions,
            lessons,
        }
    }

    /// Validates question-score sums for every assessment of the course
    /// and reduces overflowing exam scores. Returns the corrections made.
    ///
    /// # Errors
    ///
    /// - `AuthoringError::ScoreMismatch` when an assessment's questions do
    ///   not sum to its configured score.
    /// - `AuthoringError::Assessment` when a corrected score leaves the
    ///   valid range entirely.
    /// - `AuthoringError::Storage` for lookup and persistence failures.
    pub async fn reconcile_course_scores(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ScoreCorrection>, AuthoringError> {
        let mut tests_total: u32 = 0;
        let mut exams: Vec<Assessment> = Vec::new();

        for lesson in self.lessons.lessons_for_course(course_id).await? {
            let assessment = match self.assessments.assessment_for_lesson(lesson.id()).await {
                Ok(a) => a,
                Err(StorageError::NotFound) => continue,
                Err(e) => return Err(e.into()),
            };

            self.validate_question_sum(&assessment).await?;

            match assessment.kind() {
                AssessmentKind::Test => tests_total += assessment.score(),
                AssessmentKind::Exam => exams.push(assessment),
            }
        }

        let mut corrections = Vec::new();
        for exam in exams {
            let corrected = reconciled_exam_score(exam.score(), tests_total);
            if corrected != exam.score() {
                warn!(
                    assessment = %exam.id(),
                    old = exam.score(),
                    new = corrected,
                    budget = MAX_ASSESSMENT_SCORE,
                    "exam score exceeds course budget, reducing"
                );
                let correction = ScoreCorrection {
                    assessment_id: exam.id(),
                    old_score: exam.score(),
                    new_score: corrected,
                };
                let reduced = exam.with_score(corrected)?;
                self.assessments.upsert_assessment(&reduced).await?;
                corrections.push(correction);
            }
        }

        Ok(corrections)
    }

    async fn validate_question_sum(&self, assessment: &Assessment) -> Result<(), AuthoringError> {
        let questions = self
            .questions
            .questions_for_assessment(assessment.id())
            .await?;
        let actual: u32 = questions.iter().map(|q| q.score()).sum();

        if actual != assessment.score() {
            return Err(AuthoringError::ScoreMismatch {
                assessment_id: assessment.id(),
                configured: assessment.score(),
                actual,
            });
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
