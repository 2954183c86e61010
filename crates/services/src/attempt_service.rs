use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use course_core::grading::{AnswerKey, round_score, score_question};
use course_core::model::{
    AssessmentId, LessonId, Question, QuestionId, QuestionKind, StudentAttempt, StudentId,
    SubmittedResponse,
};
use course_core::time::Clock;
use storage::repository::{
    AssessmentRepository, AttemptDetailRecord, AttemptRecord, AttemptRepository,
    QuestionRepository,
};

use crate::error::SubmissionError;

//
// ─── SUBMISSION TYPES ──────────────────────────────────────────────────────────
//

/// One answered question of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question_id: QuestionId,
    pub response: SubmittedResponse,
}

impl QuestionResponse {
    #[must_use]
    pub fn new(question_id: QuestionId, response: SubmittedResponse) -> Self {
        Self {
            question_id,
            response,
        }
    }
}

/// What the caller gets back for a graded submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FinalizedAttempt {
    pub attempt_id: i64,
    pub number: u32,
    pub score: u32,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Orchestrates a full submission: attempt-limit check, per-question
/// grading, and the single transactional write of the attempt with its
/// detail rows.
///
/// The attempt score is computed fully in memory before anything is
/// persisted; a rejected or failed submission leaves no partial rows
/// behind, and a retry re-derives the next attempt number from storage.
pub struct AttemptService {
    clock: Clock,
    assessments: Arc<dyn AssessmentRepository>,
    questions: Arc<dyn QuestionRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        assessments: Arc<dyn AssessmentRepository>,
        questions: Arc<dyn QuestionRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            assessments,
            questions,
            attempts,
        }
    }

    /// Grades and records one submission against the assessment attached
    /// to `lesson_id`.
    ///
    /// # Errors
    ///
    /// - `SubmissionError::MaxAttemptsExceeded` when the attempt limit is
    ///   reached; nothing is written in that case.
    /// - `SubmissionError::UnknownQuestion` for a response that targets a
    ///   question outside the assessment.
    /// - `SubmissionError::Grading` for authoring-data faults; the
    ///   submission is aborted, never silently scored zero.
    /// - `SubmissionError::Storage` for lookup and persistence failures,
    ///   including `NotFound` when the lesson has no assessment.
    pub async fn submit_attempt(
        &self,
        student_id: StudentId,
        lesson_id: LessonId,
        responses: &[QuestionResponse],
    ) -> Result<FinalizedAttempt, SubmissionError> {
        let assessment = self.assessments.assessment_for_lesson(lesson_id).await?;

        let last = self
            .attempts
            .last_attempt_number(student_id, assessment.id())
            .await?;
        let number = last.unwrap_or(0) + 1;
        if number > assessment.max_attempts() {
            warn!(
                student = %student_id,
                assessment = %assessment.id(),
                limit = assessment.max_attempts(),
                "submission rejected, no attempts remaining"
            );
            return Err(SubmissionError::MaxAttemptsExceeded {
                limit: assessment.max_attempts(),
            });
        }

        let questions = self
            .questions
            .questions_for_assessment(assessment.id())
            .await?;
        let by_id: HashMap<QuestionId, &Question> =
            questions.iter().map(|q| (q.id(), q)).collect();

        let mut total: u32 = 0;
        let mut details = Vec::with_capacity(responses.len());

        for answered in responses {
            let question = by_id.get(&answered.question_id).copied().ok_or(
                SubmissionError::UnknownQuestion {
                    question_id: answered.question_id,
                },
            )?;

            let key = self.answer_key(question).await?;
            let raw = score_question(question, &key, &answered.response).map_err(|e| {
                error!(
                    student = %student_id,
                    question = %question.id(),
                    error = %e,
                    "grading aborted on integrity fault"
                );
                e
            })?;

            let score = round_score(raw);
            total += score;
            details.push(AttemptDetailRecord {
                id: None,
                attempt_id: None,
                question_id: question.id(),
                score,
                response: answered.response.clone(),
            });
        }

        let record = AttemptRecord {
            id: None,
            student_id,
            assessment_id: assessment.id(),
            kind: assessment.kind(),
            number,
            score: total,
            submitted_at: self.clock.now(),
        };
        let attempt_id = self.attempts.insert_attempt(&record, &details).await?;

        info!(
            student = %student_id,
            assessment = %assessment.id(),
            number,
            score = total,
            "attempt finalized"
        );

        Ok(FinalizedAttempt {
            attempt_id,
            number,
            score: total,
        })
    }

    async fn answer_key(&self, question: &Question) -> Result<AnswerKey, SubmissionError> {
        match question.kind() {
            QuestionKind::Matching => {
                let pairs = self
                    .questions
                    .matching_pairs_for_question(question.id())
                    .await?;
                Ok(AnswerKey::from_pairs(&pairs))
            }
            _ => {
                let answers = self.questions.answers_for_question(question.id()).await?;
                Ok(AnswerKey::from_answers(question, &answers)?)
            }
        }
    }

    /// Attempt history for a student and assessment, ordered by number.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Storage` on lookup failure.
    pub async fn attempt_history(
        &self,
        student_id: StudentId,
        assessment_id: AssessmentId,
    ) -> Result<Vec<StudentAttempt>, SubmissionError> {
        let records = self.attempts.attempts_for(student_id, assessment_id).await?;
        Ok(records
            .into_iter()
            .map(AttemptRecord::into_attempt)
            .collect())
    }

    /// Per-question detail of one attempt.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Storage` with `NotFound` for an unknown
    /// attempt id.
    pub async fn attempt_detail(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<course_core::model::AttemptDetail>, SubmissionError> {
        let records = self.attempts.details_for_attempt(attempt_id).await?;
        Ok(records
            .into_iter()
            .map(AttemptDetailRecord::into_detail)
            .collect())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
