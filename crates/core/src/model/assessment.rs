use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AssessmentId, LessonId};

/// Upper bound for an assessment's configured score and for the cumulative
/// course grade.
pub const MAX_ASSESSMENT_SCORE: u32 = 200;

/// Attempt limit applied when the author does not configure one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("assessment score must be in 1..={MAX_ASSESSMENT_SCORE}, got {provided}")]
    InvalidScore { provided: u32 },

    #[error("attempt limit must be > 0")]
    InvalidAttemptLimit,

    #[error("exam timer must be > 0 seconds")]
    InvalidTimer,

    #[error("invalid assessment kind: {0}")]
    InvalidKind(String),
}

//
// ─── ASSESSMENT KIND ───────────────────────────────────────────────────────────
//

/// Distinguishes the two gradable lesson attachments.
///
/// Tests and exams share one grading and attempt pipeline; the kind only
/// selects which attempt table the records land in and whether timer and
/// minimum-score settings apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssessmentKind {
    Test,
    Exam,
}

impl AssessmentKind {
    /// Storage encoding of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentKind::Test => "test",
            AssessmentKind::Exam => "exam",
        }
    }

    /// Parses a stored kind string.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::InvalidKind` for unknown encodings.
    pub fn parse(s: &str) -> Result<Self, AssessmentError> {
        match s {
            "test" => Ok(AssessmentKind::Test),
            "exam" => Ok(AssessmentKind::Exam),
            other => Err(AssessmentError::InvalidKind(other.to_string())),
        }
    }
}

//
// ─── ASSESSMENT ────────────────────────────────────────────────────────────────
//

/// A gradable test or exam attached to exactly one lesson.
///
/// The sum of the owned questions' scores must equal `score`; that
/// invariant is enforced when the course is published, not per grading
/// call.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    id: AssessmentId,
    lesson_id: LessonId,
    kind: AssessmentKind,
    score: u32,
    max_attempts: u32,
    timer_secs: Option<u32>,
    min_score: Option<u32>,
}

impl Assessment {
    /// Creates a test with the default attempt limit.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::InvalidScore` when `score` is outside
    /// `1..=MAX_ASSESSMENT_SCORE`.
    pub fn test(id: AssessmentId, lesson_id: LessonId, score: u32) -> Result<Self, AssessmentError> {
        Self::new(
            id,
            lesson_id,
            AssessmentKind::Test,
            score,
            DEFAULT_MAX_ATTEMPTS,
            None,
            None,
        )
    }

    /// Creates an exam with a timer and a minimum passing score.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::InvalidScore` for an out-of-range score and
    /// `AssessmentError::InvalidTimer` for a zero timer.
    pub fn exam(
        id: AssessmentId,
        lesson_id: LessonId,
        score: u32,
        timer_secs: u32,
        min_score: u32,
    ) -> Result<Self, AssessmentError> {
        Self::new(
            id,
            lesson_id,
            AssessmentKind::Exam,
            score,
            DEFAULT_MAX_ATTEMPTS,
            Some(timer_secs),
            Some(min_score),
        )
    }

    /// Creates an assessment with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an `AssessmentError` if any bound is violated.
    pub fn new(
        id: AssessmentId,
        lesson_id: LessonId,
        kind: AssessmentKind,
        score: u32,
        max_attempts: u32,
        timer_secs: Option<u32>,
        min_score: Option<u32>,
    ) -> Result<Self, AssessmentError> {
        if score == 0 || score > MAX_ASSESSMENT_SCORE {
            return Err(AssessmentError::InvalidScore { provided: score });
        }
        if max_attempts == 0 {
            return Err(AssessmentError::InvalidAttemptLimit);
        }
        if timer_secs == Some(0) {
            return Err(AssessmentError::InvalidTimer);
        }

        Ok(Self {
            id,
            lesson_id,
            kind,
            score,
            max_attempts,
            timer_secs,
            min_score,
        })
    }

    #[must_use]
    pub fn id(&self) -> AssessmentId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn kind(&self) -> AssessmentKind {
        self.kind
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn timer_secs(&self) -> Option<u32> {
        self.timer_secs
    }

    #[must_use]
    pub fn min_score(&self) -> Option<u32> {
        self.min_score
    }

    /// Replaces the configured score, keeping the same bounds.
    ///
    /// Used by authoring-time reconciliation when an exam's score has to be
    /// reduced to keep the course total at `MAX_ASSESSMENT_SCORE`.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::InvalidScore` when out of range.
    pub fn with_score(mut self, score: u32) -> Result<Self, AssessmentError> {
        if score == 0 || score > MAX_ASSESSMENT_SCORE {
            return Err(AssessmentError::InvalidScore { provided: score });
        }
        self.score = score;
        Ok(self)
    }
}

//
// ─── AUTHORING RECONCILIATION ──────────────────────────────────────────────────
//

/// Corrected exam score given the total of all test scores in the course.
///
/// If `exam_score + tests_total` overflows `MAX_ASSESSMENT_SCORE`, the exam
/// score is reduced by the overflow. The result can reach zero when the
/// tests alone already fill the budget; callers decide whether that is an
/// authoring error.
#[must_use]
pub fn reconciled_exam_score(exam_score: u32, tests_total: u32) -> u32 {
    let total = exam_score + tests_total;
    if total > MAX_ASSESSMENT_SCORE {
        exam_score.saturating_sub(total - MAX_ASSESSMENT_SCORE)
    } else {
        exam_score
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
