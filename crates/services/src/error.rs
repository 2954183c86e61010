//! Shared error types for the services crate.

use thiserror::Error;

use course_core::grading::GradingError;
use course_core::model::{AssessmentError, CourseError, QuestionId};
use course_core::progression::ProgressionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::dispatch::DispatchError;

/// Errors emitted by `AttemptService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    /// Rejected before any write: the student has used every attempt.
    #[error("no attempts remaining (limit {limit})")]
    MaxAttemptsExceeded { limit: u32 },

    #[error("question {question_id} is not part of the assessment")]
    UnknownQuestion { question_id: QuestionId },

    #[error(transparent)]
    Grading(#[from] GradingError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressionServiceError {
    #[error(transparent)]
    Progression(#[from] ProgressionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CompletionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionError {
    #[error(transparent)]
    Course(#[from] CourseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Errors emitted by `AuthoringService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthoringError {
    #[error(
        "assessment {assessment_id} is configured for {configured} points \
         but its questions sum to {actual}"
    )]
    ScoreMismatch {
        assessment_id: course_core::model::AssessmentId,
        configured: u32,
        actual: u32,
    },

    #[error(transparent)]
    Assessment(#[from] AssessmentError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
