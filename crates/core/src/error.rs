use thiserror::Error;

use crate::grading::GradingError;
use crate::model::{AssessmentError, CourseError, LessonError, QuestionError};
use crate::progression::ProgressionError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Progression(#[from] ProgressionError),
}
