use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, StudentId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("lesson number must be >= 1")]
    InvalidNumber,

    #[error("invalid lesson kind: {0}")]
    InvalidKind(String),

    #[error("invalid lesson status: {0}")]
    InvalidStatus(String),
}

//
// ─── LESSON KIND ───────────────────────────────────────────────────────────────
//

/// What a lesson carries: plain material, or a gradable gate.
///
/// Test and exam lessons are gates: they stop the automatic unlock scan
/// until explicitly completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonKind {
    Lecture,
    Test,
    Exam,
}

impl LessonKind {
    /// True for lessons that block automatic forward unlocking.
    #[must_use]
    pub fn is_gate(self) -> bool {
        matches!(self, LessonKind::Test | LessonKind::Exam)
    }

    /// Storage encoding of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonKind::Lecture => "lecture",
            LessonKind::Test => "test",
            LessonKind::Exam => "exam",
        }
    }

    /// Parses a stored kind string.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::InvalidKind` for unknown encodings.
    pub fn parse(s: &str) -> Result<Self, LessonError> {
        match s {
            "lecture" => Ok(LessonKind::Lecture),
            "test" => Ok(LessonKind::Test),
            "exam" => Ok(LessonKind::Exam),
            other => Err(LessonError::InvalidKind(other.to_string())),
        }
    }
}

//
// ─── LESSON STATUS ─────────────────────────────────────────────────────────────
//

/// Per-student unlock state of one lesson.
///
/// `New` only appears on freshly inserted rows before placement runs;
/// steady progression moves lessons between `Available`, `Active`,
/// `Blocked` and the terminal `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonStatus {
    New,
    Available,
    Active,
    Blocked,
    Completed,
}

impl LessonStatus {
    /// Storage encoding of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonStatus::New => "new",
            LessonStatus::Available => "available",
            LessonStatus::Active => "active",
            LessonStatus::Blocked => "blocked",
            LessonStatus::Completed => "completed",
        }
    }

    /// Parses a stored status string.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::InvalidStatus` for unknown encodings.
    pub fn parse(s: &str) -> Result<Self, LessonError> {
        match s {
            "new" => Ok(LessonStatus::New),
            "available" => Ok(LessonStatus::Available),
            "active" => Ok(LessonStatus::Active),
            "blocked" => Ok(LessonStatus::Blocked),
            "completed" => Ok(LessonStatus::Completed),
            other => Err(LessonError::InvalidStatus(other.to_string())),
        }
    }

    /// `Completed` is terminal per lesson instance.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, LessonStatus::Completed)
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A course lesson, ordered by `number` within its course.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    id: LessonId,
    course_id: CourseId,
    number: u32,
    title: String,
    kind: LessonKind,
}

impl Lesson {
    /// Creates a lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` for blank titles and
    /// `LessonError::InvalidNumber` for number zero (lesson numbers are
    /// 1-based).
    pub fn new(
        id: LessonId,
        course_id: CourseId,
        number: u32,
        title: impl Into<String>,
        kind: LessonKind,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        if number == 0 {
            return Err(LessonError::InvalidNumber);
        }

        Ok(Self {
            id,
            course_id,
            number,
            title,
            kind,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> LessonKind {
        self.kind
    }
}

//
// ─── STUDENT LESSON ────────────────────────────────────────────────────────────
//

/// Per-(student, lesson) progress record driving the unlock state machine.
///
/// Exactly one of these exists per enrolled student and lesson; rows are
/// created at enrollment or when a lesson is inserted into a running
/// course.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentLesson {
    student_id: StudentId,
    lesson_id: LessonId,
    status: LessonStatus,
    score: Option<u32>,
    attempt: u32,
}

impl StudentLesson {
    /// Creates a fresh record in `New` status with zero attempts.
    #[must_use]
    pub fn new(student_id: StudentId, lesson_id: LessonId) -> Self {
        Self {
            student_id,
            lesson_id,
            status: LessonStatus::New,
            score: None,
            attempt: 0,
        }
    }

    /// Rebuilds a record from persisted fields.
    #[must_use]
    pub fn from_persisted(
        student_id: StudentId,
        lesson_id: LessonId,
        status: LessonStatus,
        score: Option<u32>,
        attempt: u32,
    ) -> Self {
        Self {
            student_id,
            lesson_id,
            status,
            score,
            attempt,
        }
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn status(&self) -> LessonStatus {
        self.status
    }

    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn set_status(&mut self, status: LessonStatus) {
        self.status = status;
    }

    /// Marks the lesson completed with the achieved score.
    pub fn complete(&mut self, score: Option<u32>) {
        self.status = LessonStatus::Completed;
        self.score = score;
    }

    /// Records one more attempt against the lesson's assessment.
    pub fn record_attempt(&mut self) {
        self.attempt += 1;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_kinds_are_test_and_exam() {
        assert!(!LessonKind::Lecture.is_gate());
        assert!(LessonKind::Test.is_gate());
        assert!(LessonKind::Exam.is_gate());
    }

    #[test]
    fn status_encoding_round_trips() {
        for status in [
            LessonStatus::New,
            LessonStatus::Available,
            LessonStatus::Active,
            LessonStatus::Blocked,
            LessonStatus::Completed,
        ] {
            assert_eq!(LessonStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(LessonStatus::parse("paused").is_err());
    }

    #[test]
    fn lesson_rejects_zero_number() {
        let err = Lesson::new(
            LessonId::new(1),
            CourseId::new(1),
            0,
            "Intro",
            LessonKind::Lecture,
        )
        .unwrap_err();
        assert!(matches!(err, LessonError::InvalidNumber));
    }

    #[test]
    fn student_lesson_completion_is_terminal() {
        let mut sl = StudentLesson::new(StudentId::new(1), LessonId::new(1));
        assert_eq!(sl.status(), LessonStatus::New);
        assert_eq!(sl.attempt(), 0);

        sl.record_attempt();
        sl.complete(Some(85));

        assert!(sl.status().is_terminal());
        assert_eq!(sl.score(), Some(85));
        assert_eq!(sl.attempt(), 1);
    }
}
