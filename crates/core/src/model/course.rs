use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CategoryId, CourseId, StudentId};

/// Upper bound for a student's cumulative course grade.
pub const MAX_COURSE_GRADE: u32 = 200;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("adding {added} to grade {current} would exceed {MAX_COURSE_GRADE}")]
    GradeOverflow { current: u32, added: u32 },

    #[error("invalid course status: {0}")]
    InvalidStatus(String),
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A published or draft course within a category.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    id: CourseId,
    category_id: CategoryId,
    title: String,
    published: bool,
}

impl Course {
    /// Creates a course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` for blank titles.
    pub fn new(
        id: CourseId,
        category_id: CategoryId,
        title: impl Into<String>,
        published: bool,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        Ok(Self {
            id,
            category_id,
            title,
            published,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn published(&self) -> bool {
        self.published
    }
}

//
// ─── COURSE STATUS ─────────────────────────────────────────────────────────────
//

/// Per-student course state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseStatus {
    InProgress,
    Completed,
}

impl CourseStatus {
    /// Storage encoding of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CourseStatus::InProgress => "in_progress",
            CourseStatus::Completed => "completed",
        }
    }

    /// Parses a stored status string.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidStatus` for unknown encodings.
    pub fn parse(s: &str) -> Result<Self, CourseError> {
        match s {
            "in_progress" => Ok(CourseStatus::InProgress),
            "completed" => Ok(CourseStatus::Completed),
            other => Err(CourseError::InvalidStatus(other.to_string())),
        }
    }
}

//
// ─── STUDENT COURSE ────────────────────────────────────────────────────────────
//

/// Per-(student, course) association: cumulative grade, progress percent
/// and completion state.
///
/// `grade` is additive and never reset; `progress` is recomputed after
/// every lesson-completion event over the lessons the student currently
/// has rows for (the set can grow when lessons are inserted later).
#[derive(Debug, Clone, PartialEq)]
pub struct StudentCourse {
    student_id: StudentId,
    course_id: CourseId,
    grade: u32,
    progress: u8,
    status: CourseStatus,
}

impl StudentCourse {
    /// Creates a fresh enrollment with zero grade and progress.
    #[must_use]
    pub fn new(student_id: StudentId, course_id: CourseId) -> Self {
        Self {
            student_id,
            course_id,
            grade: 0,
            progress: 0,
            status: CourseStatus::InProgress,
        }
    }

    /// Rebuilds an association from persisted fields.
    #[must_use]
    pub fn from_persisted(
        student_id: StudentId,
        course_id: CourseId,
        grade: u32,
        progress: u8,
        status: CourseStatus,
    ) -> Self {
        Self {
            student_id,
            course_id,
            grade,
            progress,
            status,
        }
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn grade(&self) -> u32 {
        self.grade
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    #[must_use]
    pub fn status(&self) -> CourseStatus {
        self.status
    }

    /// Adds points to the cumulative grade.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::GradeOverflow` when the sum would exceed
    /// `MAX_COURSE_GRADE`; the grade is left unchanged in that case.
    pub fn add_grade(&mut self, points: u32) -> Result<(), CourseError> {
        let next = self.grade + points;
        if next > MAX_COURSE_GRADE {
            return Err(CourseError::GradeOverflow {
                current: self.grade,
                added: points,
            });
        }
        self.grade = next;
        Ok(())
    }

    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }

    pub fn set_completed(&mut self) {
        self.status = CourseStatus::Completed;
    }
}

//
// ─── PROGRESS AND CATEGORY MATH ────────────────────────────────────────────────
//

/// Percentage of completed lessons, rounded to the nearest integer.
///
/// Returns 0 for an empty lesson set rather than dividing by zero.
#[must_use]
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }

    // Lesson counts are tiny; the f64 round trip is exact for them.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = (100.0 * completed as f64 / total as f64).round() as u8;
    pct
}

/// True when every published course of a category is among the student's
/// completed courses.
///
/// Subset check, not equality: completed courses from other categories are
/// irrelevant. A category with no published courses is never reported
/// complete.
#[must_use]
pub fn category_completed(published: &[CourseId], completed: &HashSet<CourseId>) -> bool {
    !published.is_empty() && published.iter().all(|id| completed.contains(id))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_accumulates_and_overflows_loudly() {
        let mut sc = StudentCourse::new(StudentId::new(1), CourseId::new(1));
        sc.add_grade(120).unwrap();
        sc.add_grade(80).unwrap();
        assert_eq!(sc.grade(), 200);

        let err = sc.add_grade(1).unwrap_err();
        assert!(matches!(
            err,
            CourseError::GradeOverflow {
                current: 200,
                added: 1
            }
        ));
        assert_eq!(sc.grade(), 200);
    }

    #[test]
    fn progress_percent_rounds_to_nearest() {
        assert_eq!(progress_percent(3, 5), 60);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(5, 5), 100);
        assert_eq!(progress_percent(0, 5), 0);
    }

    #[test]
    fn progress_percent_handles_empty_course() {
        assert_eq!(progress_percent(0, 0), 0);
    }

    #[test]
    fn category_completion_is_a_subset_check() {
        let published = vec![CourseId::new(1), CourseId::new(2), CourseId::new(3)];
        let mut completed: HashSet<CourseId> =
            [CourseId::new(1), CourseId::new(2)].into_iter().collect();

        assert!(!category_completed(&published, &completed));

        completed.insert(CourseId::new(3));
        // Extra completions outside the category do not matter.
        completed.insert(CourseId::new(99));
        assert!(category_completed(&published, &completed));
    }

    #[test]
    fn empty_category_is_never_complete() {
        let completed: HashSet<CourseId> = [CourseId::new(1)].into_iter().collect();
        assert!(!category_completed(&[], &completed));
    }

    #[test]
    fn status_encoding_round_trips() {
        assert_eq!(
            CourseStatus::parse("in_progress").unwrap(),
            CourseStatus::InProgress
        );
        assert_eq!(
            CourseStatus::parse("completed").unwrap(),
            CourseStatus::Completed
        );
        assert!(CourseStatus::parse("archived").is_err());
    }
}
