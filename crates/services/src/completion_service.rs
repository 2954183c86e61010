use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::info;

use course_core::model::{CategoryId, CourseId, StudentId, category_completed, progress_percent};
use storage::repository::{CourseRepository, LessonRepository};

use crate::dispatch::{CertificateIssuer, TaskDispatcher};
use crate::error::CompletionError;

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// What a completion recompute changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    pub progress: u8,
    pub grade: u32,
    pub course_completed: bool,
    pub category_completed: bool,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Recomputes course progress and cumulative grade after every
/// lesson-completion event, and triggers certificate issuance when a
/// course (and possibly its whole category) is done.
///
/// Certificate issuance is idempotent per (student, course) and
/// (student, category); the dispatcher delivers follow-up tasks
/// at-least-once, so a retried completion event is harmless.
pub struct CompletionService {
    lessons: Arc<dyn LessonRepository>,
    courses: Arc<dyn CourseRepository>,
    dispatcher: Arc<dyn TaskDispatcher>,
    certificates: Arc<dyn CertificateIssuer>,
}

impl CompletionService {
    #[must_use]
    pub fn new(
        lessons: Arc<dyn LessonRepository>,
        courses: Arc<dyn CourseRepository>,
        dispatcher: Arc<dyn TaskDispatcher>,
        certificates: Arc<dyn CertificateIssuer>,
    ) -> Self {
        Self {
            lessons,
            courses,
            dispatcher,
            certificates,
        }
    }

    /// Applies one lesson-completion event to the course association:
    /// adds the lesson score to the cumulative grade, recomputes the
    /// progress percentage, and on full completion marks the course done,
    /// issues the certificate and checks the category.
    ///
    /// # Errors
    ///
    /// - `CompletionError::Course` when adding the score would push the
    ///   grade past its cap.
    /// - `CompletionError::Storage` for lookup and persistence failures.
    /// - `CompletionError::Dispatch` when a collaborator call fails.
    pub async fn record_lesson_completion(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        score: Option<u32>,
    ) -> Result<CompletionOutcome, CompletionError> {
        let mut association = self.courses.get_student_course(student_id, course_id).await?;

        if let Some(points) = score {
            association.add_grade(points)?;
        }

        let rows = self.lessons.student_lessons(student_id, course_id).await?;
        let total = rows.len();
        let completed = rows.iter().filter(|r| r.status().is_terminal()).count();
        association.set_progress(progress_percent(completed, total));

        let course_completed = total > 0 && completed == total;
        if course_completed {
            association.set_completed();
        }
        self.courses.upsert_student_course(&association).await?;

        let mut category_done = false;
        if course_completed {
            info!(
                student = %student_id,
                course = %course_id,
                grade = association.grade(),
                "course completed"
            );
            self.certificates
                .issue_course_certificate(student_id, course_id)
                .await?;
            self.dispatcher
                .enqueue(
                    "course_completed",
                    json!({
                        "student_id": student_id.value(),
                        "course_id": course_id.value(),
                        "grade": association.grade(),
                    }),
                )
                .await?;

            let course = self.courses.get_course(course_id).await?;
            category_done = self
                .check_category_completion(student_id, course.category_id())
                .await?;
            if category_done {
                self.certificates
                    .issue_category_certificate(student_id, course.category_id())
                    .await?;
                self.dispatcher
                    .enqueue(
                        "category_completed",
                        json!({
                            "student_id": student_id.value(),
                            "category_id": course.category_id().value(),
                        }),
                    )
                    .await?;
            }
        }

        Ok(CompletionOutcome {
            progress: association.progress(),
            grade: association.grade(),
            course_completed,
            category_completed: category_done,
        })
    }

    /// True when every published course of the category is among the
    /// student's completed courses.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::Storage` on lookup failure.
    pub async fn check_category_completion(
        &self,
        student_id: StudentId,
        category_id: CategoryId,
    ) -> Result<bool, CompletionError> {
        let published = self
            .courses
            .published_courses_in_category(category_id)
            .await?;
        let completed: HashSet<CourseId> = self
            .courses
            .completed_courses(student_id)
            .await?
            .into_iter()
            .collect();
        Ok(category_completed(&published, &completed))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
