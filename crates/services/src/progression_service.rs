use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use course_core::model::{
    CourseId, Lesson, LessonId, StudentCourse, StudentId, StudentLesson,
};
use course_core::progression::{
    LessonSlot, ProgressionError, advance_after_completion, enroll_statuses,
    place_inserted_lesson,
};
use storage::repository::{CourseRepository, LessonRepository};

use crate::error::ProgressionServiceError;

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Drives the per-student lesson unlock state machine.
///
/// Every operation loads the student's full course snapshot, computes the
/// transitions with the pure state machine, and persists them atomically:
/// either all affected rows move or none do.
pub struct ProgressionService {
    lessons: Arc<dyn LessonRepository>,
    courses: Arc<dyn CourseRepository>,
}

impl ProgressionService {
    #[must_use]
    pub fn new(lessons: Arc<dyn LessonRepository>, courses: Arc<dyn CourseRepository>) -> Self {
        Self { lessons, courses }
    }

    /// Enrolls a student: creates the course association and one row per
    /// lesson, then unlocks the course head.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionServiceError::Storage` with `NotFound` for an
    /// unknown course.
    pub async fn enroll(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<(), ProgressionServiceError> {
        self.courses.get_course(course_id).await?;
        self.courses
            .upsert_student_course(&StudentCourse::new(student_id, course_id))
            .await?;

        let lessons = self.lessons.lessons_for_course(course_id).await?;
        for lesson in &lessons {
            self.lessons
                .upsert_student_lesson(&StudentLesson::new(student_id, lesson.id()))
                .await?;
        }

        let slots: Vec<LessonSlot> = lessons
            .iter()
            .map(|l| LessonSlot::from_records(l, &StudentLesson::new(student_id, l.id())))
            .collect();
        let changes = enroll_statuses(&slots);
        self.lessons
            .apply_status_changes(student_id, &changes)
            .await?;

        info!(student = %student_id, course = %course_id, lessons = lessons.len(), "student enrolled");
        Ok(())
    }

    /// Marks a lesson completed and advances the unlock scan.
    ///
    /// `score` carries the attempt score for test/exam lessons and is
    /// `None` for confirmed lectures; a scored completion also counts one
    /// attempt on the lesson row. The completion and every follow-on
    /// transition are persisted in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionServiceError::Progression` when a lesson of the
    /// course has no row for this student (data integrity, nothing is
    /// changed).
    pub async fn confirm_lesson_completion(
        &self,
        student_id: StudentId,
        lesson_id: LessonId,
        score: Option<u32>,
    ) -> Result<(), ProgressionServiceError> {
        let lesson = self.lessons.get_lesson(lesson_id).await?;
        let slots = self.snapshot(student_id, lesson.course_id()).await?;

        let changes = advance_after_completion(&slots, lesson.number());
        self.lessons
            .complete_and_apply(student_id, lesson_id, score, score.is_some(), &changes)
            .await?;

        info!(
            student = %student_id,
            lesson = %lesson_id,
            unlocked = changes.len(),
            "lesson completed"
        );
        Ok(())
    }

    /// Places a lesson newly inserted into a running course for every
    /// enrolled student.
    ///
    /// The lesson (with its final number; existing lessons already
    /// renumbered by the authoring layer) must have been persisted before
    /// this is called. Each student's placement is computed from their own
    /// snapshot and applied atomically per student.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionServiceError::Progression` for head insertions
    /// and broken snapshots.
    pub async fn place_inserted_lesson(
        &self,
        lesson: &Lesson,
    ) -> Result<(), ProgressionServiceError> {
        let students = self.courses.students_in_course(lesson.course_id()).await?;

        for student_id in students {
            self.lessons
                .upsert_student_lesson(&StudentLesson::new(student_id, lesson.id()))
                .await?;

            let slots = self.snapshot(student_id, lesson.course_id()).await?;
            let changes = place_inserted_lesson(&slots, lesson.number())?;
            self.lessons
                .apply_status_changes(student_id, &changes)
                .await?;
        }

        info!(lesson = %lesson.id(), course = %lesson.course_id(), "inserted lesson placed");
        Ok(())
    }

    /// The student's current view of a course, one slot per lesson.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::MissingStudentLesson` when a lesson has
    /// no row for this student.
    pub async fn snapshot(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Vec<LessonSlot>, ProgressionServiceError> {
        let lessons = self.lessons.lessons_for_course(course_id).await?;
        let rows = self.lessons.student_lessons(student_id, course_id).await?;
        let by_lesson: HashMap<LessonId, &StudentLesson> =
            rows.iter().map(|r| (r.lesson_id(), r)).collect();

        let mut slots = Vec::with_capacity(lessons.len());
        for lesson in &lessons {
            let row = by_lesson.get(&lesson.id()).copied().ok_or_else(|| {
                error!(
                    student = %student_id,
                    lesson = %lesson.id(),
                    "student lesson row missing"
                );
                ProgressionError::MissingStudentLesson {
                    lesson_id: lesson.id(),
                }
            })?;
            slots.push(LessonSlot::from_records(lesson, row));
        }
        Ok(slots)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{CategoryId, Course, LessonKind, LessonStatus};
    use storage::repository::InMemoryRepository;

    async fn seed_course(repo: &InMemoryRepository, kinds: &[LessonKind]) {
        let course = Course::new(CourseId::new(1), CategoryId::new(1), "Course", true).unwrap();
        repo.upsert_course(&course).await.unwrap();
        for (i, kind) in kinds.iter().enumerate() {
            let number = u32::try_from(i + 1).unwrap();
            let lesson = Lesson::new(
                LessonId::new(u64::from(number)),
                CourseId::new(1),
                number,
                format!("Lesson {number}"),
                *kind,
            )
            .unwrap();
            repo.upsert_lesson(&lesson).await.unwrap();
        }
    }

    fn service(repo: &InMemoryRepository) -> ProgressionService {
        ProgressionService::new(Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    async fn status_of(
        service: &ProgressionService,
        student: StudentId,
        lesson: u64,
    ) -> LessonStatus {
        service
            .snapshot(student, CourseId::new(1))
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.lesson_id == LessonId::new(lesson))
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn enrollment_unlocks_head_and_blocks_behind_gate() {
        let repo = InMemoryRepository::new();
        seed_course(
            &repo,
            &[
                LessonKind::Lecture,
                LessonKind::Lecture,
                LessonKind::Test,
                LessonKind::Lecture,
            ],
        )
        .await;

        let service = service(&repo);
        let student = StudentId::new(1);
        service.enroll(student, CourseId::new(1)).await.unwrap();

        assert_eq!(status_of(&service, student, 1).await, LessonStatus::Active);
        assert_eq!(
            status_of(&service, student, 2).await,
            LessonStatus::Available
        );
        assert_eq!(status_of(&service, student, 3).await, LessonStatus::Blocked);
        assert_eq!(status_of(&service, student, 4).await, LessonStatus::Blocked);
    }

    #[tokio::test]
    async fn completion_advances_and_halts_at_gate() {
        let repo = InMemoryRepository::new();
        seed_course(
            &repo,
            &[
                LessonKind::Lecture,
                LessonKind::Lecture,
                LessonKind::Test,
                LessonKind::Lecture,
            ],
        )
        .await;

        let service = service(&repo);
        let student = StudentId::new(1);
        service.enroll(student, CourseId::new(1)).await.unwrap();

        service
            .confirm_lesson_completion(student, LessonId::new(1), None)
            .await
            .unwrap();

        assert_eq!(
            status_of(&service, student, 1).await,
            LessonStatus::Completed
        );
        assert_eq!(status_of(&service, student, 2).await, LessonStatus::Active);
        // The test lesson and everything behind it stay untouched.
        assert_eq!(status_of(&service, student, 3).await, LessonStatus::Blocked);
        assert_eq!(status_of(&service, student, 4).await, LessonStatus::Blocked);
    }

    #[tokio::test]
    async fn scored_completion_records_attempt_and_score() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, &[LessonKind::Test, LessonKind::Lecture]).await;

        let service = service(&repo);
        let student = StudentId::new(1);
        service.enroll(student, CourseId::new(1)).await.unwrap();

        service
            .confirm_lesson_completion(student, LessonId::new(1), Some(85))
            .await
            .unwrap();

        let rows = repo.student_lessons(student, CourseId::new(1)).await.unwrap();
        let first = rows
            .iter()
            .find(|r| r.lesson_id() == LessonId::new(1))
            .unwrap();
        assert_eq!(first.status(), LessonStatus::Completed);
        assert_eq!(first.score(), Some(85));
        assert_eq!(first.attempt(), 1);
        assert_eq!(status_of(&service, student, 2).await, LessonStatus::Active);
    }

    #[tokio::test]
    async fn inserted_test_after_completed_blocks_followers() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, &[LessonKind::Lecture, LessonKind::Lecture]).await;

        let service = service(&repo);
        let student = StudentId::new(1);
        service.enroll(student, CourseId::new(1)).await.unwrap();
        service
            .confirm_lesson_completion(student, LessonId::new(1), None)
            .await
            .unwrap();

        // Renumber the old lesson 2 to make room, then insert a test at 2.
        let moved = Lesson::new(
            LessonId::new(2),
            CourseId::new(1),
            3,
            "Lesson 2",
            LessonKind::Lecture,
        )
        .unwrap();
        repo.upsert_lesson(&moved).await.unwrap();
        let inserted = Lesson::new(
            LessonId::new(10),
            CourseId::new(1),
            2,
            "Checkpoint",
            LessonKind::Test,
        )
        .unwrap();
        repo.upsert_lesson(&inserted).await.unwrap();

        service.place_inserted_lesson(&inserted).await.unwrap();

        assert_eq!(status_of(&service, student, 10).await, LessonStatus::Active);
        assert_eq!(status_of(&service, student, 2).await, LessonStatus::Blocked);
    }

    #[tokio::test]
    async fn missing_student_row_fails_loudly() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, &[LessonKind::Lecture, LessonKind::Lecture]).await;

        let service = service(&repo);
        let student = StudentId::new(1);
        service.enroll(student, CourseId::new(1)).await.unwrap();

        // A lesson added without placement leaves a hole in the snapshot.
        let orphan = Lesson::new(
            LessonId::new(5),
            CourseId::new(1),
            3,
            "Orphan",
            LessonKind::Lecture,
        )
        .unwrap();
        repo.upsert_lesson(&orphan).await.unwrap();

        let err = service
            .confirm_lesson_completion(student, LessonId::new(1), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProgressionServiceError::Progression(ProgressionError::MissingStudentLesson {
                lesson_id
            }) if lesson_id == LessonId::new(5)
        ));

        // Nothing moved.
        let rows = repo.student_lessons(student, CourseId::new(1)).await.unwrap();
        let first = rows
            .iter()
            .find(|r| r.lesson_id() == LessonId::new(1))
            .unwrap();
        assert_eq!(first.status(), LessonStatus::Active);
    }
}
