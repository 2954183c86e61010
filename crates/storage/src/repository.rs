use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    Answer, Assessment, AssessmentId, AssessmentKind, AttemptDetail, Course, CourseId,
    CourseStatus, Lesson, LessonId, MatchingPair, Question, QuestionId, StudentAttempt,
    StudentCourse, StudentId, StudentLesson, SubmittedResponse,
};
use course_core::progression::StatusChange;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted shape of a student attempt.
///
/// This mirrors the domain `StudentAttempt` so repositories can assign the
/// database row id without leaking storage concerns into the domain layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub id: Option<i64>,
    pub student_id: StudentId,
    pub assessment_id: AssessmentId,
    pub kind: AssessmentKind,
    pub number: u32,
    pub score: u32,
    pub submitted_at: DateTime<Utc>,
}

impl AttemptRecord {
    #[must_use]
    pub fn from_attempt(attempt: &StudentAttempt) -> Self {
        Self {
            id: attempt.id,
            student_id: attempt.student_id,
            assessment_id: attempt.assessment_id,
            kind: attempt.kind,
            number: attempt.number,
            score: attempt.score,
            submitted_at: attempt.submitted_at,
        }
    }

    /// Converts the record back into a domain `StudentAttempt`.
    #[must_use]
    pub fn into_attempt(self) -> StudentAttempt {
        StudentAttempt {
            id: self.id,
            student_id: self.student_id,
            assessment_id: self.assessment_id,
            kind: self.kind,
            number: self.number,
            score: self.score,
            submitted_at: self.submitted_at,
        }
    }
}

/// Persisted per-question grading record, linked to its attempt row.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptDetailRecord {
    pub id: Option<i64>,
    pub attempt_id: Option<i64>,
    pub question_id: QuestionId,
    pub score: u32,
    pub response: SubmittedResponse,
}

impl AttemptDetailRecord {
    #[must_use]
    pub fn from_detail(detail: &AttemptDetail) -> Self {
        Self {
            id: None,
            attempt_id: None,
            question_id: detail.question_id,
            score: detail.score,
            response: detail.response.clone(),
        }
    }

    #[must_use]
    pub fn into_detail(self) -> AttemptDetail {
        AttemptDetail {
            question_id: self.question_id,
            score: self.score,
            response: self.response,
        }
    }
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for assessments (tests and exams).
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Persist or update an assessment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the assessment cannot be stored.
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError>;

    /// Fetch an assessment by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError>;

    /// Fetch the assessment attached to a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the lesson has none.
    async fn assessment_for_lesson(&self, lesson_id: LessonId) -> Result<Assessment, StorageError>;
}

/// Repository contract for authored question data.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    async fn upsert_answer(&self, answer: &Answer) -> Result<(), StorageError>;

    async fn upsert_matching_pair(&self, pair: &MatchingPair) -> Result<(), StorageError>;

    /// All questions of an assessment, ordered by question number.
    async fn questions_for_assessment(
        &self,
        assessment_id: AssessmentId,
    ) -> Result<Vec<Question>, StorageError>;

    /// All stored answer options of a question.
    async fn answers_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<Answer>, StorageError>;

    /// All authored matching pairs of a question.
    async fn matching_pairs_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<MatchingPair>, StorageError>;
}

/// Repository contract for attempt history.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Highest attempt number recorded for the pair, if any.
    async fn last_attempt_number(
        &self,
        student_id: StudentId,
        assessment_id: AssessmentId,
    ) -> Result<Option<u32>, StorageError>;

    /// Inserts the attempt row and all its detail rows in one transaction
    /// and returns the attempt row id. No partial attempt is ever visible.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the attempt number is already
    /// taken for this student and assessment.
    async fn insert_attempt(
        &self,
        attempt: &AttemptRecord,
        details: &[AttemptDetailRecord],
    ) -> Result<i64, StorageError>;

    /// Attempt history for a student and assessment, ordered by number.
    async fn attempts_for(
        &self,
        student_id: StudentId,
        assessment_id: AssessmentId,
    ) -> Result<Vec<AttemptRecord>, StorageError>;

    /// Fetch one attempt by row id.
    async fn get_attempt(&self, attempt_id: i64) -> Result<AttemptRecord, StorageError>;

    /// Per-question detail rows of an attempt.
    async fn details_for_attempt(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<AttemptDetailRecord>, StorageError>;
}

/// Repository contract for lessons and per-student lesson state.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError>;

    /// All lessons of a course, ordered by number.
    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;

    /// The student's rows for every lesson of a course.
    async fn student_lessons(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Vec<StudentLesson>, StorageError>;

    async fn upsert_student_lesson(&self, record: &StudentLesson) -> Result<(), StorageError>;

    /// Applies a batch of status transitions atomically: all rows move
    /// together or none do.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any targeted row is missing;
    /// nothing is changed in that case.
    async fn apply_status_changes(
        &self,
        student_id: StudentId,
        changes: &[StatusChange],
    ) -> Result<(), StorageError>;

    /// Marks a lesson completed (status, score, attempt count) and applies
    /// the follow-on status changes in the same transaction.
    async fn complete_and_apply(
        &self,
        student_id: StudentId,
        lesson_id: LessonId,
        score: Option<u32>,
        count_attempt: bool,
        changes: &[StatusChange],
    ) -> Result<(), StorageError>;
}

/// Repository contract for courses and per-student course associations.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError>;

    /// Ids of the published courses in a category.
    async fn published_courses_in_category(
        &self,
        category_id: course_core::model::CategoryId,
    ) -> Result<Vec<CourseId>, StorageError>;

    async fn get_student_course(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<StudentCourse, StorageError>;

    async fn upsert_student_course(&self, record: &StudentCourse) -> Result<(), StorageError>;

    /// Ids of every course the student has completed.
    async fn completed_courses(&self, student_id: StudentId) -> Result<Vec<CourseId>, StorageError>;

    /// Students currently enrolled in a course.
    async fn students_in_course(&self, course_id: CourseId) -> Result<Vec<StudentId>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<InMemoryState>>,
}

#[derive(Default)]
struct InMemoryState {
    assessments: HashMap<AssessmentId, Assessment>,
    questions: HashMap<QuestionId, Question>,
    answers: HashMap<QuestionId, Vec<Answer>>,
    pairs: HashMap<QuestionId, Vec<MatchingPair>>,
    attempts: Vec<AttemptRecord>,
    details: HashMap<i64, Vec<AttemptDetailRecord>>,
    next_attempt_id: i64,
    lessons: HashMap<LessonId, Lesson>,
    student_lessons: HashMap<(StudentId, LessonId), StudentLesson>,
    courses: HashMap<CourseId, Course>,
    student_courses: HashMap<(StudentId, CourseId), StudentCourse>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryRepository {
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.assessments.insert(assessment.id(), assessment.clone());
        Ok(())
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError> {
        let guard = self.lock()?;
        guard.assessments.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn assessment_for_lesson(&self, lesson_id: LessonId) -> Result<Assessment, StorageError> {
        let guard = self.lock()?;
        guard
            .assessments
            .values()
            .find(|a| a.lesson_id() == lesson_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.questions.insert(question.id(), question.clone());
        Ok(())
    }

    async fn upsert_answer(&self, answer: &Answer) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard.answers.entry(answer.question_id()).or_default();
        slot.retain(|a| a.id() != answer.id());
        slot.push(answer.clone());
        Ok(())
    }

    async fn upsert_matching_pair(&self, pair: &MatchingPair) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard.pairs.entry(pair.question_id()).or_default();
        slot.retain(|p| p.left_id() != pair.left_id());
        slot.push(pair.clone());
        Ok(())
    }

    async fn questions_for_assessment(
        &self,
        assessment_id: AssessmentId,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<Question> = guard
            .questions
            .values()
            .filter(|q| q.assessment_id() == assessment_id)
            .cloned()
            .collect();
        out.sort_by_key(Question::number);
        Ok(out)
    }

    async fn answers_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<Answer>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.answers.get(&question_id).cloned().unwrap_or_default())
    }

    async fn matching_pairs_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<MatchingPair>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.pairs.get(&question_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn last_attempt_number(
        &self,
        student_id: StudentId,
        assessment_id: AssessmentId,
    ) -> Result<Option<u32>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .attempts
            .iter()
            .filter(|a| a.student_id == student_id && a.assessment_id == assessment_id)
            .map(|a| a.number)
            .max())
    }

    async fn insert_attempt(
        &self,
        attempt: &AttemptRecord,
        details: &[AttemptDetailRecord],
    ) -> Result<i64, StorageError> {
        let mut guard = self.lock()?;

        let duplicate = guard.attempts.iter().any(|a| {
            a.student_id == attempt.student_id
                && a.assessment_id == attempt.assessment_id
                && a.number == attempt.number
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }

        guard.next_attempt_id += 1;
        let id = guard.next_attempt_id;

        let mut stored = attempt.clone();
        stored.id = Some(id);
        guard.attempts.push(stored);

        let rows: Vec<AttemptDetailRecord> = details
            .iter()
            .cloned()
            .map(|mut d| {
                d.attempt_id = Some(id);
                d
            })
            .collect();
        guard.details.insert(id, rows);

        Ok(id)
    }

    async fn attempts_for(
        &self,
        student_id: StudentId,
        assessment_id: AssessmentId,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<AttemptRecord> = guard
            .attempts
            .iter()
            .filter(|a| a.student_id == student_id && a.assessment_id == assessment_id)
            .cloned()
            .collect();
        out.sort_by_key(|a| a.number);
        Ok(out)
    }

    async fn get_attempt(&self, attempt_id: i64) -> Result<AttemptRecord, StorageError> {
        let guard = self.lock()?;
        guard
            .attempts
            .iter()
            .find(|a| a.id == Some(attempt_id))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn details_for_attempt(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<AttemptDetailRecord>, StorageError> {
        let guard = self.lock()?;
        guard
            .details
            .get(&attempt_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.lessons.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError> {
        let guard = self.lock()?;
        guard.lessons.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<Lesson> = guard
            .lessons
            .values()
            .filter(|l| l.course_id() == course_id)
            .cloned()
            .collect();
        out.sort_by_key(Lesson::number);
        Ok(out)
    }

    async fn student_lessons(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Vec<StudentLesson>, StorageError> {
        let guard = self.lock()?;
        let lesson_ids: Vec<LessonId> = guard
            .lessons
            .values()
            .filter(|l| l.course_id() == course_id)
            .map(Lesson::id)
            .collect();
        Ok(lesson_ids
            .into_iter()
            .filter_map(|lid| guard.student_lessons.get(&(student_id, lid)).cloned())
            .collect())
    }

    async fn upsert_student_lesson(&self, record: &StudentLesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .student_lessons
            .insert((record.student_id(), record.lesson_id()), record.clone());
        Ok(())
    }

    async fn apply_status_changes(
        &self,
        student_id: StudentId,
        changes: &[StatusChange],
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;

        // Validate the whole batch before touching any row.
        for change in changes {
            if !guard
                .student_lessons
                .contains_key(&(student_id, change.lesson_id))
            {
                return Err(StorageError::NotFound);
            }
        }
        for change in changes {
            if let Some(row) = guard.student_lessons.get_mut(&(student_id, change.lesson_id)) {
                row.set_status(change.status);
            }
        }
        Ok(())
    }

    async fn complete_and_apply(
        &self,
        student_id: StudentId,
        lesson_id: LessonId,
        score: Option<u32>,
        count_attempt: bool,
        changes: &[StatusChange],
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;

        if !guard.student_lessons.contains_key(&(student_id, lesson_id)) {
            return Err(StorageError::NotFound);
        }
        for change in changes {
            if !guard
                .student_lessons
                .contains_key(&(student_id, change.lesson_id))
            {
                return Err(StorageError::NotFound);
            }
        }

        if let Some(row) = guard.student_lessons.get_mut(&(student_id, lesson_id)) {
            if count_attempt {
                row.record_attempt();
            }
            row.complete(score);
        }
        for change in changes {
            if let Some(row) = guard.student_lessons.get_mut(&(student_id, change.lesson_id)) {
                row.set_status(change.status);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError> {
        let guard = self.lock()?;
        guard.courses.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn published_courses_in_category(
        &self,
        category_id: course_core::model::CategoryId,
    ) -> Result<Vec<CourseId>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<CourseId> = guard
            .courses
            .values()
            .filter(|c| c.category_id() == category_id && c.published())
            .map(Course::id)
            .collect();
        out.sort();
        Ok(out)
    }

    async fn get_student_course(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<StudentCourse, StorageError> {
        let guard = self.lock()?;
        guard
            .student_courses
            .get(&(student_id, course_id))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn upsert_student_course(&self, record: &StudentCourse) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .student_courses
            .insert((record.student_id(), record.course_id()), record.clone());
        Ok(())
    }

    async fn completed_courses(&self, student_id: StudentId) -> Result<Vec<CourseId>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<CourseId> = guard
            .student_courses
            .values()
            .filter(|sc| sc.student_id() == student_id && sc.status() == CourseStatus::Completed)
            .map(StudentCourse::course_id)
            .collect();
        out.sort();
        Ok(out)
    }

    async fn students_in_course(&self, course_id: CourseId) -> Result<Vec<StudentId>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<StudentId> = guard
            .student_courses
            .values()
            .filter(|sc| sc.course_id() == course_id)
            .map(StudentCourse::student_id)
            .collect();
        out.sort();
        Ok(out)
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub assessments: Arc<dyn AssessmentRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub courses: Arc<dyn CourseRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            assessments: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            courses: Arc::new(repo),
        }
    }
}
