use course_core::model::{
    Answer, AnswerId, Assessment, AssessmentId, AssessmentKind, Course, CourseId, CourseStatus,
    Lesson, LessonId, LessonKind, LessonStatus, MatchingPair, Question, QuestionId, QuestionKind,
    StudentCourse, StudentId, StudentLesson, SubmittedResponse,
};
use sqlx::Row;

use crate::repository::{AttemptDetailRecord, AttemptRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn opt_i64_to_u32(field: &'static str, v: Option<i64>) -> Result<Option<u32>, StorageError> {
    v.map(|v| i64_to_u32(field, v)).transpose()
}

//
// ─── RESPONSE PAYLOAD ──────────────────────────────────────────────────────────
//

/// Submitted answers are persisted as a JSON column; the enum tag keeps
/// the three response shapes distinguishable on the way back out.
pub(crate) fn response_to_json(response: &SubmittedResponse) -> Result<String, StorageError> {
    serde_json::to_string(response).map_err(ser)
}

pub(crate) fn response_from_json(raw: &str) -> Result<SubmittedResponse, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

//
// ─── ROW MAPPERS ───────────────────────────────────────────────────────────────
//

pub(crate) fn map_assessment_row(row: &sqlx::sqlite::SqliteRow) -> Result<Assessment, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = AssessmentKind::parse(&kind_str).map_err(ser)?;

    Assessment::new(
        AssessmentId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        LessonId::new(i64_to_u64(
            "lesson_id",
            row.try_get("lesson_id").map_err(ser)?,
        )?),
        kind,
        i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        i64_to_u32("max_attempts", row.try_get("max_attempts").map_err(ser)?)?,
        opt_i64_to_u32("timer_secs", row.try_get("timer_secs").map_err(ser)?)?,
        opt_i64_to_u32("min_score", row.try_get("min_score").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = QuestionKind::parse(&kind_str).map_err(ser)?;

    Question::new(
        QuestionId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        AssessmentId::new(i64_to_u64(
            "assessment_id",
            row.try_get("assessment_id").map_err(ser)?,
        )?),
        row.try_get::<String, _>("text").map_err(ser)?,
        i64_to_u32("number", row.try_get("number").map_err(ser)?)?,
        i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        kind,
        row.try_get::<bool, _>("hidden").map_err(ser)?,
        row.try_get::<Option<String>, _>("image_path").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &sqlx::sqlite::SqliteRow) -> Result<Answer, StorageError> {
    Ok(Answer::new(
        AnswerId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        QuestionId::new(i64_to_u64(
            "question_id",
            row.try_get("question_id").map_err(ser)?,
        )?),
        row.try_get::<String, _>("text").map_err(ser)?,
        row.try_get::<bool, _>("is_correct").map_err(ser)?,
        row.try_get::<Option<String>, _>("image_path").map_err(ser)?,
    ))
}

pub(crate) fn map_pair_row(row: &sqlx::sqlite::SqliteRow) -> Result<MatchingPair, StorageError> {
    Ok(MatchingPair::new(
        QuestionId::new(i64_to_u64(
            "question_id",
            row.try_get("question_id").map_err(ser)?,
        )?),
        AnswerId::new(i64_to_u64("left_id", row.try_get("left_id").map_err(ser)?)?),
        row.try_get::<String, _>("left_text").map_err(ser)?,
        AnswerId::new(i64_to_u64(
            "right_id",
            row.try_get("right_id").map_err(ser)?,
        )?),
        row.try_get::<String, _>("right_text").map_err(ser)?,
    ))
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRecord, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;

    Ok(AttemptRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        student_id: StudentId::new(i64_to_u64(
            "student_id",
            row.try_get("student_id").map_err(ser)?,
        )?),
        assessment_id: AssessmentId::new(i64_to_u64(
            "assessment_id",
            row.try_get("assessment_id").map_err(ser)?,
        )?),
        kind: AssessmentKind::parse(&kind_str).map_err(ser)?,
        number: i64_to_u32("number", row.try_get("number").map_err(ser)?)?,
        score: i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
    })
}

pub(crate) fn map_detail_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AttemptDetailRecord, StorageError> {
    let raw: String = row.try_get("response").map_err(ser)?;

    Ok(AttemptDetailRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        attempt_id: Some(row.try_get("attempt_id").map_err(ser)?),
        question_id: QuestionId::new(i64_to_u64(
            "question_id",
            row.try_get("question_id").map_err(ser)?,
        )?),
        score: i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        response: response_from_json(&raw)?,
    })
}

pub(crate) fn map_lesson_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lesson, StorageError> {
    let kind_str: String = row.try_get("kind").map_err(ser)?;

    Lesson::new(
        LessonId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        CourseId::new(i64_to_u64(
            "course_id",
            row.try_get("course_id").map_err(ser)?,
        )?),
        i64_to_u32("number", row.try_get("number").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        LessonKind::parse(&kind_str).map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_student_lesson_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<StudentLesson, StorageError> {
    let status_str: String = row.try_get("status").map_err(ser)?;

    Ok(StudentLesson::from_persisted(
        StudentId::new(i64_to_u64(
            "student_id",
            row.try_get("student_id").map_err(ser)?,
        )?),
        LessonId::new(i64_to_u64(
            "lesson_id",
            row.try_get("lesson_id").map_err(ser)?,
        )?),
        LessonStatus::parse(&status_str).map_err(ser)?,
        opt_i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        i64_to_u32("attempt", row.try_get("attempt").map_err(ser)?)?,
    ))
}

pub(crate) fn map_course_row(row: &sqlx::sqlite::SqliteRow) -> Result<Course, StorageError> {
    Course::new(
        CourseId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        course_core::model::CategoryId::new(i64_to_u64(
            "category_id",
            row.try_get("category_id").map_err(ser)?,
        )?),
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<bool, _>("published").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_student_course_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<StudentCourse, StorageError> {
    let status_str: String = row.try_get("status").map_err(ser)?;
    let progress = i64_to_u32("progress", row.try_get("progress").map_err(ser)?)?;
    let progress = u8::try_from(progress)
        .map_err(|_| StorageError::Serialization(format!("invalid progress: {progress}")))?;

    Ok(StudentCourse::from_persisted(
        StudentId::new(i64_to_u64(
            "student_id",
            row.try_get("student_id").map_err(ser)?,
        )?),
        CourseId::new(i64_to_u64(
            "course_id",
            row.try_get("course_id").map_err(ser)?,
        )?),
        i64_to_u32("grade", row.try_get("grade").map_err(ser)?)?,
        progress,
        CourseStatus::parse(&status_str).map_err(ser)?,
    ))
}
