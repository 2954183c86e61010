use course_core::model::{CourseId, Lesson, LessonId, LessonStatus, StudentId, StudentLesson};
use course_core::progression::StatusChange;
use sqlx::{Sqlite, Transaction};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_lesson_row, map_student_lesson_row},
};
use crate::repository::{LessonRepository, StorageError};

async fn apply_changes_tx(
    tx: &mut Transaction<'_, Sqlite>,
    student_id: i64,
    changes: &[StatusChange],
) -> Result<(), StorageError> {
    for change in changes {
        let res = sqlx::query(
            r"
                UPDATE student_lessons
                SET status = ?3
                WHERE student_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(student_id)
        .bind(id_i64("lesson_id", change.lesson_id.value())?)
        .bind(change.status.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        // A missing row aborts the whole batch; the transaction is rolled
        // back on drop.
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO lessons (id, course_id, number, title, kind)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    course_id = excluded.course_id,
                    number = excluded.number,
                    title = excluded.title,
                    kind = excluded.kind
            ",
        )
        .bind(id_i64("id", lesson.id().value())?)
        .bind(id_i64("course_id", lesson.course_id().value())?)
        .bind(i64::from(lesson.number()))
        .bind(lesson.title().to_owned())
        .bind(lesson.kind().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Lesson, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, course_id, number, title, kind
                FROM lessons
                WHERE id = ?1
            ",
        )
        .bind(id_i64("id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_lesson_row(&row)
    }

    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, course_id, number, title, kind
                FROM lessons
                WHERE course_id = ?1
                ORDER BY number ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_lesson_row(&row)?);
        }
        Ok(out)
    }

    async fn student_lessons(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Vec<StudentLesson>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT sl.student_id, sl.lesson_id, sl.status, sl.score, sl.attempt
                FROM student_lessons sl
                JOIN lessons l ON l.id = sl.lesson_id
                WHERE sl.student_id = ?1 AND l.course_id = ?2
                ORDER BY l.number ASC
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_student_lesson_row(&row)?);
        }
        Ok(out)
    }

    async fn upsert_student_lesson(&self, record: &StudentLesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO student_lessons (student_id, lesson_id, status, score, attempt)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(student_id, lesson_id) DO UPDATE SET
                    status = excluded.status,
                    score = excluded.score,
                    attempt = excluded.attempt
            ",
        )
        .bind(id_i64("student_id", record.student_id().value())?)
        .bind(id_i64("lesson_id", record.lesson_id().value())?)
        .bind(record.status().as_str())
        .bind(record.score().map(i64::from))
        .bind(i64::from(record.attempt()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn apply_status_changes(
        &self,
        student_id: StudentId,
        changes: &[StatusChange],
    ) -> Result<(), StorageError> {
        let student = id_i64("student_id", student_id.value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        apply_changes_tx(&mut tx, student, changes).await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

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
        let student = id_i64("student_id", student_id.value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = sqlx::query(
            r"
                UPDATE student_lessons
                SET status = ?3,
                    score = ?4,
                    attempt = attempt + ?5
                WHERE student_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(student)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .bind(LessonStatus::Completed.as_str())
        .bind(score.map(i64::from))
        .bind(i64::from(count_attempt))
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        apply_changes_tx(&mut tx, student, changes).await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
