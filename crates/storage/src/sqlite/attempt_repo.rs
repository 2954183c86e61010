use course_core::model::{AssessmentId, StudentId};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_attempt_row, map_detail_row, response_to_json, ser},
};
use crate::repository::{AttemptDetailRecord, AttemptRecord, AttemptRepository, StorageError};

fn write_error(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn last_attempt_number(
        &self,
        student_id: StudentId,
        assessment_id: AssessmentId,
    ) -> Result<Option<u32>, StorageError> {
        let row: (Option<i64>,) = sqlx::query_as(
            r"
                SELECT MAX(number)
                FROM attempts
                WHERE student_id = ?1 AND assessment_id = ?2
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .bind(id_i64("assessment_id", assessment_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.0
            .map(|n| u32::try_from(n).map_err(|_| ser(format!("invalid attempt number: {n}"))))
            .transpose()
    }

    async fn insert_attempt(
        &self,
        attempt: &AttemptRecord,
        details: &[AttemptDetailRecord],
    ) -> Result<i64, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = sqlx::query(
            r"
                INSERT INTO attempts (
                    student_id, assessment_id, kind, number, score, submitted_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_i64("student_id", attempt.student_id.value())?)
        .bind(id_i64("assessment_id", attempt.assessment_id.value())?)
        .bind(attempt.kind.as_str())
        .bind(i64::from(attempt.number))
        .bind(i64::from(attempt.score))
        .bind(attempt.submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(write_error)?;

        let attempt_id = res.last_insert_rowid();

        for detail in details {
            sqlx::query(
                r"
                    INSERT INTO attempt_details (attempt_id, question_id, score, response)
                    VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(attempt_id)
            .bind(id_i64("question_id", detail.question_id.value())?)
            .bind(i64::from(detail.score))
            .bind(response_to_json(&detail.response)?)
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(attempt_id)
    }

    async fn attempts_for(
        &self,
        student_id: StudentId,
        assessment_id: AssessmentId,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, student_id, assessment_id, kind, number, score, submitted_at
                FROM attempts
                WHERE student_id = ?1 AND assessment_id = ?2
                ORDER BY number ASC
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .bind(id_i64("assessment_id", assessment_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }

    async fn get_attempt(&self, attempt_id: i64) -> Result<AttemptRecord, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, student_id, assessment_id, kind, number, score, submitted_at
                FROM attempts
                WHERE id = ?1
            ",
        )
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn details_for_attempt(
        &self,
        attempt_id: i64,
    ) -> Result<Vec<AttemptDetailRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, attempt_id, question_id, score, response
                FROM attempt_details
                WHERE attempt_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if rows.is_empty() {
            // Distinguish an unknown attempt from one with no details.
            sqlx::query("SELECT 1 FROM attempts WHERE id = ?1")
                .bind(attempt_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?
                .ok_or(StorageError::NotFound)?;
        }

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_detail_row(&row)?);
        }
        Ok(out)
    }
}
