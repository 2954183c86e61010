use course_core::model::{
    Answer, Assessment, AssessmentId, LessonId, MatchingPair, Question, QuestionId,
};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_answer_row, map_assessment_row, map_pair_row, map_question_row},
};
use crate::repository::{AssessmentRepository, QuestionRepository, StorageError};

#[async_trait::async_trait]
impl AssessmentRepository for SqliteRepository {
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO assessments (
                    id, lesson_id, kind, score, max_attempts, timer_secs, min_score
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    lesson_id = excluded.lesson_id,
                    kind = excluded.kind,
                    score = excluded.score,
                    max_attempts = excluded.max_attempts,
                    timer_secs = excluded.timer_secs,
                    min_score = excluded.min_score
            ",
        )
        .bind(id_i64("id", assessment.id().value())?)
        .bind(id_i64("lesson_id", assessment.lesson_id().value())?)
        .bind(assessment.kind().as_str())
        .bind(i64::from(assessment.score()))
        .bind(i64::from(assessment.max_attempts()))
        .bind(assessment.timer_secs().map(i64::from))
        .bind(assessment.min_score().map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, lesson_id, kind, score, max_attempts, timer_secs, min_score
                FROM assessments
                WHERE id = ?1
            ",
        )
        .bind(id_i64("id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_assessment_row(&row)
    }

    async fn assessment_for_lesson(&self, lesson_id: LessonId) -> Result<Assessment, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, lesson_id, kind, score, max_attempts, timer_secs, min_score
                FROM assessments
                WHERE lesson_id = ?1
            ",
        )
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_assessment_row(&row)
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO questions (
                    id, assessment_id, text, number, score, kind, hidden, image_path
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    assessment_id = excluded.assessment_id,
                    text = excluded.text,
                    number = excluded.number,
                    score = excluded.score,
                    kind = excluded.kind,
                    hidden = excluded.hidden,
                    image_path = excluded.image_path
            ",
        )
        .bind(id_i64("id", question.id().value())?)
        .bind(id_i64("assessment_id", question.assessment_id().value())?)
        .bind(question.text().to_owned())
        .bind(i64::from(question.number()))
        .bind(i64::from(question.score()))
        .bind(question.kind().as_str())
        .bind(question.hidden())
        .bind(question.image_path().map(str::to_owned))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn upsert_answer(&self, answer: &Answer) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO answers (id, question_id, text, is_correct, image_path)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    question_id = excluded.question_id,
                    text = excluded.text,
                    is_correct = excluded.is_correct,
                    image_path = excluded.image_path
            ",
        )
        .bind(id_i64("id", answer.id().value())?)
        .bind(id_i64("question_id", answer.question_id().value())?)
        .bind(answer.text().to_owned())
        .bind(answer.is_correct())
        .bind(answer.image_path().map(str::to_owned))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn upsert_matching_pair(&self, pair: &MatchingPair) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO matching_pairs (question_id, left_id, left_text, right_id, right_text)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(question_id, left_id) DO UPDATE SET
                    left_text = excluded.left_text,
                    right_id = excluded.right_id,
                    right_text = excluded.right_text
            ",
        )
        .bind(id_i64("question_id", pair.question_id().value())?)
        .bind(id_i64("left_id", pair.left_id().value())?)
        .bind(pair.left_text().to_owned())
        .bind(id_i64("right_id", pair.right_id().value())?)
        .bind(pair.right_text().to_owned())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn questions_for_assessment(
        &self,
        assessment_id: AssessmentId,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, assessment_id, text, number, score, kind, hidden, image_path
                FROM questions
                WHERE assessment_id = ?1
                ORDER BY number ASC
            ",
        )
        .bind(id_i64("assessment_id", assessment_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn answers_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<Answer>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, question_id, text, is_correct, image_path
                FROM answers
                WHERE question_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(id_i64("question_id", question_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_answer_row(&row)?);
        }
        Ok(out)
    }

    async fn matching_pairs_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<MatchingPair>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_id, left_id, left_text, right_id, right_text
                FROM matching_pairs
                WHERE question_id = ?1
                ORDER BY left_id ASC
            ",
        )
        .bind(id_i64("question_id", question_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_pair_row(&row)?);
        }
        Ok(out)
    }
}
