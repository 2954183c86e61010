use course_core::model::{CategoryId, Course, CourseId, CourseStatus, StudentCourse, StudentId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{id_i64, map_course_row, map_student_course_row, ser},
};
use crate::repository::{CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO courses (id, category_id, title, published)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    category_id = excluded.category_id,
                    title = excluded.title,
                    published = excluded.published
            ",
        )
        .bind(id_i64("id", course.id().value())?)
        .bind(id_i64("category_id", course.category_id().value())?)
        .bind(course.title().to_owned())
        .bind(course.published())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, category_id, title, published
                FROM courses
                WHERE id = ?1
            ",
        )
        .bind(id_i64("id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_course_row(&row)
    }

    async fn published_courses_in_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<CourseId>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id
                FROM courses
                WHERE category_id = ?1 AND published = 1
                ORDER BY id ASC
            ",
        )
        .bind(id_i64("category_id", category_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            let id = u64::try_from(id).map_err(|_| ser("course id sign overflow"))?;
            out.push(CourseId::new(id));
        }
        Ok(out)
    }

    async fn get_student_course(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<StudentCourse, StorageError> {
        let row = sqlx::query(
            r"
                SELECT student_id, course_id, grade, progress, status
                FROM student_courses
                WHERE student_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_student_course_row(&row)
    }

    async fn upsert_student_course(&self, record: &StudentCourse) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO student_courses (student_id, course_id, grade, progress, status)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(student_id, course_id) DO UPDATE SET
                    grade = excluded.grade,
                    progress = excluded.progress,
                    status = excluded.status
            ",
        )
        .bind(id_i64("student_id", record.student_id().value())?)
        .bind(id_i64("course_id", record.course_id().value())?)
        .bind(i64::from(record.grade()))
        .bind(i64::from(record.progress()))
        .bind(record.status().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn completed_courses(&self, student_id: StudentId) -> Result<Vec<CourseId>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT course_id
                FROM student_courses
                WHERE student_id = ?1 AND status = ?2
                ORDER BY course_id ASC
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .bind(CourseStatus::Completed.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("course_id").map_err(ser)?;
            let id = u64::try_from(id).map_err(|_| ser("course id sign overflow"))?;
            out.push(CourseId::new(id));
        }
        Ok(out)
    }

    async fn students_in_course(&self, course_id: CourseId) -> Result<Vec<StudentId>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT student_id
                FROM student_courses
                WHERE course_id = ?1
                ORDER BY student_id ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("student_id").map_err(ser)?;
            let id = u64::try_from(id).map_err(|_| ser("student id sign overflow"))?;
            out.push(StudentId::new(id));
        }
        Ok(out)
    }
}
