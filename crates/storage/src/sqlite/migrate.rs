use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: courses and lessons, assessments with their
/// question data, attempt history, and the per-student progress tables
/// with their bounds as CHECK constraints.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS courses (
                    id INTEGER PRIMARY KEY,
                    category_id INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    published INTEGER NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lessons (
                    id INTEGER PRIMARY KEY,
                    course_id INTEGER NOT NULL,
                    number INTEGER NOT NULL CHECK (number >= 1),
                    title TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessments (
                    id INTEGER PRIMARY KEY,
                    lesson_id INTEGER NOT NULL UNIQUE,
                    kind TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score BETWEEN 1 AND 200),
                    max_attempts INTEGER NOT NULL CHECK (max_attempts >= 1),
                    timer_secs INTEGER,
                    min_score INTEGER,
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER PRIMARY KEY,
                    assessment_id INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    number INTEGER NOT NULL,
                    score INTEGER NOT NULL CHECK (score >= 1),
                    kind TEXT NOT NULL,
                    hidden INTEGER NOT NULL,
                    image_path TEXT,
                    FOREIGN KEY (assessment_id) REFERENCES assessments(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answers (
                    id INTEGER PRIMARY KEY,
                    question_id INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    is_correct INTEGER NOT NULL,
                    image_path TEXT,
                    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS matching_pairs (
                    question_id INTEGER NOT NULL,
                    left_id INTEGER NOT NULL,
                    left_text TEXT NOT NULL,
                    right_id INTEGER NOT NULL,
                    right_text TEXT NOT NULL,
                    PRIMARY KEY (question_id, left_id),
                    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempts (
                    id INTEGER PRIMARY KEY,
                    student_id INTEGER NOT NULL,
                    assessment_id INTEGER NOT NULL,
                    kind TEXT NOT NULL,
                    number INTEGER NOT NULL CHECK (number >= 1),
                    score INTEGER NOT NULL CHECK (score >= 0),
                    submitted_at TEXT NOT NULL,
                    UNIQUE (student_id, assessment_id, number),
                    FOREIGN KEY (assessment_id) REFERENCES assessments(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempt_details (
                    id INTEGER PRIMARY KEY,
                    attempt_id INTEGER NOT NULL,
                    question_id INTEGER NOT NULL,
                    score INTEGER NOT NULL CHECK (score >= 0),
                    response TEXT NOT NULL,
                    FOREIGN KEY (attempt_id) REFERENCES attempts(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS student_lessons (
                    student_id INTEGER NOT NULL,
                    lesson_id INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    score INTEGER,
                    attempt INTEGER NOT NULL CHECK (attempt >= 0),
                    PRIMARY KEY (student_id, lesson_id),
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS student_courses (
                    student_id INTEGER NOT NULL,
                    course_id INTEGER NOT NULL,
                    grade INTEGER NOT NULL CHECK (grade BETWEEN 0 AND 200),
                    progress INTEGER NOT NULL CHECK (progress BETWEEN 0 AND 100),
                    status TEXT NOT NULL,
                    PRIMARY KEY (student_id, course_id),
                    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_lessons_course_number
                    ON lessons (course_id, number);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_assessment_number
                    ON questions (assessment_id, number);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempts_student_assessment
                    ON attempts (student_id, assessment_id, number);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempt_details_attempt
                    ON attempt_details (attempt_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
