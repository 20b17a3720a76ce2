use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::RepoResult;

/// Per-course aggregate over the saved lesson rows of one user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CourseSummary {
    pub course_name: String,
    pub total_lessons: i64,
    pub completed_lessons: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LessonProgress {
    pub lesson_number: i32,
    pub completed: bool,
    pub completed_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// One entry per course that has at least one row, sorted by name.
    async fn summarize(&self, user_id: Uuid) -> RepoResult<Vec<CourseSummary>>;
    /// Lesson rows of one course, ordered by lesson number.
    async fn lessons_for_course(
        &self,
        user_id: Uuid,
        course_name: &str,
    ) -> RepoResult<Vec<LessonProgress>>;
    /// Upsert keyed by (user, course, lesson); always marks the lesson completed.
    async fn mark_completed(&self, user_id: Uuid, course_name: &str, lesson_number: i32)
        -> RepoResult<()>;
}

pub struct PgProgressRepository {
    db: PgPool,
}

impl PgProgressRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn summarize(&self, user_id: Uuid) -> RepoResult<Vec<CourseSummary>> {
        let rows = sqlx::query_as::<_, CourseSummary>(
            r#"
            SELECT course_name,
                   COUNT(*)::BIGINT AS total_lessons,
                   COALESCE(SUM(CASE WHEN completed THEN 1 ELSE 0 END), 0)::BIGINT
                       AS completed_lessons
              FROM course_progress
             WHERE user_id = $1
             GROUP BY course_name
             ORDER BY course_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn lessons_for_course(
        &self,
        user_id: Uuid,
        course_name: &str,
    ) -> RepoResult<Vec<LessonProgress>> {
        let rows = sqlx::query_as::<_, LessonProgress>(
            r#"
            SELECT lesson_number, completed, completed_at
              FROM course_progress
             WHERE user_id = $1 AND course_name = $2
             ORDER BY lesson_number
            "#,
        )
        .bind(user_id)
        .bind(course_name)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn mark_completed(
        &self,
        user_id: Uuid,
        course_name: &str,
        lesson_number: i32,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO course_progress (id, user_id, course_name, lesson_number,
                                         completed, completed_at)
            VALUES ($1, $2, $3, $4, TRUE, now())
            ON CONFLICT (user_id, course_name, lesson_number)
            DO UPDATE SET completed = TRUE, completed_at = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(course_name)
        .bind(lesson_number)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
