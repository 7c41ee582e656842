//! Problem repository

use sqlx::PgExecutor;

use crate::error::AppResult;
use crate::models::Problem;

/// Repository for problem database operations
pub struct ProblemRepository;

impl ProblemRepository {
    /// Create a new problem
    pub async fn create(
        executor: impl PgExecutor<'_>,
        display_name: &str,
        author_id: i64,
        description: &str,
        time_limit_ms: i64,
        memory_limit_bytes: i64,
    ) -> AppResult<Problem> {
        let problem = sqlx::query_as::<_, Problem>(
            r#"
            INSERT INTO problem (display_name, author_id, description, time_limit, memory_limit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(display_name)
        .bind(author_id)
        .bind(description)
        .bind(time_limit_ms)
        .bind(memory_limit_bytes)
        .fetch_one(executor)
        .await?;

        Ok(problem)
    }

    /// Find problem by ID
    pub async fn find_by_id(executor: impl PgExecutor<'_>, id: i64) -> AppResult<Option<Problem>> {
        let problem = sqlx::query_as::<_, Problem>(r#"SELECT * FROM problem WHERE id = $1"#)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(problem)
    }

    /// Whether a problem exists
    pub async fn exists(executor: impl PgExecutor<'_>, id: i64) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM problem WHERE id = $1)"#)
                .bind(id)
                .fetch_one(executor)
                .await?;

        Ok(exists)
    }
}
