//! Submission repository

use sqlx::PgExecutor;

use crate::error::AppResult;
use crate::models::{Submission, SubmissionResult, SubmissionStatus};

/// Repository for submission database operations
pub struct SubmissionRepository;

impl SubmissionRepository {
    /// Create a new submission in status `Submitted` with result `Undefined`
    pub async fn create(
        executor: impl PgExecutor<'_>,
        of_problem_id: i64,
        author_id: i64,
        content: &str,
        language: &str,
    ) -> AppResult<Submission> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submission (of_problem_id, author_id, content, language, status, result)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(of_problem_id)
        .bind(author_id)
        .bind(content)
        .bind(language)
        .bind(SubmissionStatus::Submitted.as_i16())
        .bind(SubmissionResult::Undefined.as_i16())
        .fetch_one(executor)
        .await?;

        Ok(submission)
    }

    /// Find submission by ID
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: i64,
    ) -> AppResult<Option<Submission>> {
        let submission =
            sqlx::query_as::<_, Submission>(r#"SELECT * FROM submission WHERE id = $1"#)
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(submission)
    }

    /// Find submission by ID with a row lock. Must run inside a transaction;
    /// the lock is held until that transaction ends.
    pub async fn find_by_id_for_update(
        executor: impl PgExecutor<'_>,
        id: i64,
    ) -> AppResult<Option<Submission>> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"SELECT * FROM submission WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(submission)
    }

    /// Update only the status of a submission
    pub async fn update_status(
        executor: impl PgExecutor<'_>,
        id: i64,
        status: SubmissionStatus,
    ) -> AppResult<()> {
        sqlx::query(r#"UPDATE submission SET status = $2 WHERE id = $1"#)
            .bind(id)
            .bind(status.as_i16())
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Write the final verdict: status becomes `Finished`
    pub async fn finalize(
        executor: impl PgExecutor<'_>,
        id: i64,
        result: SubmissionResult,
    ) -> AppResult<()> {
        sqlx::query(r#"UPDATE submission SET status = $2, result = $3 WHERE id = $1"#)
            .bind(id)
            .bind(SubmissionStatus::Finished.as_i16())
            .bind(result.as_i16())
            .execute(executor)
            .await?;

        Ok(())
    }

    /// List submissions with pagination
    pub async fn list(
        executor: impl PgExecutor<'_>,
        offset: i64,
        limit: i64,
    ) -> AppResult<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"SELECT * FROM submission ORDER BY id OFFSET $1 LIMIT $2"#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(submissions)
    }

    /// Count all submissions
    pub async fn count(executor: impl PgExecutor<'_>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM submission"#)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// List submissions of a problem with pagination
    pub async fn list_of_problem(
        executor: impl PgExecutor<'_>,
        of_problem_id: i64,
        offset: i64,
        limit: i64,
    ) -> AppResult<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submission
            WHERE of_problem_id = $1
            ORDER BY id OFFSET $2 LIMIT $3
            "#,
        )
        .bind(of_problem_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(submissions)
    }

    /// Count submissions of a problem
    pub async fn count_of_problem(
        executor: impl PgExecutor<'_>,
        of_problem_id: i64,
    ) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM submission WHERE of_problem_id = $1"#)
                .bind(of_problem_id)
                .fetch_one(executor)
                .await?;

        Ok(count)
    }

    /// List an account's submissions for a problem with pagination
    pub async fn list_of_account_problem(
        executor: impl PgExecutor<'_>,
        author_id: i64,
        of_problem_id: i64,
        offset: i64,
        limit: i64,
    ) -> AppResult<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submission
            WHERE author_id = $1 AND of_problem_id = $2
            ORDER BY id OFFSET $3 LIMIT $4
            "#,
        )
        .bind(author_id)
        .bind(of_problem_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(submissions)
    }

    /// Count an account's submissions for a problem
    pub async fn count_of_account_problem(
        executor: impl PgExecutor<'_>,
        author_id: i64,
        of_problem_id: i64,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM submission WHERE author_id = $1 AND of_problem_id = $2"#,
        )
        .bind(author_id)
        .bind(of_problem_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    /// List submissions stuck in `Executing`. This is the read a recovery
    /// sweep would use to rewind rows abandoned by a crashed worker.
    pub async fn list_stuck_executing(
        executor: impl PgExecutor<'_>,
        limit: i64,
    ) -> AppResult<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"SELECT * FROM submission WHERE status = $1 ORDER BY id LIMIT $2"#,
        )
        .bind(SubmissionStatus::Executing.as_i16())
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(submissions)
    }
}
