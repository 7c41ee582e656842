//! Test case repository

use sqlx::PgExecutor;

use crate::error::AppResult;
use crate::models::TestCase;

/// Repository for test case database operations
pub struct TestCaseRepository;

impl TestCaseRepository {
    /// Create a new test case
    pub async fn create(
        executor: impl PgExecutor<'_>,
        of_problem_id: i64,
        input: &str,
        output: &str,
        is_hidden: bool,
    ) -> AppResult<TestCase> {
        let test_case = sqlx::query_as::<_, TestCase>(
            r#"
            INSERT INTO test_case (of_problem_id, input, output, is_hidden)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(of_problem_id)
        .bind(input)
        .bind(output)
        .bind(is_hidden)
        .fetch_one(executor)
        .await?;

        Ok(test_case)
    }

    /// List every test case of a problem in stored order, hidden included.
    /// Judging runs all of them; hidden only limits client visibility.
    pub async fn list_of_problem_all(
        executor: impl PgExecutor<'_>,
        of_problem_id: i64,
    ) -> AppResult<Vec<TestCase>> {
        let test_cases = sqlx::query_as::<_, TestCase>(
            r#"SELECT * FROM test_case WHERE of_problem_id = $1 ORDER BY id"#,
        )
        .bind(of_problem_id)
        .fetch_all(executor)
        .await?;

        Ok(test_cases)
    }
}
