//! Account repository

use sqlx::PgExecutor;

use crate::error::AppResult;
use crate::models::{Account, Role};

/// Repository for account database operations
pub struct AccountRepository;

impl AccountRepository {
    /// Create a new account. The role is fixed at creation.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        name: &str,
        role: Role,
    ) -> AppResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO account (name, role)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(role.as_i16())
        .fetch_one(executor)
        .await?;

        Ok(account)
    }

    /// Find account by ID
    pub async fn find_by_id(executor: impl PgExecutor<'_>, id: i64) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(r#"SELECT * FROM account WHERE id = $1"#)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(account)
    }

    /// Find account by its unique name
    pub async fn find_by_name(
        executor: impl PgExecutor<'_>,
        name: &str,
    ) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(r#"SELECT * FROM account WHERE name = $1"#)
            .bind(name)
            .fetch_optional(executor)
            .await?;

        Ok(account)
    }

    /// Store the password hash for an account. Written once at creation,
    /// never mutated afterwards.
    pub async fn create_password(
        executor: impl PgExecutor<'_>,
        of_account_id: i64,
        hash: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO account_password (of_account_id, hash)
            VALUES ($1, $2)
            "#,
        )
        .bind(of_account_id)
        .bind(hash)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Fetch the password hash for an account
    pub async fn get_password_hash(
        executor: impl PgExecutor<'_>,
        of_account_id: i64,
    ) -> AppResult<Option<String>> {
        let hash: Option<String> = sqlx::query_scalar(
            r#"SELECT hash FROM account_password WHERE of_account_id = $1"#,
        )
        .bind(of_account_id)
        .fetch_optional(executor)
        .await?;

        Ok(hash)
    }
}
