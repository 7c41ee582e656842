//! Submission service
//!
//! Owns the submission lifecycle: intake of new submissions, the
//! transactional claim that moves a row to `Executing`, and the final
//! verdict write. The claim is the only producer of the
//! `Submitted -> Executing` transition, so at most one dispatcher ever
//! executes a given submission.

use std::sync::Arc;

use sqlx::PgPool;
use validator::Validate;

use crate::constants::permissions::{SUBMISSIONS_READ_SELF, SUBMISSIONS_WRITE_SELF};
use crate::db::repositories::{ProblemRepository, SubmissionRepository};
use crate::error::{AppError, AppResult};
use crate::models::{Role, Submission, SubmissionResult, SubmissionStatus};
use crate::mq::SubmissionCreatedProducer;
use crate::services::auth_service::AuthService;
use crate::services::role_service::RoleService;

/// Create request for a new submission
#[derive(Debug, Validate)]
pub struct CreateSubmissionInput {
    pub token: String,
    pub of_problem_id: i64,
    #[validate(length(min = 1, max = 1_048_576))]
    pub content: String,
    #[validate(length(min = 1, max = 32))]
    pub language: String,
}

/// Submission service
pub struct SubmissionService {
    pool: PgPool,
    auth: Arc<AuthService>,
    producer: Arc<SubmissionCreatedProducer>,
}

impl SubmissionService {
    /// Create the service
    pub fn new(
        pool: PgPool,
        auth: Arc<AuthService>,
        producer: Arc<SubmissionCreatedProducer>,
    ) -> Self {
        Self {
            pool,
            auth,
            producer,
        }
    }

    /// Accept a new submission: validate, persist in `Submitted`, then
    /// publish its id. A failed publish is logged and swallowed; the row is
    /// the source of truth and operators may re-publish.
    pub async fn create_submission(&self, input: CreateSubmissionInput) -> AppResult<Submission> {
        input.validate()?;

        let identity = self.auth.verify_token(&input.token)?;
        if !RoleService::check(identity.role, &[SUBMISSIONS_WRITE_SELF]) {
            return Err(AppError::Forbidden(
                "account may not create submissions".to_string(),
            ));
        }

        if !ProblemRepository::exists(&self.pool, input.of_problem_id).await? {
            return Err(AppError::NotFound("Problem not found".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let submission = SubmissionRepository::create(
            &mut *tx,
            input.of_problem_id,
            identity.account_id,
            &input.content,
            &input.language,
        )
        .await?;
        tx.commit().await?;

        if let Err(e) = self.producer.produce(submission.id).await {
            tracing::error!(
                submission_id = submission.id,
                error = %e,
                "failed to publish submission created event"
            );
        }

        Ok(submission)
    }

    /// Claim a submission for execution. Exactly one dispatcher wins this
    /// for a given id: the row is locked, the `Submitted -> Executing`
    /// transition checked, and the status moved in one transaction.
    pub async fn claim_for_execution(&self, id: i64) -> AppResult<Submission> {
        let mut tx = self.pool.begin().await?;

        let mut submission = SubmissionRepository::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

        let claimable = submission
            .status()
            .is_some_and(|status| status.can_transition(SubmissionStatus::Executing));
        if !claimable {
            return Err(AppError::NotClaimable);
        }

        SubmissionRepository::update_status(&mut *tx, id, SubmissionStatus::Executing).await?;
        tx.commit().await?;

        submission.status = SubmissionStatus::Executing.as_i16();
        Ok(submission)
    }

    /// Persist the final verdict. The row is locked and the
    /// `Executing -> Finished` transition checked in the same transaction,
    /// so a double finalize or an out-of-order write fails instead of
    /// silently rewriting a settled row.
    pub async fn finalize(&self, id: i64, result: SubmissionResult) -> AppResult<()> {
        // A finished submission never carries Undefined
        debug_assert!(result.is_final());

        let mut tx = self.pool.begin().await?;

        let submission = SubmissionRepository::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))?;

        let finishable = submission
            .status()
            .is_some_and(|status| status.can_transition(SubmissionStatus::Finished));
        if !finishable {
            return Err(AppError::NotClaimable);
        }

        SubmissionRepository::finalize(&mut *tx, id, result).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Get a submission by id
    pub async fn get_submission(&self, id: i64) -> AppResult<Submission> {
        SubmissionRepository::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))
    }

    /// List submissions with pagination
    pub async fn list_submissions(
        &self,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Submission>, i64)> {
        let submissions = SubmissionRepository::list(&self.pool, offset, limit).await?;
        let total = SubmissionRepository::count(&self.pool).await?;
        Ok((submissions, total))
    }

    /// List a problem's submissions with pagination
    pub async fn list_problem_submissions(
        &self,
        of_problem_id: i64,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Submission>, i64)> {
        let submissions =
            SubmissionRepository::list_of_problem(&self.pool, of_problem_id, offset, limit).await?;
        let total = SubmissionRepository::count_of_problem(&self.pool, of_problem_id).await?;
        Ok((submissions, total))
    }

    /// List the calling account's submissions for a problem
    pub async fn list_own_problem_submissions(
        &self,
        token: &str,
        of_problem_id: i64,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Submission>, i64)> {
        let identity = self.auth.verify_token(token)?;
        if !RoleService::check(identity.role, &[SUBMISSIONS_READ_SELF]) {
            return Err(AppError::Forbidden(
                "account may not read submissions".to_string(),
            ));
        }

        let submissions = SubmissionRepository::list_of_account_problem(
            &self.pool,
            identity.account_id,
            of_problem_id,
            offset,
            limit,
        )
        .await?;
        let total = SubmissionRepository::count_of_account_problem(
            &self.pool,
            identity.account_id,
            of_problem_id,
        )
        .await?;

        Ok((submissions, total))
    }

    /// Authorize a worker identity for judging. Used once at dispatcher
    /// startup; a failure here is a misconfiguration, not a retry.
    pub fn authorize_worker(role: Role) -> AppResult<()> {
        use crate::constants::permissions::{SUBMISSIONS_READ_ALL, SUBMISSIONS_WRITE_ALL};

        if !RoleService::check(role, &[SUBMISSIONS_READ_ALL])
            || !RoleService::check(role, &[SUBMISSIONS_WRITE_ALL])
        {
            return Err(AppError::Forbidden(
                "worker account lacks judging permissions".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_input_validation() {
        let valid = CreateSubmissionInput {
            token: "token".to_string(),
            of_problem_id: 1,
            content: "int main() {}".to_string(),
            language: "cpp".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty_content = CreateSubmissionInput {
            content: String::new(),
            ..valid_input()
        };
        assert!(empty_content.validate().is_err());

        let empty_language = CreateSubmissionInput {
            language: String::new(),
            ..valid_input()
        };
        assert!(empty_language.validate().is_err());
    }

    fn valid_input() -> CreateSubmissionInput {
        CreateSubmissionInput {
            token: "token".to_string(),
            of_problem_id: 1,
            content: "int main() {}".to_string(),
            language: "cpp".to_string(),
        }
    }

    #[test]
    fn test_authorize_worker_roles() {
        assert!(SubmissionService::authorize_worker(Role::Worker).is_ok());
        assert!(SubmissionService::authorize_worker(Role::Admin).is_ok());

        assert!(SubmissionService::authorize_worker(Role::Contester).is_err());
        assert!(SubmissionService::authorize_worker(Role::ProblemSetter).is_err());
        assert!(SubmissionService::authorize_worker(Role::NotSet).is_err());
    }
}
