//! Submission dispatcher
//!
//! Consumes submission ids from the broker and drives the judge pipeline for
//! each. The dispatcher is the single retry/finalize/ack decision point:
//! poison messages and lost claims are acknowledged, verdicts are persisted
//! then acknowledged, and storage-class failures leave the message pending
//! for redelivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::PgPool;

use crate::config::WorkerConfig;
use crate::db::repositories::{AccountRepository, ProblemRepository, TestCaseRepository};
use crate::error::{AppError, AppResult};
use crate::judge::{JudgeOutcome, JudgePipeline};
use crate::metrics::{self, ACTIVE_JOBS, MESSAGES_PROCESSED, MESSAGES_RETRIED};
use crate::models::Role;
use crate::mq::{StreamConsumer, StreamMessage};
use crate::services::{AuthService, SubmissionService};

/// Dispatcher processing one assigned message at a time
pub struct Dispatcher {
    consumer: StreamConsumer,
    submission_service: Arc<SubmissionService>,
    pipeline: Arc<JudgePipeline>,
    pool: PgPool,
    shutdown: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new(
        consumer: StreamConsumer,
        submission_service: Arc<SubmissionService>,
        pipeline: Arc<JudgePipeline>,
        pool: PgPool,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            consumer,
            submission_service,
            pipeline,
            pool,
            shutdown,
        }
    }

    /// Establish the worker's identity: seed the system account on first
    /// run, open a session, and check the judging permissions. Any failure
    /// here aborts startup.
    pub async fn authenticate_worker(
        pool: &PgPool,
        auth: &AuthService,
        config: &WorkerConfig,
    ) -> AppResult<()> {
        if AccountRepository::find_by_name(pool, &config.account_name)
            .await?
            .is_none()
        {
            tracing::info!(account = %config.account_name, "seeding system worker account");

            // Another worker may seed concurrently; losing that race is fine
            if let Err(e) = Self::seed_worker_account(pool, auth, config).await {
                if !matches!(e, AppError::AlreadyExists(_)) {
                    return Err(e);
                }
            }
        }

        let (token, account) = auth
            .create_session(pool, &config.account_name, &config.account_password)
            .await?;
        let identity = auth.verify_token(&token)?;
        SubmissionService::authorize_worker(identity.role)?;

        tracing::info!(
            account_id = account.id,
            account = %account.name,
            "worker session established"
        );

        Ok(())
    }

    async fn seed_worker_account(
        pool: &PgPool,
        auth: &AuthService,
        config: &WorkerConfig,
    ) -> AppResult<()> {
        let hash = auth.hash_password(&config.account_password)?;

        let mut tx = pool.begin().await?;
        let account =
            AccountRepository::create(&mut *tx, &config.account_name, Role::Worker).await?;
        AccountRepository::create_password(&mut *tx, account.id, &hash).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Run the consume loop until shutdown is requested. The in-flight
    /// message is finished before returning.
    pub async fn run(&self) -> AppResult<()> {
        self.consumer.ensure_group().await?;

        tracing::info!("dispatcher consuming");

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.consumer.read_next().await {
                Ok(Some(message)) => {
                    self.handle_message(message).await;
                }
                Ok(None) => {
                    // Idle; pick up messages abandoned by dead consumers
                    match self.consumer.claim_abandoned().await {
                        Ok(claimed) => {
                            for message in claimed {
                                if self.shutdown.load(Ordering::SeqCst) {
                                    break;
                                }
                                self.handle_message(message).await;
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to claim abandoned messages");
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to read from stream");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        tracing::info!("dispatcher shutting down");
        Ok(())
    }

    async fn handle_message(&self, message: StreamMessage) {
        ACTIVE_JOBS.inc();
        let result = self.process_message(&message).await;
        ACTIVE_JOBS.dec();

        match result {
            Ok(()) => {
                MESSAGES_PROCESSED.inc();
                if let Err(e) = self.consumer.ack(&message.id).await {
                    tracing::error!(message_id = %message.id, error = %e, "failed to ack message");
                }
            }
            Err(e) if e.is_retryable() => {
                // No ack: the pending entry is redelivered to a live consumer
                MESSAGES_RETRIED.inc();
                tracing::warn!(
                    message_id = %message.id,
                    error = %e,
                    "leaving message for redelivery"
                );
            }
            Err(e) => {
                tracing::error!(
                    message_id = %message.id,
                    error = %e,
                    "dropping message with terminal error"
                );
                if let Err(ack_err) = self.consumer.ack(&message.id).await {
                    tracing::error!(message_id = %message.id, error = %ack_err, "failed to ack message");
                }
            }
        }
    }

    async fn process_message(&self, message: &StreamMessage) -> AppResult<()> {
        let submission_id = Self::parse_payload(&message.payload)?;

        let submission = match self
            .submission_service
            .claim_for_execution(submission_id)
            .await
        {
            Ok(submission) => submission,
            Err(AppError::NotClaimable) => {
                // Another dispatcher won the claim; the message is done
                tracing::info!(submission_id, "submission already claimed");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            submission_id,
            language = %submission.language,
            "judging submission"
        );

        let problem = ProblemRepository::find_by_id(&self.pool, submission.of_problem_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Problem {} not found", submission.of_problem_id))
            })?;

        let test_cases =
            TestCaseRepository::list_of_problem_all(&self.pool, problem.id).await?;

        let started = Instant::now();
        let outcome = self.pipeline.judge(&submission, &problem, &test_cases).await;
        metrics::record_judge_duration(&submission.language, started.elapsed().as_secs_f64());

        match outcome {
            JudgeOutcome::Verdict(result) => {
                self.submission_service.finalize(submission_id, result).await?;
                metrics::record_verdict(result.code());

                tracing::info!(
                    submission_id,
                    verdict = %result,
                    "submission judged"
                );
                Ok(())
            }
            JudgeOutcome::Retry(reason) => Err(AppError::Docker(reason)),
        }
    }

    /// Parse a message payload: a JSON-encoded unsigned integer. Anything
    /// else is a poison message.
    fn parse_payload(payload: &[u8]) -> AppResult<i64> {
        let id: u64 = serde_json::from_slice(payload).map_err(|e| {
            AppError::Validation(format!(
                "malformed submission id payload {:?}: {e}",
                String::from_utf8_lossy(payload)
            ))
        })?;

        i64::try_from(id)
            .map_err(|_| AppError::Validation(format!("submission id {id} out of range")))
    }
}
