//! Producer for the submission created stream

use deadpool_redis::redis;

use crate::constants::MESSAGE_PAYLOAD_FIELD;
use crate::error::AppResult;

/// Publishes ids of newly created submissions
pub struct SubmissionCreatedProducer {
    pool: deadpool_redis::Pool,
    stream: String,
}

impl SubmissionCreatedProducer {
    /// Create a new producer targeting the given stream
    pub fn new(pool: deadpool_redis::Pool, stream: String) -> Self {
        Self { pool, stream }
    }

    /// Publish a submission id. The payload is a JSON-encoded integer.
    pub async fn produce(&self, submission_id: i64) -> AppResult<()> {
        let payload = serde_json::to_vec(&submission_id)
            .map_err(|e| crate::error::AppError::Mq(e.to_string()))?;

        let mut conn = self.pool.get().await?;

        redis::cmd("XADD")
            .arg(&self.stream)
            .arg("*")
            .arg(MESSAGE_PAYLOAD_FIELD)
            .arg(payload)
            .query_async::<String>(&mut *conn)
            .await?;

        tracing::debug!(submission_id, stream = %self.stream, "published submission created event");

        Ok(())
    }
}
