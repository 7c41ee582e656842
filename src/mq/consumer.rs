//! Consumer-group reader for the submission created stream

use deadpool_redis::redis;

use crate::config::MqConfig;
use crate::constants::MESSAGE_PAYLOAD_FIELD;
use crate::error::{AppError, AppResult};

/// A single entry read from the stream
#[derive(Debug, Clone)]
pub struct StreamMessage {
    /// Stream entry id, passed back on acknowledgment
    pub id: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
}

/// Consumer-group reader. One instance per dispatcher; entries assigned to
/// this consumer are processed strictly sequentially.
pub struct StreamConsumer {
    pool: deadpool_redis::Pool,
    stream: String,
    group: String,
    consumer_name: String,
    block_timeout_ms: u64,
    min_idle_for_claim_ms: u64,
}

impl StreamConsumer {
    /// Create a new consumer from configuration
    pub fn new(pool: deadpool_redis::Pool, config: &MqConfig, consumer_name: String) -> Self {
        Self {
            pool,
            stream: config.stream.clone(),
            group: config.consumer_group.clone(),
            consumer_name,
            block_timeout_ms: config.block_timeout.as_millis() as u64,
            min_idle_for_claim_ms: config.min_idle_for_claim.as_millis() as u64,
        }
    }

    /// Create the consumer group. A first join starts at the newest entry;
    /// an already existing group is left untouched.
    pub async fn ensure_group(&self) -> AppResult<()> {
        let mut conn = self.pool.get().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream)
            .arg(&self.group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut *conn)
            .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    stream = %self.stream,
                    group = %self.group,
                    "created consumer group"
                );
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                tracing::debug!(group = %self.group, "consumer group already exists");
                Ok(())
            }
            Err(e) => Err(AppError::Mq(format!("failed to create consumer group: {e}"))),
        }
    }

    /// Read the next entry assigned to this consumer, blocking up to the
    /// configured timeout. Returns `None` when no entry arrived.
    pub async fn read_next(&self) -> AppResult<Option<StreamMessage>> {
        let mut conn = self.pool.get().await?;

        let reply: redis::Value = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer_name)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(self.block_timeout_ms)
            .arg("STREAMS")
            .arg(&self.stream)
            .arg(">")
            .query_async(&mut *conn)
            .await?;

        if matches!(reply, redis::Value::Nil) {
            return Ok(None);
        }

        Self::parse_read_reply(&reply).map(Some)
    }

    /// Acknowledge an entry: the group-level commit that marks this message
    /// as fully processed.
    pub async fn ack(&self, message_id: &str) -> AppResult<()> {
        let mut conn = self.pool.get().await?;

        redis::cmd("XACK")
            .arg(&self.stream)
            .arg(&self.group)
            .arg(message_id)
            .query_async::<i64>(&mut *conn)
            .await?;

        Ok(())
    }

    /// Claim entries abandoned by dead consumers (pending longer than the
    /// configured idle threshold) and hand them to this consumer. This is
    /// the redelivery path behind at-least-once processing.
    pub async fn claim_abandoned(&self) -> AppResult<Vec<StreamMessage>> {
        let mut conn = self.pool.get().await?;

        let pending: Vec<(String, String, u64, u64)> = redis::cmd("XPENDING")
            .arg(&self.stream)
            .arg(&self.group)
            .arg("-")
            .arg("+")
            .arg(10)
            .query_async(&mut *conn)
            .await?;

        let mut claimed = Vec::new();
        for (message_id, _consumer, idle_time, _delivery_count) in pending {
            if idle_time <= self.min_idle_for_claim_ms {
                continue;
            }

            tracing::info!(message_id = %message_id, idle_time, "claiming abandoned message");

            let reply: redis::Value = redis::cmd("XCLAIM")
                .arg(&self.stream)
                .arg(&self.group)
                .arg(&self.consumer_name)
                .arg(self.min_idle_for_claim_ms)
                .arg(&message_id)
                .query_async(&mut *conn)
                .await?;

            if let redis::Value::Array(entries) = reply {
                for entry in &entries {
                    if let Ok(message) = Self::parse_entry(entry) {
                        claimed.push(message);
                    }
                }
            }
        }

        Ok(claimed)
    }

    /// Parse the XREADGROUP reply shape:
    /// `[[stream_name, [[entry_id, [field, value, ...]]]]]`
    fn parse_read_reply(reply: &redis::Value) -> AppResult<StreamMessage> {
        let streams = match reply {
            redis::Value::Array(streams) => streams,
            _ => return Err(AppError::Mq("invalid stream response format".into())),
        };

        let stream_data = match streams.first() {
            Some(redis::Value::Array(data)) => data,
            _ => return Err(AppError::Mq("no stream data in response".into())),
        };

        let entries = match stream_data.get(1) {
            Some(redis::Value::Array(entries)) => entries,
            _ => return Err(AppError::Mq("no entries in response".into())),
        };

        let entry = entries
            .first()
            .ok_or_else(|| AppError::Mq("empty entry list".into()))?;

        Self::parse_entry(entry)
    }

    /// Parse a single `[entry_id, [field, value, ...]]` pair
    fn parse_entry(entry: &redis::Value) -> AppResult<StreamMessage> {
        let parts = match entry {
            redis::Value::Array(parts) => parts,
            _ => return Err(AppError::Mq("invalid entry format".into())),
        };

        let id = match parts.first() {
            Some(redis::Value::BulkString(id)) => String::from_utf8_lossy(id).to_string(),
            _ => return Err(AppError::Mq("invalid entry id".into())),
        };

        let fields = match parts.get(1) {
            Some(redis::Value::Array(fields)) => fields,
            _ => return Err(AppError::Mq("entry has no fields".into())),
        };

        for chunk in fields.chunks(2) {
            if let [redis::Value::BulkString(key), redis::Value::BulkString(value)] = chunk {
                if key.as_slice() == MESSAGE_PAYLOAD_FIELD.as_bytes() {
                    return Ok(StreamMessage {
                        id,
                        payload: value.clone(),
                    });
                }
            }
        }

        Err(AppError::Mq(format!(
            "entry {id} is missing the payload field"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> redis::Value {
        redis::Value::BulkString(s.as_bytes().to_vec())
    }

    #[test]
    fn test_parse_entry() {
        let entry = redis::Value::Array(vec![
            bulk("1700000000000-0"),
            redis::Value::Array(vec![bulk("payload"), bulk("42")]),
        ]);

        let message = StreamConsumer::parse_entry(&entry).unwrap();
        assert_eq!(message.id, "1700000000000-0");
        assert_eq!(message.payload, b"42");
    }

    #[test]
    fn test_parse_entry_missing_payload_field() {
        let entry = redis::Value::Array(vec![
            bulk("1700000000000-0"),
            redis::Value::Array(vec![bulk("other"), bulk("42")]),
        ]);

        assert!(StreamConsumer::parse_entry(&entry).is_err());
    }

    #[test]
    fn test_parse_read_reply() {
        let reply = redis::Value::Array(vec![redis::Value::Array(vec![
            bulk("submission_created"),
            redis::Value::Array(vec![redis::Value::Array(vec![
                bulk("1700000000000-1"),
                redis::Value::Array(vec![bulk("payload"), bulk("7")]),
            ])]),
        ])]);

        let message = StreamConsumer::parse_read_reply(&reply).unwrap();
        assert_eq!(message.id, "1700000000000-1");
        assert_eq!(message.payload, b"7");
    }
}
