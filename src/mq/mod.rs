//! Message queue access (Redis Streams)
//!
//! The `submission_created` stream carries ids of freshly accepted
//! submissions. Dispatchers consume it as a consumer group: an entry is
//! acknowledged only after the submission reaches a safe state, so unacked
//! entries are redelivered to a live consumer via the pending-entry sweep.

pub mod consumer;
pub mod producer;

pub use consumer::{StreamConsumer, StreamMessage};
pub use producer::SubmissionCreatedProducer;
