//! Problem model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Problem database model. `time_limit` is in milliseconds and
/// `memory_limit` in bytes; both bound each test case at execute time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub display_name: String,
    pub author_id: i64,
    pub description: String,
    pub time_limit: i64,
    pub memory_limit: i64,
}
