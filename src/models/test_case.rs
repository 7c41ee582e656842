//! Test case model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Test case database model. `is_hidden` only affects what clients may see;
/// hidden cases are still executed during judging.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub of_problem_id: i64,
    pub input: String,
    pub output: String,
    pub is_hidden: bool,
}
