use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::answer::UserAnswer;

/// Persisted outcome of one respondent's submission against one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: Uuid,
    pub test_id: String,
    pub respondent_id: i64,
    pub user_answers: Vec<UserAnswer>,
    /// Share of earned points, only set for strict tests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i64>,
    pub submitted_at: DateTime<Utc>,
}

impl TestResult {
    pub fn new(
        test_id: String,
        respondent_id: i64,
        user_answers: Vec<UserAnswer>,
        percentage: Option<i64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_id,
            respondent_id,
            user_answers,
            percentage,
            submitted_at: Utc::now(),
        }
    }
}
