pub mod memory;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::result::TestResult;
use crate::models::test::{Test, TestPatch};

pub use memory::InMemoryStorage;
pub use postgres::PgStorage;

/// Persistence for tests and submitted results.
///
/// Lookups of unknown ids fail with `Error::NotFound`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestStorage: Send + Sync {
    async fn create_test(&self, test: &Test) -> Result<()>;

    /// Merges only the fields the patch supplies.
    async fn update_test(&self, test_id: &str, patch: &TestPatch) -> Result<()>;

    async fn delete_test(&self, test_id: &str) -> Result<()>;

    /// Answer keys are stripped unless `include_answer_keys` is set.
    async fn get_test_by_id(&self, test_id: &str, include_answer_keys: bool) -> Result<Test>;

    /// Every stored test, answer keys stripped.
    async fn list_tests(&self) -> Result<Vec<Test>>;

    async fn save_result(&self, result: &TestResult) -> Result<()>;
}
