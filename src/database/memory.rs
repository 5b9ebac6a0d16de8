use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::TestStorage;
use crate::error::{Error, Result};
use crate::models::result::TestResult;
use crate::models::test::{Test, TestPatch};

/// Process-local storage, used when no database is configured.
#[derive(Default)]
pub struct InMemoryStorage {
    tests: RwLock<HashMap<String, Test>>,
    // insertion order is kept so listings are stable
    order: RwLock<Vec<String>>,
    results: RwLock<Vec<TestResult>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn results(&self) -> Vec<TestResult> {
        self.results.read().await.clone()
    }
}

fn not_found(test_id: &str) -> Error {
    Error::NotFound(format!("test {} not found", test_id))
}

#[async_trait]
impl TestStorage for InMemoryStorage {
    async fn create_test(&self, test: &Test) -> Result<()> {
        let mut tests = self.tests.write().await;
        if tests.contains_key(&test.id) {
            return Err(Error::Internal(format!("test {} already exists", test.id)));
        }
        tests.insert(test.id.clone(), test.clone());
        self.order.write().await.push(test.id.clone());
        Ok(())
    }

    async fn update_test(&self, test_id: &str, patch: &TestPatch) -> Result<()> {
        let mut tests = self.tests.write().await;
        let test = tests.get_mut(test_id).ok_or_else(|| not_found(test_id))?;
        test.apply_patch(patch);
        Ok(())
    }

    async fn delete_test(&self, test_id: &str) -> Result<()> {
        let mut tests = self.tests.write().await;
        tests.remove(test_id).ok_or_else(|| not_found(test_id))?;
        self.order.write().await.retain(|id| id != test_id);
        Ok(())
    }

    async fn get_test_by_id(&self, test_id: &str, include_answer_keys: bool) -> Result<Test> {
        let tests = self.tests.read().await;
        let test = tests.get(test_id).cloned().ok_or_else(|| not_found(test_id))?;
        if include_answer_keys {
            Ok(test)
        } else {
            Ok(test.without_answer_keys())
        }
    }

    async fn list_tests(&self) -> Result<Vec<Test>> {
        let tests = self.tests.read().await;
        let order = self.order.read().await;
        Ok(order
            .iter()
            .filter_map(|id| tests.get(id))
            .map(|t| t.clone().without_answer_keys())
            .collect())
    }

    async fn save_result(&self, result: &TestResult) -> Result<()> {
        self.results.write().await.push(result.clone());
        Ok(())
    }
}
