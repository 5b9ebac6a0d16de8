use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::database::TestStorage;
use crate::error::{Error, Result};
use crate::models::answer::UserAnswer;
use crate::models::result::TestResult;
use crate::models::test::{Test, TestDraft, TestPatch};
use crate::models::user::Caller;
use crate::services::access_policy::AccessPolicy;
use crate::services::grading_service::GradingService;
use crate::services::validation_service::ValidationService;

#[derive(Clone)]
pub struct TestService {
    storage: Arc<dyn TestStorage>,
    access: AccessPolicy,
}

impl TestService {
    pub fn new(storage: Arc<dyn TestStorage>, access: AccessPolicy) -> Self {
        Self { storage, access }
    }

    pub async fn list_tests(&self) -> Result<Vec<Test>> {
        self.storage.list_tests().await
    }

    /// Answer keys are only handed out to callers allowed to manage the test.
    pub async fn get_test(
        &self,
        caller: Option<&Caller>,
        test_id: &str,
        with_answers: bool,
    ) -> Result<Test> {
        if !with_answers {
            return self.storage.get_test_by_id(test_id, false).await;
        }

        let caller = caller.ok_or_else(|| {
            Error::Unauthorized("a token is required to see answers".to_string())
        })?;
        let test = self.storage.get_test_by_id(test_id, true).await?;
        if !self.access.can_manage(caller, test.owner_id) {
            tracing::warn!(test_id, caller_id = caller.id, "answer keys requested by non-owner");
            return Err(Error::Forbidden(
                "only the owner can see the answers".to_string(),
            ));
        }
        Ok(test)
    }

    pub async fn create_test(&self, caller: &Caller, draft: TestDraft) -> Result<Test> {
        let owner_id = draft.owner_id.unwrap_or(caller.id);
        if !self.access.can_manage(caller, owner_id) {
            return Err(Error::Forbidden(
                "cannot create tests on behalf of another user".to_string(),
            ));
        }

        let test = draft.into_test(Uuid::new_v4().to_string(), owner_id);
        ValidationService::validate_test(&test)?;
        self.storage.create_test(&test).await?;

        tracing::info!(
            test_id = %test.id,
            caller_id = caller.id,
            kind = %test.kind,
            questions = test.questions.len(),
            "test created"
        );
        Ok(test)
    }

    pub async fn update_test(
        &self,
        caller: &Caller,
        test_id: &str,
        patch: TestPatch,
    ) -> Result<Test> {
        let mut test = self.authorized_test(caller, test_id).await?;
        if !patch.is_empty() {
            self.storage.update_test(test_id, &patch).await?;
            test.apply_patch(&patch);
            tracing::info!(test_id, caller_id = caller.id, "test preview updated");
        }
        Ok(test.without_answer_keys())
    }

    pub async fn delete_test(&self, caller: &Caller, test_id: &str) -> Result<()> {
        self.authorized_test(caller, test_id).await?;
        self.storage.delete_test(test_id).await?;
        tracing::info!(test_id, caller_id = caller.id, "test deleted");
        Ok(())
    }

    /// Grades and stores one submission. A failed grading stores nothing.
    pub async fn apply_test(
        &self,
        caller: &Caller,
        test_id: &str,
        answers: HashMap<i64, UserAnswer>,
    ) -> Result<TestResult> {
        let test = self.storage.get_test_by_id(test_id, true).await?;
        let result = GradingService::grade(&test, caller.id, &answers)?;

        if let Err(e) = self.storage.save_result(&result).await {
            tracing::error!(test_id, caller_id = caller.id, error = %e, "failed to save result");
            return Err(e);
        }

        tracing::info!(
            test_id,
            caller_id = caller.id,
            result_id = %result.id,
            percentage = ?result.percentage,
            "test applied"
        );
        Ok(result)
    }

    async fn authorized_test(&self, caller: &Caller, test_id: &str) -> Result<Test> {
        let test = self.storage.get_test_by_id(test_id, true).await?;
        if !self.access.can_manage(caller, test.owner_id) {
            return Err(Error::Forbidden(format!(
                "user {} cannot modify test {}",
                caller.id, test_id
            )));
        }
        Ok(test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MockTestStorage;
    use crate::models::answer::AnswerValue;
    use crate::models::question::{AnswerKey, Field, Question, Variants};
    use crate::models::test::TestKind;
    use crate::models::user::permission;
    use std::collections::BTreeSet;

    fn question(required: bool) -> Question {
        Question {
            id: 1,
            short_text: "Capital of France?".into(),
            long_text: None,
            required,
            points: Some(10),
            variants: Variants::SingleChoice {
                fields: vec![Field::new(1, "Paris"), Field::new(2, "Rome")],
            },
            answer_key: Some(AnswerKey::SingleChoice { correct_id: 1 }),
        }
    }

    fn stored(kind: TestKind, owner_id: i64) -> Test {
        Test {
            id: "t-1".into(),
            title: "Geography".into(),
            kind,
            owner_id,
            short_text: "short".into(),
            long_text: "long".into(),
            main_image: None,
            questions: vec![question(true)],
            tags: BTreeSet::new(),
        }
    }

    fn draft(owner_id: Option<i64>) -> TestDraft {
        TestDraft {
            title: "Geography".into(),
            kind: TestKind::StrictTest,
            owner_id,
            short_text: "short".into(),
            long_text: "long".into(),
            main_image: None,
            questions: vec![question(false)],
            tags: BTreeSet::new(),
        }
    }

    fn service(storage: MockTestStorage) -> TestService {
        TestService::new(Arc::new(storage), AccessPolicy::new(permission::ADMIN))
    }

    #[tokio::test]
    async fn apply_persists_graded_result() {
        let mut storage = MockTestStorage::new();
        storage
            .expect_get_test_by_id()
            .withf(|id, keys| id == "t-1" && *keys)
            .returning(|_, _| Ok(stored(TestKind::StrictTest, 1)));
        storage
            .expect_save_result()
            .withf(|r| r.respondent_id == 42 && r.percentage == Some(100))
            .times(1)
            .returning(|_| Ok(()));

        let answers = HashMap::from([(1, UserAnswer::new(1, AnswerValue::ChosenField(1)))]);
        let result = service(storage)
            .apply_test(&Caller::new(42, vec![]), "t-1", answers)
            .await
            .unwrap();
        assert_eq!(result.percentage, Some(100));
    }

    #[tokio::test]
    async fn failed_grading_saves_nothing() {
        let mut storage = MockTestStorage::new();
        storage
            .expect_get_test_by_id()
            .returning(|_, _| Ok(stored(TestKind::Form, 1)));
        storage.expect_save_result().times(0);

        let err = service(storage)
            .apply_test(&Caller::new(42, vec![]), "t-1", HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingRequiredAnswer(1)));
    }

    #[tokio::test]
    async fn scored_tests_cannot_be_applied() {
        let mut storage = MockTestStorage::new();
        storage
            .expect_get_test_by_id()
            .returning(|_, _| Ok(stored(TestKind::ScoredTest, 1)));
        storage.expect_save_result().times(0);

        let answers = HashMap::from([(1, UserAnswer::new(1, AnswerValue::ChosenField(2)))]);
        let err = service(storage)
            .apply_test(&Caller::new(42, vec![]), "t-1", answers)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unimplemented(_)));
    }

    #[tokio::test]
    async fn answers_hidden_from_strangers() {
        let mut storage = MockTestStorage::new();
        storage
            .expect_get_test_by_id()
            .returning(|_, _| Ok(stored(TestKind::Quiz, 1)));
        let svc = service(storage);

        let err = svc
            .get_test(Some(&Caller::new(2, vec![permission::MODERATOR])), "t-1", true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let err = svc.get_test(None, "t-1", true).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        let admin = Caller::new(3, vec![permission::ADMIN]);
        let test = svc.get_test(Some(&admin), "t-1", true).await.unwrap();
        assert!(test.questions[0].answer_key.is_some());
    }

    #[tokio::test]
    async fn create_defaults_owner_to_caller() {
        let mut storage = MockTestStorage::new();
        storage
            .expect_create_test()
            .withf(|t| t.owner_id == 7 && !t.id.is_empty())
            .times(1)
            .returning(|_| Ok(()));

        let test = service(storage)
            .create_test(&Caller::new(7, vec![permission::CREATOR]), draft(None))
            .await
            .unwrap();
        assert_eq!(test.owner_id, 7);
        assert!(Uuid::parse_str(&test.id).is_ok());
    }

    #[tokio::test]
    async fn create_for_someone_else_needs_privilege() {
        let mut storage = MockTestStorage::new();
        storage.expect_create_test().times(1).returning(|_| Ok(()));
        let svc = service(storage);

        let err = svc
            .create_test(&Caller::new(7, vec![]), draft(Some(8)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let test = svc
            .create_test(&Caller::new(1, vec![permission::ADMIN]), draft(Some(8)))
            .await
            .unwrap();
        assert_eq!(test.owner_id, 8);
    }

    #[tokio::test]
    async fn invalid_structure_is_not_stored() {
        let mut storage = MockTestStorage::new();
        storage.expect_create_test().times(0);

        let mut bad = draft(None);
        bad.questions[0].points = None;
        let err = service(storage)
            .create_test(&Caller::new(7, vec![]), bad)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FailedValidation(_)));
    }

    #[tokio::test]
    async fn update_merges_preview_for_owner() {
        let mut storage = MockTestStorage::new();
        storage
            .expect_get_test_by_id()
            .returning(|_, _| Ok(stored(TestKind::Quiz, 5)));
        storage
            .expect_update_test()
            .withf(|id, patch| id == "t-1" && patch.title.as_deref() == Some("Renamed"))
            .times(1)
            .returning(|_, _| Ok(()));

        let patch = TestPatch {
            title: Some("Renamed".into()),
            ..Default::default()
        };
        let test = service(storage)
            .update_test(&Caller::new(5, vec![]), "t-1", patch)
            .await
            .unwrap();
        assert_eq!(test.title, "Renamed");
        assert_eq!(test.short_text, "short");
        assert!(test.questions[0].answer_key.is_none());
    }

    #[tokio::test]
    async fn delete_by_stranger_is_forbidden() {
        let mut storage = MockTestStorage::new();
        storage
            .expect_get_test_by_id()
            .returning(|_, _| Ok(stored(TestKind::Quiz, 5)));
        storage.expect_delete_test().times(0);

        let err = service(storage)
            .delete_test(&Caller::new(6, vec![permission::CREATOR]), "t-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn missing_test_is_not_found() {
        let mut storage = MockTestStorage::new();
        storage
            .expect_get_test_by_id()
            .returning(|id, _| Err(Error::NotFound(format!("test {} not found", id))));

        let err = service(storage)
            .apply_test(&Caller::new(1, vec![]), "nope", HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
