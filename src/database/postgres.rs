use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::database::TestStorage;
use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::result::TestResult;
use crate::models::test::{Image, Test, TestPatch};

#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TestRow {
    id: String,
    title: String,
    test_type: String,
    creator_id: i64,
    short_text: String,
    long_text: String,
    main_image: Option<Json<Image>>,
    questions: Json<Vec<Question>>,
    tags: Json<BTreeSet<String>>,
}

impl TryFrom<TestRow> for Test {
    type Error = Error;

    fn try_from(row: TestRow) -> Result<Self> {
        Ok(Test {
            id: row.id,
            title: row.title,
            kind: row.test_type.parse()?,
            owner_id: row.creator_id,
            short_text: row.short_text,
            long_text: row.long_text,
            main_image: row.main_image.map(|j| j.0),
            questions: row.questions.0,
            tags: row.tags.0,
        })
    }
}

const SELECT_TEST: &str = r#"
    SELECT id, title, test_type, creator_id, short_text, long_text,
           main_image, questions, tags
    FROM tests
"#;

fn not_found(test_id: &str) -> Error {
    Error::NotFound(format!("test {} not found", test_id))
}

#[async_trait]
impl TestStorage for PgStorage {
    async fn create_test(&self, test: &Test) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tests (
                id, title, test_type, creator_id, short_text, long_text,
                main_image, questions, tags
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&test.id)
        .bind(&test.title)
        .bind(test.kind.as_str())
        .bind(test.owner_id)
        .bind(&test.short_text)
        .bind(&test.long_text)
        .bind(test.main_image.as_ref().map(Json))
        .bind(Json(&test.questions))
        .bind(Json(&test.tags))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_test(&self, test_id: &str, patch: &TestPatch) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE tests
            SET
                title = COALESCE($1, title),
                short_text = COALESCE($2, short_text),
                long_text = COALESCE($3, long_text),
                main_image = COALESCE($4, main_image),
                tags = COALESCE($5, tags),
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(patch.title.as_deref())
        .bind(patch.short_text.as_deref())
        .bind(patch.long_text.as_deref())
        .bind(patch.main_image.as_ref().map(Json))
        .bind(patch.tags.as_ref().map(Json))
        .bind(test_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(test_id));
        }
        Ok(())
    }

    async fn delete_test(&self, test_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(test_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(test_id));
        }
        Ok(())
    }

    async fn get_test_by_id(&self, test_id: &str, include_answer_keys: bool) -> Result<Test> {
        let row = sqlx::query_as::<_, TestRow>(&format!("{} WHERE id = $1", SELECT_TEST))
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(test_id))?;

        let test = Test::try_from(row)?;
        if include_answer_keys {
            Ok(test)
        } else {
            Ok(test.without_answer_keys())
        }
    }

    async fn list_tests(&self) -> Result<Vec<Test>> {
        let rows = sqlx::query_as::<_, TestRow>(&format!("{} ORDER BY created_at", SELECT_TEST))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Test::try_from(row).map(Test::without_answer_keys))
            .collect()
    }

    async fn save_result(&self, result: &TestResult) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO results (id, test_id, respondent_id, user_answers, percentage, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(result.id)
        .bind(&result.test_id)
        .bind(result.respondent_id)
        .bind(Json(&result.user_answers))
        .bind(result.percentage)
        .bind(result.submitted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
