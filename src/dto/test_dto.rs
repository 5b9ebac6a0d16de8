use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::answer::{UserAnswer, UserAnswerRecord};
use crate::models::question::{Question, QuestionRecord};
use crate::models::test::{Image, TestDraft, TestPatch};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTestPayload {
    #[validate(length(min = 1, max = 120, message = "Title must be 1-120 characters"))]
    pub title: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub creator_id: Option<i64>,

    #[validate(length(min = 1, max = 60, message = "Short text must be 1-60 characters"))]
    pub short_text: String,

    #[serde(default)]
    #[validate(length(max = 200, message = "Long text must be at most 200 characters"))]
    pub long_text: String,

    pub main_image: Option<Image>,

    #[validate(length(min = 1, message = "A test needs at least one question"), nested)]
    pub questions: Vec<QuestionRecord>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateTestPayload {
    /// Resolves the string type tags into the typed domain model.
    pub fn into_draft(self) -> Result<TestDraft> {
        let kind = self.kind.parse()?;
        let questions = self
            .questions
            .into_iter()
            .map(Question::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(TestDraft {
            title: self.title,
            kind,
            owner_id: self.creator_id,
            short_text: self.short_text,
            long_text: self.long_text,
            main_image: self.main_image,
            questions,
            tags: self.tags.into_iter().collect(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTestResponse {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTestPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(length(max = 120, message = "Title must be at most 120 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(length(max = 60, message = "Short text must be at most 60 characters"))]
    pub short_text: Option<String>,

    #[serde(default, deserialize_with = "trim_optional_string")]
    #[validate(length(max = 200, message = "Long text must be at most 200 characters"))]
    pub long_text: Option<String>,

    pub main_image: Option<Image>,

    pub tags: Option<Vec<String>>,
}

impl UpdateTestPayload {
    pub fn into_patch(self) -> TestPatch {
        TestPatch {
            title: self.title,
            short_text: self.short_text,
            long_text: self.long_text,
            main_image: self.main_image,
            tags: self.tags.map(|tags| tags.into_iter().collect::<BTreeSet<_>>()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyTestPayload {
    #[serde(default)]
    #[validate(nested)]
    pub user_answers: Vec<UserAnswerRecord>,
}

impl ApplyTestPayload {
    /// Keys answers by question id. Two answers to one question are rejected.
    pub fn into_answers(self) -> Result<HashMap<i64, UserAnswer>> {
        let mut answers = HashMap::with_capacity(self.user_answers.len());
        for record in self.user_answers {
            let answer = UserAnswer::try_from(record)?;
            let question_id = answer.question_id;
            if answers.insert(question_id, answer).is_some() {
                return Err(Error::FailedAnswerValidation(format!(
                    "question {} answered more than once",
                    question_id
                )));
            }
        }
        Ok(answers)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GetTestQuery {
    #[serde(rename = "withAnswers")]
    pub with_answers: Option<bool>,
}

// Trims strings; blank ones count as absent
fn trim_optional_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}
