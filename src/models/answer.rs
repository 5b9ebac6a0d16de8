use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Error;

/// What a respondent actually replied, shaped after the question kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    ChosenField(i64),
    ChosenFields(Vec<i64>),
    WrittenText(String),
}

/// One respondent's reply to one question.
///
/// A `None` value on a submitted answer means "present but empty" and is
/// rejected by answer validation. Skipped optional questions are recorded as
/// [`UserAnswer::placeholder`], which carries question id `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UserAnswerRecord", into = "UserAnswerRecord")]
pub struct UserAnswer {
    pub question_id: i64,
    pub value: Option<AnswerValue>,
}

impl UserAnswer {
    pub fn new(question_id: i64, value: AnswerValue) -> Self {
        Self {
            question_id,
            value: Some(value),
        }
    }

    pub fn placeholder() -> Self {
        Self {
            question_id: 0,
            value: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.question_id == 0 && self.value.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UserAnswerRecord {
    #[validate(range(min = 1, message = "Question id must be positive"))]
    pub question_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_ids: Option<Vec<i64>>,
    #[serde(default, alias = "writed_text", skip_serializing_if = "Option::is_none")]
    pub written_text: Option<String>,
}

impl TryFrom<UserAnswerRecord> for UserAnswer {
    type Error = Error;

    fn try_from(record: UserAnswerRecord) -> Result<Self, Self::Error> {
        let value = match (record.chosen_id, record.chosen_ids, record.written_text) {
            (None, None, None) => None,
            (Some(id), None, None) => Some(AnswerValue::ChosenField(id)),
            (None, Some(ids), None) => Some(AnswerValue::ChosenFields(ids)),
            (None, None, Some(text)) => Some(AnswerValue::WrittenText(text)),
            _ => {
                return Err(Error::FailedAnswerValidation(format!(
                    "answer to question {} carries more than one reply",
                    record.question_id
                )))
            }
        };
        Ok(UserAnswer {
            question_id: record.question_id,
            value,
        })
    }
}

impl From<UserAnswer> for UserAnswerRecord {
    fn from(answer: UserAnswer) -> Self {
        let mut record = UserAnswerRecord {
            question_id: answer.question_id,
            ..Default::default()
        };
        match answer.value {
            Some(AnswerValue::ChosenField(id)) => record.chosen_id = Some(id),
            Some(AnswerValue::ChosenFields(ids)) => record.chosen_ids = Some(ids),
            Some(AnswerValue::WrittenText(text)) => record.written_text = Some(text),
            None => {}
        }
        record
    }
}
