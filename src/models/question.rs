use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Error;
use crate::models::test::Image;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    ManualInput,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::ManualInput => "manual_input",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_choice" => Ok(QuestionKind::SingleChoice),
            "multiple_choice" => Ok(QuestionKind::MultipleChoice),
            "manual_input" => Ok(QuestionKind::ManualInput),
            other => Err(Error::InvalidQuestionKind(other.to_string())),
        }
    }
}

/// A selectable option. `id` links the option to the answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
}

impl Field {
    pub fn new(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            image: None,
        }
    }
}

/// The answerable surface of a question; its variant decides the question kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variants {
    SingleChoice { fields: Vec<Field> },
    MultipleChoice { max_choices: i64, fields: Vec<Field> },
    ManualInput,
}

impl Variants {
    pub fn kind(&self) -> QuestionKind {
        match self {
            Variants::SingleChoice { .. } => QuestionKind::SingleChoice,
            Variants::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            Variants::ManualInput => QuestionKind::ManualInput,
        }
    }

    pub fn fields(&self) -> &[Field] {
        match self {
            Variants::SingleChoice { fields } | Variants::MultipleChoice { fields, .. } => fields,
            Variants::ManualInput => &[],
        }
    }

    pub fn has_field(&self, id: i64) -> bool {
        self.fields().iter().any(|f| f.id == id)
    }
}

/// Authoritative correct answer, shaped after the question kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerKey {
    SingleChoice { correct_id: i64 },
    MultipleChoice { correct_ids: Vec<i64> },
    ManualInput { correct_text: String },
}

impl AnswerKey {
    pub fn kind(&self) -> QuestionKind {
        match self {
            AnswerKey::SingleChoice { .. } => QuestionKind::SingleChoice,
            AnswerKey::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            AnswerKey::ManualInput { .. } => QuestionKind::ManualInput,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord", into = "QuestionRecord")]
pub struct Question {
    pub id: i64,
    pub short_text: String,
    pub long_text: Option<String>,
    pub required: bool,
    /// Only meaningful for strict tests.
    pub points: Option<i64>,
    pub variants: Variants,
    pub answer_key: Option<AnswerKey>,
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        self.variants.kind()
    }
}

// Wire shape: a type tag next to optional per-kind members, only one of
// which is populated.

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[validate(length(min = 1, message = "Question text cannot be empty"))]
    pub short_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_text: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 2147483647, message = "Points must fit in 32 bits"))]
    pub points: Option<i64>,
    #[serde(default)]
    pub variants: VariantsRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<AnswerKeyRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_choice: Option<ChoiceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_choice: Option<ChoiceRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default)]
    pub fields: Option<Vec<Option<Field>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerKeyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_ids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_text: Option<String>,
}

impl AnswerKeyRecord {
    /// Picks the member matching `kind`; the others are ignored.
    fn into_key(self, kind: QuestionKind) -> Option<AnswerKey> {
        match kind {
            QuestionKind::SingleChoice => self
                .correct_id
                .map(|correct_id| AnswerKey::SingleChoice { correct_id }),
            QuestionKind::MultipleChoice => self
                .correct_ids
                .map(|correct_ids| AnswerKey::MultipleChoice { correct_ids }),
            QuestionKind::ManualInput => self
                .correct_text
                .map(|correct_text| AnswerKey::ManualInput { correct_text }),
        }
    }
}

impl From<AnswerKey> for AnswerKeyRecord {
    fn from(key: AnswerKey) -> Self {
        match key {
            AnswerKey::SingleChoice { correct_id } => Self {
                correct_id: Some(correct_id),
                ..Default::default()
            },
            AnswerKey::MultipleChoice { correct_ids } => Self {
                correct_ids: Some(correct_ids),
                ..Default::default()
            },
            AnswerKey::ManualInput { correct_text } => Self {
                correct_text: Some(correct_text),
                ..Default::default()
            },
        }
    }
}

fn collect_fields(
    fields: Option<Vec<Option<Field>>>,
    kind: QuestionKind,
) -> Result<Vec<Field>, Error> {
    let fields = fields.ok_or_else(|| Error::FailedValidation(format!("no {} fields", kind)))?;
    fields
        .into_iter()
        .map(|f| f.ok_or_else(|| Error::FailedValidation("field is null".to_string())))
        .collect()
}

impl TryFrom<QuestionRecord> for Question {
    type Error = Error;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let kind: QuestionKind = record.kind.parse()?;
        let variants = match kind {
            QuestionKind::SingleChoice => {
                let choice = record.variants.single_choice.ok_or_else(|| {
                    Error::FailedValidation("no single choice structure".to_string())
                })?;
                Variants::SingleChoice {
                    fields: collect_fields(choice.fields, kind)?,
                }
            }
            QuestionKind::MultipleChoice => {
                let choice = record.variants.multiple_choice.ok_or_else(|| {
                    Error::FailedValidation("no multiple choice structure".to_string())
                })?;
                let max_choices = choice
                    .max
                    .ok_or_else(|| Error::FailedValidation("no max choices".to_string()))?;
                Variants::MultipleChoice {
                    max_choices,
                    fields: collect_fields(choice.fields, kind)?,
                }
            }
            QuestionKind::ManualInput => Variants::ManualInput,
        };

        Ok(Question {
            id: record.id,
            short_text: record.short_text,
            long_text: record.long_text,
            required: record.required,
            points: record.points,
            variants,
            answer_key: record.answers.and_then(|a| a.into_key(kind)),
        })
    }
}

impl From<Question> for QuestionRecord {
    fn from(q: Question) -> Self {
        let kind = q.kind();
        let wrap = |fields: Vec<Field>| -> Option<Vec<Option<Field>>> {
            Some(fields.into_iter().map(Some).collect())
        };
        let variants = match q.variants {
            Variants::SingleChoice { fields } => VariantsRecord {
                single_choice: Some(ChoiceRecord {
                    max: None,
                    fields: wrap(fields),
                }),
                multiple_choice: None,
            },
            Variants::MultipleChoice {
                max_choices,
                fields,
            } => VariantsRecord {
                single_choice: None,
                multiple_choice: Some(ChoiceRecord {
                    max: Some(max_choices),
                    fields: wrap(fields),
                }),
            },
            Variants::ManualInput => VariantsRecord::default(),
        };

        QuestionRecord {
            id: q.id,
            kind: kind.as_str().to_string(),
            short_text: q.short_text,
            long_text: q.long_text,
            required: q.required,
            points: q.points,
            variants,
            answers: q.answer_key.map(AnswerKeyRecord::from),
        }
    }
}
