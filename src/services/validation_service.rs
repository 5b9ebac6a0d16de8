use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::answer::{AnswerValue, UserAnswer};
use crate::models::question::{AnswerKey, Field, Question, Variants};
use crate::models::test::{Test, TestKind};

/// Authoring-time and answer-time checks. Stateless; every call depends only
/// on its arguments.
pub struct ValidationService;

/// Upper bound on a question's points, keeps strict scoring far from overflow.
pub const MAX_POINTS: i64 = i32::MAX as i64;

fn rejected(reason: impl Into<String>) -> Error {
    let reason = reason.into();
    tracing::warn!(reason = %reason, "test validation failed");
    Error::FailedValidation(reason)
}

fn rejected_answer(question_id: i64, reason: impl Into<String>) -> Error {
    let reason = reason.into();
    tracing::warn!(question_id, reason = %reason, "user answer validation failed");
    Error::FailedAnswerValidation(format!("question {}: {}", question_id, reason))
}

impl ValidationService {
    /// Validates an authored test against the rules of its kind.
    pub fn validate_test(test: &Test) -> Result<()> {
        if test.questions.is_empty() {
            return Err(rejected("test has no questions"));
        }

        let mut seen = HashSet::with_capacity(test.questions.len());
        for q in &test.questions {
            if q.id <= 0 {
                return Err(rejected(format!("question id {} is 0 or less", q.id)));
            }
            if !seen.insert(q.id) {
                return Err(rejected(format!("repeated question id {}", q.id)));
            }
        }

        for q in &test.questions {
            match q.points {
                Some(points) if points > MAX_POINTS => {
                    return Err(rejected(format!(
                        "question {} has more than {} points",
                        q.id, MAX_POINTS
                    )))
                }
                Some(points) if points > 0 => {}
                _ if test.kind == TestKind::StrictTest => {
                    return Err(rejected(format!(
                        "question {} has no positive points",
                        q.id
                    )))
                }
                _ => {}
            }
            Self::validate_question(q, test.kind.checks_answers())?;
        }

        Ok(())
    }

    /// Checks one question's variants and, when `check_answers` is set, its answer key.
    pub fn validate_question(q: &Question, check_answers: bool) -> Result<()> {
        match &q.variants {
            Variants::SingleChoice { fields } => {
                if fields.is_empty() {
                    return Err(rejected(format!("question {}: zero variants", q.id)));
                }
                Self::validate_fields(fields)?;

                if check_answers {
                    let correct_id = match &q.answer_key {
                        Some(AnswerKey::SingleChoice { correct_id }) => *correct_id,
                        Some(other) => {
                            return Err(rejected(format!(
                                "question {}: {} answer key on a single choice question",
                                q.id,
                                other.kind()
                            )))
                        }
                        None => {
                            return Err(rejected(format!(
                                "question {}: no correct id for single choice",
                                q.id
                            )))
                        }
                    };
                    if !q.variants.has_field(correct_id) {
                        return Err(rejected(format!(
                            "question {}: correct id {} does not point to a field",
                            q.id, correct_id
                        )));
                    }
                }
            }
            Variants::MultipleChoice {
                max_choices,
                fields,
            } => {
                if fields.is_empty() || *max_choices <= 0 {
                    return Err(rejected(format!(
                        "question {}: no fields or zero max choices",
                        q.id
                    )));
                }
                Self::validate_fields(fields)?;

                if check_answers {
                    let correct_ids = match &q.answer_key {
                        Some(AnswerKey::MultipleChoice { correct_ids }) => correct_ids,
                        Some(other) => {
                            return Err(rejected(format!(
                                "question {}: {} answer key on a multiple choice question",
                                q.id,
                                other.kind()
                            )))
                        }
                        None => {
                            return Err(rejected(format!(
                                "question {}: no correct ids for multiple choice",
                                q.id
                            )))
                        }
                    };
                    if correct_ids.is_empty() {
                        return Err(rejected(format!("question {}: no correct answers", q.id)));
                    }
                    if has_repeats(correct_ids) {
                        return Err(rejected(format!(
                            "question {}: repeated ids in correct ids",
                            q.id
                        )));
                    }

                    if let Some(id) = correct_ids.iter().find(|id| !q.variants.has_field(**id)) {
                        return Err(rejected(format!(
                            "question {}: correct id {} is not a field",
                            q.id, id
                        )));
                    }
                    let count = correct_ids.len();
                    if count as i64 > *max_choices {
                        return Err(rejected(format!(
                            "question {}: {} correct answers exceed max choices {}",
                            q.id, count, max_choices
                        )));
                    }
                }
            }
            Variants::ManualInput => {
                if check_answers {
                    match &q.answer_key {
                        Some(AnswerKey::ManualInput { correct_text }) if !correct_text.is_empty() => {}
                        Some(AnswerKey::ManualInput { .. }) => {
                            return Err(rejected(format!(
                                "question {}: correct text is empty",
                                q.id
                            )))
                        }
                        Some(other) => {
                            return Err(rejected(format!(
                                "question {}: {} answer key on a manual input question",
                                q.id,
                                other.kind()
                            )))
                        }
                        None => {
                            return Err(rejected(format!(
                                "question {}: no correct text for manual input",
                                q.id
                            )))
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Field ids must be positive and unique within the question.
    pub fn validate_fields(fields: &[Field]) -> Result<()> {
        let mut met = HashSet::with_capacity(fields.len());
        for f in fields {
            if f.id <= 0 {
                return Err(rejected(format!("field id {} is 0 or less", f.id)));
            }
            if !met.insert(f.id) {
                return Err(rejected(format!("repeated field id {}", f.id)));
            }
        }
        Ok(())
    }

    /// Checks that a respondent's answer is well-formed for the question and
    /// only references fields the question has.
    ///
    /// The number of chosen fields is not compared against `max_choices`, and
    /// written text may be empty.
    pub fn validate_answer(question: &Question, answer: &UserAnswer) -> Result<()> {
        match (&question.variants, &answer.value) {
            (Variants::SingleChoice { .. }, Some(AnswerValue::ChosenField(id))) => {
                if !question.variants.has_field(*id) {
                    return Err(rejected_answer(
                        question.id,
                        format!("chosen id {} is not in variants", id),
                    ));
                }
            }
            (Variants::SingleChoice { .. }, _) => {
                return Err(rejected_answer(question.id, "no chosen id"));
            }
            (Variants::MultipleChoice { .. }, Some(AnswerValue::ChosenFields(ids))) => {
                if ids.is_empty() {
                    return Err(rejected_answer(question.id, "empty chosen ids"));
                }
                if has_repeats(ids) {
                    return Err(rejected_answer(question.id, "repeated chosen ids"));
                }
                if let Some(id) = ids.iter().find(|id| !question.variants.has_field(**id)) {
                    return Err(rejected_answer(
                        question.id,
                        format!("chosen id {} is not in variants", id),
                    ));
                }
            }
            (Variants::MultipleChoice { .. }, _) => {
                return Err(rejected_answer(question.id, "no chosen ids"));
            }
            (Variants::ManualInput, Some(AnswerValue::WrittenText(_))) => {}
            (Variants::ManualInput, _) => {
                return Err(rejected_answer(question.id, "no written text"));
            }
        }

        Ok(())
    }
}

fn has_repeats(ids: &[i64]) -> bool {
    let mut met = HashSet::with_capacity(ids.len());
    ids.iter().any(|id| !met.insert(*id))
}
