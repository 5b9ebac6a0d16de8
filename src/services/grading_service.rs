use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::answer::{AnswerValue, UserAnswer};
use crate::models::question::{AnswerKey, Question};
use crate::models::result::TestResult;
use crate::models::test::{Test, TestKind};
use crate::services::validation_service::ValidationService;

pub struct GradingService;

impl GradingService {
    /// Folds a respondent's answers into a result. Nothing is persisted here.
    ///
    /// Skipped optional questions are recorded as placeholders; a skipped
    /// required question or a malformed answer aborts the whole submission.
    pub fn grade(
        test: &Test,
        respondent_id: i64,
        answers: &HashMap<i64, UserAnswer>,
    ) -> Result<TestResult> {
        let mut recorded = Vec::with_capacity(test.questions.len());
        for q in &test.questions {
            match answers.get(&q.id) {
                Some(answer) => {
                    ValidationService::validate_answer(q, answer)?;
                    recorded.push(answer.clone());
                }
                None if q.required => {
                    tracing::warn!(test_id = %test.id, question_id = q.id, "required question was not answered");
                    return Err(Error::MissingRequiredAnswer(q.id));
                }
                None => recorded.push(UserAnswer::placeholder()),
            }
        }

        let percentage = match test.kind {
            TestKind::Form | TestKind::Quiz => None,
            TestKind::StrictTest => Some(Self::strict_percentage(&test.questions, &recorded)?),
            TestKind::ScoredTest => {
                return Err(Error::Unimplemented(
                    "saving results for tests of type `test`".to_string(),
                ))
            }
        };

        Ok(TestResult::new(
            test.id.clone(),
            respondent_id,
            recorded,
            percentage,
        ))
    }

    /// `100 * earned / max`, rounded down. `answers` is aligned with `questions`.
    fn strict_percentage(questions: &[Question], answers: &[UserAnswer]) -> Result<i64> {
        let overflow = || Error::Internal("strict test points overflow".to_string());
        let mut max_points: i64 = 0;
        let mut earned_points: i64 = 0;

        for (q, answer) in questions.iter().zip(answers) {
            let points = q.points.ok_or_else(|| {
                Error::Internal(format!("strict test question {} has no points", q.id))
            })?;
            max_points = max_points.checked_add(points).ok_or_else(overflow)?;

            if answer.is_placeholder() {
                continue;
            }
            let score = Self::score_question(q, answer)?;
            let earned = points.checked_mul(score).ok_or_else(overflow)? / 100;
            earned_points = earned_points.checked_add(earned).ok_or_else(overflow)?;
        }

        if max_points <= 0 {
            return Err(Error::Internal(
                "strict test has no points to earn".to_string(),
            ));
        }

        Ok(earned_points.checked_mul(100).ok_or_else(overflow)? / max_points)
    }

    /// Correctness of one answer in the range 0..=100.
    ///
    /// Multiple choice gives partial credit for each correct field picked;
    /// wrong picks cost nothing. Manual input compares text exactly.
    pub fn score_question(q: &Question, answer: &UserAnswer) -> Result<i64> {
        let key = q.answer_key.as_ref().ok_or_else(|| {
            Error::Internal(format!("question {} has no answer key", q.id))
        })?;

        let score = match (key, &answer.value) {
            (AnswerKey::SingleChoice { correct_id }, Some(AnswerValue::ChosenField(chosen))) => {
                if chosen == correct_id {
                    100
                } else {
                    0
                }
            }
            (
                AnswerKey::MultipleChoice { correct_ids },
                Some(AnswerValue::ChosenFields(chosen)),
            ) => {
                if correct_ids.is_empty() {
                    return Err(Error::Internal(format!(
                        "question {} has an empty answer key",
                        q.id
                    )));
                }
                let hits = correct_ids.iter().filter(|id| chosen.contains(*id)).count() as i64;
                100 * hits / correct_ids.len() as i64
            }
            (AnswerKey::ManualInput { correct_text }, Some(AnswerValue::WrittenText(text))) => {
                if text == correct_text {
                    100
                } else {
                    0
                }
            }
            _ => {
                return Err(Error::Internal(format!(
                    "answer to question {} does not match its answer key",
                    q.id
                )))
            }
        };

        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Field, Variants};
    use std::collections::BTreeSet;

    fn question(id: i64, points: Option<i64>, required: bool, variants: Variants, key: AnswerKey) -> Question {
        Question {
            id,
            short_text: format!("Question {}", id),
            long_text: None,
            required,
            points,
            variants,
            answer_key: Some(key),
        }
    }

    fn capital(id: i64, points: Option<i64>, required: bool) -> Question {
        question(
            id,
            points,
            required,
            Variants::SingleChoice {
                fields: vec![Field::new(1, "Paris"), Field::new(2, "Rome")],
            },
            AnswerKey::SingleChoice { correct_id: 1 },
        )
    }

    fn primes(id: i64, points: Option<i64>) -> Question {
        question(
            id,
            points,
            false,
            Variants::MultipleChoice {
                max_choices: 3,
                fields: (1..=4).map(|i| Field::new(i, i.to_string())).collect(),
            },
            AnswerKey::MultipleChoice {
                correct_ids: vec![2, 3],
            },
        )
    }

    fn spelling(id: i64, points: Option<i64>, required: bool) -> Question {
        question(
            id,
            points,
            required,
            Variants::ManualInput,
            AnswerKey::ManualInput {
                correct_text: "rhythm".into(),
            },
        )
    }

    fn test_of(kind: TestKind, questions: Vec<Question>) -> Test {
        Test {
            id: "t-1".into(),
            title: "Sample".into(),
            kind,
            owner_id: 1,
            short_text: "short".into(),
            long_text: "long".into(),
            main_image: None,
            questions,
            tags: BTreeSet::new(),
        }
    }

    fn answers(list: Vec<UserAnswer>) -> HashMap<i64, UserAnswer> {
        list.into_iter().map(|a| (a.question_id, a)).collect()
    }

    #[test]
    fn strict_test_weights_points() {
        let test = test_of(
            TestKind::StrictTest,
            vec![capital(1, Some(60), true), spelling(2, Some(40), true)],
        );
        let submitted = answers(vec![
            UserAnswer::new(1, AnswerValue::ChosenField(1)),
            UserAnswer::new(2, AnswerValue::WrittenText("rythm".into())),
        ]);

        let result = GradingService::grade(&test, 9, &submitted).unwrap();
        assert_eq!(result.percentage, Some(60));
        assert_eq!(result.respondent_id, 9);
        assert_eq!(result.test_id, "t-1");
        assert_eq!(result.user_answers.len(), 2);
    }

    #[test]
    fn partial_credit_for_multiple_choice() {
        let q = primes(1, Some(10));
        let score = |ids: Vec<i64>| {
            GradingService::score_question(&q, &UserAnswer::new(1, AnswerValue::ChosenFields(ids)))
                .unwrap()
        };
        assert_eq!(score(vec![2]), 50);
        assert_eq!(score(vec![2, 3]), 100);
        assert_eq!(score(vec![1, 2, 3, 4]), 100);
        assert_eq!(score(vec![1, 4]), 0);
    }

    #[test]
    fn empty_chosen_set_is_rejected_not_scored() {
        let test = test_of(TestKind::StrictTest, vec![primes(1, Some(10))]);
        let submitted = answers(vec![UserAnswer::new(1, AnswerValue::ChosenFields(vec![]))]);
        assert!(matches!(
            GradingService::grade(&test, 1, &submitted),
            Err(Error::FailedAnswerValidation(_))
        ));
    }

    #[test]
    fn manual_input_is_case_sensitive() {
        let q = spelling(1, Some(5), false);
        let score = |text: &str| {
            GradingService::score_question(&q, &UserAnswer::new(1, AnswerValue::WrittenText(text.into())))
                .unwrap()
        };
        assert_eq!(score("rhythm"), 100);
        assert_eq!(score("Rhythm"), 0);
    }

    #[test]
    fn missing_required_answer_aborts() {
        let test = test_of(
            TestKind::Form,
            vec![capital(1, None, false), capital(2, None, true)],
        );
        let submitted = answers(vec![UserAnswer::new(1, AnswerValue::ChosenField(2))]);
        assert!(matches!(
            GradingService::grade(&test, 1, &submitted),
            Err(Error::MissingRequiredAnswer(2))
        ));
    }

    #[test]
    fn forms_record_placeholders_for_skipped_questions() {
        let test = test_of(
            TestKind::Quiz,
            vec![capital(1, None, false), spelling(2, None, false)],
        );
        let submitted = answers(vec![UserAnswer::new(
            2,
            AnswerValue::WrittenText(String::new()),
        )]);

        let result = GradingService::grade(&test, 3, &submitted).unwrap();
        assert_eq!(result.percentage, None);
        assert!(result.user_answers[0].is_placeholder());
        assert_eq!(result.user_answers[1].question_id, 2);
    }

    #[test]
    fn skipped_strict_question_earns_nothing() {
        let test = test_of(
            TestKind::StrictTest,
            vec![capital(1, Some(30), false), primes(2, Some(70))],
        );
        let submitted = answers(vec![UserAnswer::new(2, AnswerValue::ChosenFields(vec![3]))]);

        // 70 * 50 / 100 = 35 of 100
        let result = GradingService::grade(&test, 1, &submitted).unwrap();
        assert_eq!(result.percentage, Some(35));
    }

    #[test]
    fn percentage_stays_within_bounds() {
        let test = test_of(
            TestKind::StrictTest,
            vec![capital(1, Some(7), false), primes(2, Some(13)), spelling(3, Some(1), false)],
        );
        let picks: Vec<Vec<i64>> = vec![vec![1], vec![2], vec![3], vec![2, 3], vec![1, 2, 3, 4]];
        for chosen in [1, 2] {
            for pick in &picks {
                for text in ["rhythm", "nope"] {
                    let submitted = answers(vec![
                        UserAnswer::new(1, AnswerValue::ChosenField(chosen)),
                        UserAnswer::new(2, AnswerValue::ChosenFields(pick.clone())),
                        UserAnswer::new(3, AnswerValue::WrittenText(text.into())),
                    ]);
                    let p = GradingService::grade(&test, 1, &submitted)
                        .unwrap()
                        .percentage
                        .unwrap();
                    assert!((0..=100).contains(&p), "percentage {} out of bounds", p);
                }
            }
        }
    }

    #[test]
    fn oversized_points_fail_without_panicking() {
        let huge = i64::MAX / 50;
        let test = test_of(
            TestKind::StrictTest,
            vec![capital(1, Some(huge), true), spelling(2, Some(huge), true)],
        );
        let submitted = answers(vec![
            UserAnswer::new(1, AnswerValue::ChosenField(1)),
            UserAnswer::new(2, AnswerValue::WrittenText("rhythm".into())),
        ]);
        assert!(matches!(
            GradingService::grade(&test, 1, &submitted),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn largest_accepted_points_still_score() {
        let max = crate::services::validation_service::MAX_POINTS;
        let test = test_of(
            TestKind::StrictTest,
            vec![capital(1, Some(max), true), spelling(2, Some(max), true)],
        );
        ValidationService::validate_test(&test).unwrap();
        let submitted = answers(vec![
            UserAnswer::new(1, AnswerValue::ChosenField(1)),
            UserAnswer::new(2, AnswerValue::WrittenText("nope".into())),
        ]);
        let result = GradingService::grade(&test, 1, &submitted).unwrap();
        assert_eq!(result.percentage, Some(50));
    }

    #[test]
    fn scored_test_results_are_not_implemented() {
        let test = test_of(TestKind::ScoredTest, vec![capital(1, None, false)]);
        let submitted = answers(vec![UserAnswer::new(1, AnswerValue::ChosenField(1))]);
        assert!(matches!(
            GradingService::grade(&test, 1, &submitted),
            Err(Error::Unimplemented(_))
        ));
    }

    #[test]
    fn answers_to_unknown_questions_are_ignored() {
        let test = test_of(TestKind::Form, vec![capital(1, None, true)]);
        let submitted = answers(vec![
            UserAnswer::new(1, AnswerValue::ChosenField(1)),
            UserAnswer::new(99, AnswerValue::ChosenField(1)),
        ]);
        let result = GradingService::grade(&test, 1, &submitted).unwrap();
        assert_eq!(result.user_answers.len(), 1);
    }
}
