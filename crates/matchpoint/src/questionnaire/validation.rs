use std::collections::HashSet;

use serde::Serialize;

use super::domain::{AnswerKind, QuestionDefinition, QuestionId, RawAnswer};

/// Relative slack when checking that a slider value sits on the step grid.
const STEP_TOLERANCE: f64 = 1e-6;

/// Why a raw answer does not satisfy its question.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("an answer is required")]
    Missing,
    #[error("expected a {expected} answer, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("answer cannot be blank")]
    BlankText,
    #[error("`{0}` is not one of the available options")]
    UnknownOption(String),
    #[error("select at least one option")]
    EmptySelection,
    #[error("`{0}` was selected more than once")]
    DuplicateSelection(String),
    #[error("value {value} is outside [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("value {value} is not a multiple of {step} from {min}")]
    OffStep { value: f64, min: f64, step: f64 },
    #[error("value must be a finite number")]
    NotFinite,
    #[error("rank between 1 and {max} options, got {found}")]
    RankCount { max: usize, found: usize },
}

/// Validation failure tied to the question that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("question `{question_id}`: {reason}")]
pub struct QuestionValidationError {
    pub question_id: QuestionId,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: ValidationError,
}

fn serialize_reason<S>(reason: &ValidationError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(reason)
}

/// Check `answer` against the type and constraints of `question`.
pub fn validate(question: &QuestionDefinition, answer: &RawAnswer) -> Result<(), ValidationError> {
    match (&question.kind, answer) {
        (AnswerKind::Text, RawAnswer::Text(text)) => {
            if text.trim().is_empty() {
                Err(ValidationError::BlankText)
            } else {
                Ok(())
            }
        }
        (AnswerKind::SingleChoice { options, .. }, RawAnswer::SingleChoice(value)) => {
            require_member(options, value)
        }
        (AnswerKind::MultiChoice { options, .. }, RawAnswer::MultiChoice(selected)) => {
            if selected.is_empty() {
                return Err(ValidationError::EmptySelection);
            }
            check_distinct_members(options, selected)
        }
        (AnswerKind::NumericSlider { min, max, step }, RawAnswer::NumericSlider(value)) => {
            check_slider(*value, *min, *max, *step)
        }
        (
            AnswerKind::RankedChoice {
                options,
                max_rank_count,
                ..
            },
            RawAnswer::RankedChoice(ranking),
        ) => {
            if ranking.is_empty() || ranking.len() > *max_rank_count {
                return Err(ValidationError::RankCount {
                    max: *max_rank_count,
                    found: ranking.len(),
                });
            }
            check_distinct_members(options, ranking)
        }
        (kind, answer) => Err(ValidationError::TypeMismatch {
            expected: kind.label(),
            found: answer.label(),
        }),
    }
}

/// Like [`validate`], treating an absent answer as a failure.
pub fn validate_present(
    question: &QuestionDefinition,
    answer: Option<&RawAnswer>,
) -> Result<(), QuestionValidationError> {
    let outcome = match answer {
        Some(answer) => validate(question, answer),
        None => Err(ValidationError::Missing),
    };
    outcome.map_err(|reason| QuestionValidationError {
        question_id: question.id.clone(),
        reason,
    })
}

fn require_member(options: &[String], value: &str) -> Result<(), ValidationError> {
    if options.iter().any(|option| option == value) {
        Ok(())
    } else {
        Err(ValidationError::UnknownOption(value.to_string()))
    }
}

fn check_distinct_members(options: &[String], values: &[String]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(values.len());
    for value in values {
        require_member(options, value)?;
        if !seen.insert(value.as_str()) {
            return Err(ValidationError::DuplicateSelection(value.clone()));
        }
    }
    Ok(())
}

fn check_slider(value: f64, min: f64, max: f64, step: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite);
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { value, min, max });
    }

    if !on_step_grid(value - min, step) {
        return Err(ValidationError::OffStep { value, min, step });
    }
    Ok(())
}

/// Whether `offset` is a whole number of `step`s, measured in steps.
pub(crate) fn on_step_grid(offset: f64, step: f64) -> bool {
    let steps = offset / step;
    (steps - steps.round()).abs() <= STEP_TOLERANCE
}
