//! Tax-year questionnaire: question definitions and answer validation.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Maximum length of a free-text answer.
pub const MAX_TEXT_ANSWER_LENGTH: usize = 10_000;

/// Maximum length of a question prompt.
pub const MAX_PROMPT_LENGTH: usize = 1_000;

pub const ANSWER_YES_NO: &str = "yes_no";
pub const ANSWER_TEXT: &str = "text";
pub const ANSWER_NUMBER: &str = "number";
pub const ANSWER_CHOICE: &str = "choice";

/// All valid answer type strings.
pub const VALID_ANSWER_TYPES: &[&str] = &[ANSWER_YES_NO, ANSWER_TEXT, ANSWER_NUMBER, ANSWER_CHOICE];

/// How a question expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    YesNo,
    Text,
    Number,
    Choice,
}

impl AnswerType {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            ANSWER_YES_NO => Ok(Self::YesNo),
            ANSWER_TEXT => Ok(Self::Text),
            ANSWER_NUMBER => Ok(Self::Number),
            ANSWER_CHOICE => Ok(Self::Choice),
            _ => Err(format!(
                "Invalid answer type '{s}'. Must be one of: {}",
                VALID_ANSWER_TYPES.join(", ")
            )),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YesNo => ANSWER_YES_NO,
            Self::Text => ANSWER_TEXT,
            Self::Number => ANSWER_NUMBER,
            Self::Choice => ANSWER_CHOICE,
        }
    }
}

/// Validate a question definition.
pub fn validate_question(
    prompt: &str,
    answer_type: AnswerType,
    choices: &[String],
) -> Result<(), String> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err("Question prompt must not be empty".to_string());
    }
    if prompt.chars().count() > MAX_PROMPT_LENGTH {
        return Err(format!(
            "Question prompt must be at most {MAX_PROMPT_LENGTH} characters"
        ));
    }

    match answer_type {
        AnswerType::Choice => {
            if choices.iter().any(|c| c.trim().is_empty()) {
                return Err("Choices must not be empty".to_string());
            }
            let mut distinct: Vec<&str> = choices.iter().map(|c| c.trim()).collect();
            distinct.sort_unstable();
            distinct.dedup();
            if distinct.len() != choices.len() {
                return Err("Choices must be distinct".to_string());
            }
            if distinct.len() < 2 {
                return Err("Choice questions need at least two choices".to_string());
            }
        }
        _ if !choices.is_empty() => {
            return Err(format!(
                "Only choice questions may define choices, not '{}'",
                answer_type.as_str()
            ));
        }
        _ => {}
    }
    Ok(())
}

/// Validate an answer against its question, returning the stored form.
///
/// `yes_no` answers are normalised to lowercase; other values are trimmed.
pub fn validate_answer(
    answer_type: AnswerType,
    choices: &[String],
    value: &str,
) -> Result<String, String> {
    let value = value.trim();
    match answer_type {
        AnswerType::YesNo => {
            let lowered = value.to_ascii_lowercase();
            if lowered == "yes" || lowered == "no" {
                Ok(lowered)
            } else {
                Err("Answer must be 'yes' or 'no'".to_string())
            }
        }
        AnswerType::Number => {
            if is_plain_decimal(value) {
                Ok(value.to_string())
            } else {
                Err(format!("Answer '{value}' is not a number"))
            }
        }
        AnswerType::Choice => {
            if choices.iter().any(|c| c.trim() == value) {
                Ok(value.to_string())
            } else {
                Err(format!(
                    "Answer must be one of: {}",
                    choices.join(", ")
                ))
            }
        }
        AnswerType::Text => {
            if value.is_empty() {
                Err("Answer must not be empty".to_string())
            } else if value.chars().count() > MAX_TEXT_ANSWER_LENGTH {
                Err(format!(
                    "Answer must be at most {MAX_TEXT_ANSWER_LENGTH} characters"
                ))
            } else {
                Ok(value.to_string())
            }
        }
    }
}

/// An optional minus sign, digits, and an optional fractional part with at
/// least one digit. No exponent or leading `+`.
fn is_plain_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(whole) && fraction.map_or(true, digits)
}

/// Progress through the required questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub answered: usize,
    pub total: usize,
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        self.answered == self.total
    }
}

/// Count how many required questions have an answer.
pub fn completion(required_ids: &[DbId], answered_ids: &[DbId]) -> Completion {
    Completion {
        answered: required_ids
            .iter()
            .filter(|id| answered_ids.contains(id))
            .count(),
        total: required_ids.len(),
    }
}
