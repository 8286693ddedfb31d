use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::question::QuestionType;

/// Recorded answers keyed by question id.
pub type AnswerMap = BTreeMap<String, AnswerValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Selected option index of a multiple-choice question.
    Choice(i64),
    Text(String),
    Code(CodingAnswer),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingAnswer {
    pub code: String,
    pub language: String,
    /// Opaque verdict returned by the coding judge, stored verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
}

impl CodingAnswer {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            submission: None,
            points: None,
        }
    }
}

impl AnswerValue {
    /// Whether this value has the shape expected for `question_type`.
    /// An empty string is accepted for every type since it means "clear".
    pub fn fits(&self, question_type: QuestionType) -> bool {
        match (self, question_type) {
            (AnswerValue::Text(s), _) if s.is_empty() => true,
            (AnswerValue::Choice(_), QuestionType::Mcq) => true,
            (AnswerValue::Text(_), QuestionType::Fill) => true,
            (AnswerValue::Code(_), QuestionType::Coding) => true,
            _ => false,
        }
    }
}

/// The single definition of "answered": a missing entry and an empty string
/// are the same thing everywhere answers are counted.
pub fn is_answered(value: Option<&AnswerValue>) -> bool {
    match value {
        None => false,
        Some(AnswerValue::Text(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Answered,
    NotAnswered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionStatus {
    pub question_id: String,
    pub status: AnswerStatus,
}

pub fn answer_status(answers: &AnswerMap, question_id: &str) -> AnswerStatus {
    if is_answered(answers.get(question_id)) {
        AnswerStatus::Answered
    } else {
        AnswerStatus::NotAnswered
    }
}
