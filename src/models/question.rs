use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::answer::AnswerValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Advisory seconds for this question. Never gates submission.
    #[serde(default, alias = "timeLimit", skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(flatten)]
    pub details: QuestionDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Fill,
    Coding,
}

impl QuestionType {
    pub const ALL: [QuestionType; 3] = [QuestionType::Mcq, QuestionType::Fill, QuestionType::Coding];

    /// Types whose editable value lives in the session draft between edits.
    pub fn uses_draft(self) -> bool {
        matches!(self, QuestionType::Mcq | QuestionType::Fill)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionDetails {
    MultipleChoice(MultipleChoiceDetails),
    Fill(FillDetails),
    Coding(CodingDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceDetails {
    pub options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    pub correct_answer: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillDetails {
    #[serde(alias = "correctAnswer")]
    pub correct_answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodingDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, alias = "starterCode", skip_serializing_if = "Option::is_none")]
    pub starter_code: Option<String>,
}

impl Question {
    pub fn mcq(id: &str, options: &[&str], correct_answer: i64) -> Self {
        Self {
            id: id.to_string(),
            question_type: QuestionType::Mcq,
            question: String::new(),
            difficulty: Difficulty::default(),
            time_limit: None,
            details: QuestionDetails::MultipleChoice(MultipleChoiceDetails {
                options: options.iter().map(|o| o.to_string()).collect(),
                correct_answer,
            }),
        }
    }

    pub fn fill(id: &str, correct_answer: &str) -> Self {
        Self {
            id: id.to_string(),
            question_type: QuestionType::Fill,
            question: String::new(),
            difficulty: Difficulty::default(),
            time_limit: None,
            details: QuestionDetails::Fill(FillDetails {
                correct_answer: correct_answer.to_string(),
            }),
        }
    }

    pub fn coding(id: &str, language: &str) -> Self {
        Self {
            id: id.to_string(),
            question_type: QuestionType::Coding,
            question: String::new(),
            difficulty: Difficulty::default(),
            time_limit: None,
            details: QuestionDetails::Coding(CodingDetails {
                language: Some(language.to_string()),
                starter_code: None,
            }),
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Whether `value` can be stored as an answer to this question: the right
    /// shape, and for multiple choice an index into `options`.
    pub fn accepts(&self, value: &AnswerValue) -> bool {
        if !value.fits(self.question_type) {
            return false;
        }
        match (value, &self.details) {
            (AnswerValue::Choice(idx), QuestionDetails::MultipleChoice(mc)) => {
                usize::try_from(*idx).is_ok_and(|i| i < mc.options.len())
            }
            _ => true,
        }
    }
}

/// Question ids must be non-empty and unique within one question set.
pub fn validate_question_ids(questions: &[Question]) -> Result<()> {
    let mut seen = HashSet::with_capacity(questions.len());
    for q in questions {
        if q.id.trim().is_empty() {
            return Err(Error::BadRequest("Question id must not be empty".to_string()));
        }
        if !seen.insert(q.id.as_str()) {
            return Err(Error::BadRequest(format!("Duplicate question id: {}", q.id)));
        }
    }
    Ok(())
}
