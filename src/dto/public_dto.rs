use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::answer::{AnswerMap, AnswerStatus, AnswerValue, CodingAnswer, QuestionStatus};
use crate::models::question::{Difficulty, Question, QuestionDetails, QuestionType};
use crate::services::session::{QuizSession, SessionPhase};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartQuizRequest {
    #[validate(length(max = 500))]
    pub questions: Vec<Question>,
    #[validate(range(min = 1, max = 86400))]
    pub test_duration_seconds: u32,
}

/// Question as shown to the candidate, without its answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starter_code: Option<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        let (options, language, starter_code) = match &q.details {
            QuestionDetails::MultipleChoice(mc) => (Some(mc.options.clone()), None, None),
            QuestionDetails::Fill(_) => (None, None, None),
            QuestionDetails::Coding(c) => (None, c.language.clone(), c.starter_code.clone()),
        };
        Self {
            id: q.id.clone(),
            question_type: q.question_type,
            question: q.question.clone(),
            difficulty: q.difficulty,
            time_limit: q.time_limit,
            options,
            language,
            starter_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartQuizResponse {
    pub session_token: String,
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub time_left: u32,
    pub total_questions: usize,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub session_id: Uuid,
    pub status: SessionPhase,
    pub current_question_index: usize,
    pub current_question_id: Option<String>,
    pub time_left: u32,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub questions_answered: usize,
    pub total_questions: usize,
    pub statuses: Vec<QuestionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<AnswerValue>,
}

impl From<&QuizSession> for SessionStatusResponse {
    fn from(session: &QuizSession) -> Self {
        Self {
            session_id: session.id(),
            status: session.phase(),
            current_question_index: session.current_index(),
            current_question_id: session.current_question().map(|q| q.id.clone()),
            time_left: session.time_left(),
            started_at: session.started_at(),
            expires_at: session.expires_at(),
            questions_answered: session.answered_count(),
            total_questions: session.questions().len(),
            statuses: session.statuses(),
            draft: session.draft().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRequest {
    pub answer: AnswerValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    #[validate(length(min = 1, max = 128))]
    pub question_id: String,
    #[serde(default)]
    pub answer: Option<AnswerValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAnswerResponse {
    pub saved: bool,
    pub question_id: String,
    pub status: AnswerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateRequest {
    pub target_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitCodeRequest {
    #[validate(length(min = 1, max = 128))]
    pub question_id: String,
    #[validate(length(max = 100000))]
    pub code: String,
    #[validate(length(min = 1, max = 32))]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitCodeResponse {
    pub question_id: String,
    pub answer: CodingAnswer,
    pub judged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub persisted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScoreRequest {
    #[validate(length(max = 500))]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: AnswerMap,
    #[serde(default)]
    pub time_taken: u64,
}
