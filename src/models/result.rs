use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::answer::AnswerMap;
use crate::models::question::{Difficulty, QuestionType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStats {
    pub correct: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    Unanswered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub time_taken_seconds: u64,
    pub average_seconds_per_question: f64,
    /// Sum of the advisory per-question limits.
    pub total_time_limit_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub total_questions: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
    pub score: u32,
    pub accuracy: u32,
    pub difficulty_stats: BTreeMap<Difficulty, BucketStats>,
    pub type_stats: BTreeMap<QuestionType, BucketStats>,
    pub coding_points: f64,
    pub timing: TimingStats,
    pub questions: Vec<QuestionOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

/// Terminal hand-off of one attempt to whoever renders or stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub session_id: Uuid,
    pub answers: AnswerMap,
    pub result: QuizResult,
    pub time_taken: u64,
    pub completed_at: DateTime<Utc>,
    pub trigger: SubmitTrigger,
}
