use std::collections::BTreeMap;

use crate::models::answer::{is_answered, AnswerMap, AnswerValue};
use crate::models::question::{Difficulty, Question, QuestionDetails, QuestionType};
use crate::models::result::{BucketStats, Outcome, QuestionOutcome, QuizResult, TimingStats};

pub struct ScoringService;

impl ScoringService {
    /// Scores one attempt. Pure: identical inputs always give identical results.
    pub fn score(questions: &[Question], answers: &AnswerMap, time_taken: u64) -> QuizResult {
        let mut correct: u32 = 0;
        let mut incorrect: u32 = 0;
        let mut unanswered: u32 = 0;
        let mut coding_points = 0.0;
        let mut difficulty_stats: BTreeMap<Difficulty, BucketStats> = Difficulty::ALL
            .iter()
            .map(|d| (*d, BucketStats::default()))
            .collect();
        let mut type_stats: BTreeMap<QuestionType, BucketStats> = QuestionType::ALL
            .iter()
            .map(|t| (*t, BucketStats::default()))
            .collect();
        let mut outcomes = Vec::with_capacity(questions.len());

        for q in questions {
            let answer = answers.get(&q.id);
            let mut points = None;

            let outcome = if !is_answered(answer) {
                unanswered += 1;
                Outcome::Unanswered
            } else {
                let is_correct = match answer {
                    Some(AnswerValue::Code(code)) if q.question_type == QuestionType::Coding => {
                        points = code.points;
                        coding_points += code.points.unwrap_or(0.0);
                        code.points.is_some_and(|p| p > 0.0)
                    }
                    Some(value) => match check_answer(q, value) {
                        Some(ok) => ok,
                        None => {
                            tracing::warn!(
                                question_id = %q.id,
                                question_type = ?q.question_type,
                                "Question cannot be graded, counting it as incorrect"
                            );
                            false
                        }
                    },
                    None => false,
                };
                if is_correct {
                    correct += 1;
                    Outcome::Correct
                } else {
                    incorrect += 1;
                    Outcome::Incorrect
                }
            };

            let hit = u32::from(outcome == Outcome::Correct);
            if let Some(bucket) = difficulty_stats.get_mut(&q.difficulty) {
                bucket.total += 1;
                bucket.correct += hit;
            }
            if let Some(bucket) = type_stats.get_mut(&q.question_type) {
                bucket.total += 1;
                bucket.correct += hit;
            }

            outcomes.push(QuestionOutcome {
                question_id: q.id.clone(),
                question_type: q.question_type,
                difficulty: q.difficulty,
                outcome,
                points,
            });
        }

        let total_questions = saturating_count(questions.len());
        let average_seconds_per_question = if total_questions > 0 {
            time_taken as f64 / total_questions as f64
        } else {
            0.0
        };

        QuizResult {
            total_questions,
            correct,
            incorrect,
            unanswered,
            score: percent(correct, total_questions),
            accuracy: percent(correct, (correct + incorrect).max(1)),
            difficulty_stats,
            type_stats,
            coding_points,
            timing: TimingStats {
                time_taken_seconds: time_taken,
                average_seconds_per_question,
                total_time_limit_seconds: questions
                    .iter()
                    .filter_map(|q| q.time_limit)
                    .map(u64::from)
                    .sum(),
            },
            questions: outcomes,
        }
    }
}

/// Correctness of an answered mcq/fill question, or `None` when the question
/// definition does not allow grading it.
fn check_answer(q: &Question, value: &AnswerValue) -> Option<bool> {
    match (q.question_type, &q.details) {
        (QuestionType::Mcq, QuestionDetails::MultipleChoice(mc)) => {
            if mc.options.is_empty() {
                return None;
            }
            Some(matches!(value, AnswerValue::Choice(idx) if *idx == mc.correct_answer))
        }
        (QuestionType::Fill, QuestionDetails::Fill(fill)) => Some(match value {
            AnswerValue::Text(text) => {
                text.trim().to_lowercase() == fill.correct_answer.trim().to_lowercase()
            }
            _ => false,
        }),
        _ => None,
    }
}

fn saturating_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// `round(100 * part / whole)` with half-up rounding, 0 for an empty whole.
pub fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u64::from(part), u64::from(whole));
    ((200 * part + whole) / (2 * whole)) as u32
}
