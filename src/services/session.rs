use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::{
    answer_status, is_answered, AnswerMap, AnswerStatus, AnswerValue, QuestionStatus,
};
use crate::models::question::Question;
use crate::models::result::{SubmitTrigger, Submission};
use crate::services::scoring_service::ScoringService;
use crate::utils::time::{seconds_between, Clock};

pub const DEFAULT_WARNING_SECONDS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Active,
    /// Time ran out; only the forced submission may follow.
    Expired,
    Finished,
}

/// What a single countdown tick observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub time_left: u32,
    pub warning: bool,
    pub expired: bool,
}

/// One timed quiz attempt, from start to its single terminal submission.
pub struct QuizSession {
    id: Uuid,
    questions: Vec<Question>,
    test_duration: u32,
    warning_threshold: u32,
    clock: Arc<dyn Clock>,
    started_at: DateTime<Utc>,
    current_index: usize,
    time_left: u32,
    answers: AnswerMap,
    /// Uncommitted value of the current mcq/fill question.
    draft: Option<AnswerValue>,
    warning_fired: bool,
    phase: SessionPhase,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>, test_duration: u32, clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        Self {
            id: Uuid::new_v4(),
            questions,
            test_duration,
            warning_threshold: DEFAULT_WARNING_SECONDS,
            clock,
            started_at,
            current_index: 0,
            time_left: test_duration,
            answers: AnswerMap::new(),
            draft: None,
            warning_fired: false,
            phase: SessionPhase::Active,
        }
    }

    pub fn with_warning_threshold(mut self, seconds: u32) -> Self {
        self.warning_threshold = seconds;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn test_duration(&self) -> u32 {
        self.test_duration
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.started_at + chrono::Duration::seconds(i64::from(self.test_duration))
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn draft(&self) -> Option<&AnswerValue> {
        self.draft.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn warning_fired(&self) -> bool {
        self.warning_fired
    }

    /// Recomputes the remaining time from the start anchor.
    ///
    /// The warning latch fires at most once, the first time the remaining
    /// time is at or below the threshold, and only for quizzes that started
    /// above it. Expiry is reported on exactly one tick.
    pub fn tick(&mut self) -> Tick {
        if self.phase != SessionPhase::Active {
            return Tick {
                time_left: self.time_left,
                warning: false,
                expired: false,
            };
        }

        let elapsed = seconds_between(self.started_at, self.clock.now());
        let remaining = u64::from(self.test_duration).saturating_sub(elapsed) as u32;
        self.time_left = self.time_left.min(remaining);

        let mut warning = false;
        if !self.warning_fired
            && self.test_duration > self.warning_threshold
            && self.time_left <= self.warning_threshold
        {
            self.warning_fired = true;
            warning = self.time_left > 0;
        }

        let expired = self.time_left == 0;
        if expired {
            self.phase = SessionPhase::Expired;
        }

        Tick {
            time_left: self.time_left,
            warning,
            expired,
        }
    }

    /// Updates the in-progress value of the current question without
    /// committing it to the answer map.
    pub fn edit_draft(&mut self, value: AnswerValue) -> Result<()> {
        self.ensure_active()?;
        let question = self
            .current_question()
            .ok_or_else(|| Error::BadRequest("Quiz has no questions".to_string()))?;
        if !question.question_type.uses_draft() {
            return Err(Error::BadRequest(format!(
                "Question {} does not take draft answers",
                question.id
            )));
        }
        if !question.accepts(&value) {
            return Err(Error::BadRequest(format!(
                "Answer is not valid for question {}",
                question.id
            )));
        }
        self.draft = Some(value);
        Ok(())
    }

    /// Records an answer. `None` or an empty string clears it.
    /// Returns whether the answer map changed.
    pub fn record_answer(&mut self, question_id: &str, value: Option<AnswerValue>) -> Result<bool> {
        self.ensure_active()?;
        let position = self
            .questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| Error::NotFound(format!("Question {} not found", question_id)))?;
        let question_type = self.questions[position].question_type;

        if let Some(v) = &value {
            if !self.questions[position].accepts(v) {
                return Err(Error::BadRequest(format!(
                    "Answer is not valid for question {}",
                    question_id
                )));
            }
        }

        if position == self.current_index && question_type.uses_draft() {
            self.draft = value.clone();
        }
        Ok(self.commit(question_id, value))
    }

    /// Moves to `target`, committing the current draft first.
    /// Returns `false` when already on `target`.
    pub fn navigate(&mut self, target: usize) -> Result<bool> {
        self.ensure_active()?;
        if target == self.current_index {
            return Ok(false);
        }
        if target >= self.questions.len() {
            return Err(Error::BadRequest(format!(
                "Question index {} is out of range (0..{})",
                target,
                self.questions.len()
            )));
        }

        self.persist_pending();
        self.current_index = target;
        self.draft = self
            .current_question()
            .filter(|q| q.question_type.uses_draft())
            .and_then(|q| self.answers.get(&q.id).cloned());
        Ok(true)
    }

    /// Best-effort save when the client goes away. Not terminal.
    pub fn teardown(&mut self) -> bool {
        if self.phase == SessionPhase::Finished {
            return false;
        }
        self.persist_pending()
    }

    /// The single terminal transition.
    pub fn submit(&mut self, trigger: SubmitTrigger) -> Result<Submission> {
        if self.phase == SessionPhase::Finished {
            return Err(Error::Conflict("Quiz has already been submitted".to_string()));
        }

        self.persist_pending();
        self.phase = SessionPhase::Finished;

        let completed_at = self.clock.now();
        let time_taken =
            seconds_between(self.started_at, completed_at).min(u64::from(self.test_duration));
        let result = ScoringService::score(&self.questions, &self.answers, time_taken);

        Ok(Submission {
            session_id: self.id,
            answers: self.answers.clone(),
            result,
            time_taken,
            completed_at,
            trigger,
        })
    }

    pub fn statuses(&self) -> Vec<QuestionStatus> {
        self.questions
            .iter()
            .map(|q| QuestionStatus {
                question_id: q.id.clone(),
                status: answer_status(&self.answers, &q.id),
            })
            .collect()
    }

    pub fn answered_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| answer_status(&self.answers, &q.id) == AnswerStatus::Answered)
            .count()
    }

    fn persist_pending(&mut self) -> bool {
        let Some(question_id) = self
            .current_question()
            .filter(|q| q.question_type.uses_draft())
            .map(|q| q.id.clone())
        else {
            return false;
        };
        let draft = self.draft.clone();
        self.commit(&question_id, draft)
    }

    fn commit(&mut self, question_id: &str, value: Option<AnswerValue>) -> bool {
        let value = value.filter(|v| is_answered(Some(v)));
        if self.answers.get(question_id) == value.as_ref() {
            return false;
        }
        match value {
            Some(v) => {
                self.answers.insert(question_id.to_string(), v);
            }
            None => {
                self.answers.remove(question_id);
            }
        }
        true
    }

    fn ensure_active(&self) -> Result<()> {
        match self.phase {
            SessionPhase::Active => Ok(()),
            SessionPhase::Expired => Err(Error::Conflict("Quiz time has expired".to_string())),
            SessionPhase::Finished => {
                Err(Error::Conflict("Quiz has already been submitted".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answer::CodingAnswer;
    use crate::models::result::Outcome;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Utc::now())))
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.0.lock().unwrap();
            *now += chrono::Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn paper() -> Vec<Question> {
        vec![
            Question::fill("a", "foo"),
            Question::mcq("b", &["x", "y", "z"], 2),
            Question::coding("c", "rust"),
        ]
    }

    #[test]
    fn starts_at_first_question_with_full_time() {
        let clock = ManualClock::new();
        let session = QuizSession::new(paper(), 600, clock);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.time_left(), 600);
        assert!(session.answers().is_empty());
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn navigate_commits_the_draft_first() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 600, clock);

        assert_ok!(session.edit_draft(AnswerValue::Text("foo".into())));
        assert!(session.answers().get("a").is_none());

        assert!(assert_ok!(session.navigate(1)));
        assert_eq!(session.answers()["a"], AnswerValue::Text("foo".into()));
        assert_eq!(session.current_index(), 1);
        assert!(session.draft().is_none());
    }

    #[test]
    fn navigate_to_current_is_a_noop() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 600, clock);
        session.edit_draft(AnswerValue::Text("foo".into())).unwrap();
        assert!(!session.navigate(0).unwrap());
        assert!(session.answers().is_empty());
        assert_err!(session.navigate(3));
    }

    #[test]
    fn returning_to_a_question_restores_its_answer_as_draft() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 600, clock);
        session.edit_draft(AnswerValue::Text("foo".into())).unwrap();
        session.navigate(1).unwrap();
        session.navigate(0).unwrap();
        assert_eq!(session.draft(), Some(&AnswerValue::Text("foo".into())));
    }

    #[test]
    fn record_only_changes_map_on_new_values() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 600, clock);

        assert!(session.record_answer("b", Some(AnswerValue::Choice(2))).unwrap());
        assert!(!session.record_answer("b", Some(AnswerValue::Choice(2))).unwrap());
        assert!(session.record_answer("b", Some(AnswerValue::Choice(1))).unwrap());

        let code = CodingAnswer::new("fn main() {}", "rust");
        assert!(session.record_answer("c", Some(AnswerValue::Code(code.clone()))).unwrap());
        assert!(!session.record_answer("c", Some(AnswerValue::Code(code))).unwrap());
    }

    #[test]
    fn empty_string_clears_an_answer() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 600, clock);
        session.record_answer("a", Some(AnswerValue::Text("foo".into()))).unwrap();
        assert_eq!(session.answered_count(), 1);

        assert!(session.record_answer("a", Some(AnswerValue::Text(String::new()))).unwrap());
        assert!(!session.answers().contains_key("a"));
        assert_eq!(session.statuses()[0].status, AnswerStatus::NotAnswered);
        assert!(!session.record_answer("a", None).unwrap());
    }

    #[test]
    fn rejects_mismatched_answer_shapes() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 600, clock);
        assert_err!(session.record_answer("b", Some(AnswerValue::Text("y".into()))));
        assert_err!(session.record_answer("missing", Some(AnswerValue::Choice(0))));
        session.navigate(2).unwrap();
        assert_err!(session.edit_draft(AnswerValue::Text("x".into())));
    }

    #[test]
    fn rejects_choices_outside_the_options() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 600, clock);
        for idx in [3, 99, -1] {
            assert!(matches!(
                session.record_answer("b", Some(AnswerValue::Choice(idx))),
                Err(Error::BadRequest(_))
            ));
        }
        assert!(session.answers().is_empty());

        session.navigate(1).unwrap();
        assert!(matches!(
            session.edit_draft(AnswerValue::Choice(3)),
            Err(Error::BadRequest(_))
        ));
        assert_ok!(session.edit_draft(AnswerValue::Choice(2)));
        assert_eq!(session.draft(), Some(&AnswerValue::Choice(2)));
    }

    #[test]
    fn warning_fires_once_even_when_ticks_skip_the_threshold() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 600, clock.clone());

        clock.advance(1);
        assert!(!session.tick().warning);

        clock.advance(310);
        let tick = session.tick();
        assert!(tick.warning);
        assert_eq!(tick.time_left, 289);

        clock.advance(1);
        assert!(!session.tick().warning);
        assert!(session.warning_fired());
    }

    #[test]
    fn short_quizzes_never_warn() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 120, clock.clone());
        for _ in 0..119 {
            clock.advance(1);
            assert!(!session.tick().warning);
        }
    }

    #[test]
    fn expiry_is_reported_once() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 3, clock.clone());

        clock.advance(2);
        assert!(!session.tick().expired);
        clock.advance(5);
        let tick = session.tick();
        assert!(tick.expired);
        assert_eq!(tick.time_left, 0);
        assert_eq!(session.phase(), SessionPhase::Expired);

        clock.advance(1);
        assert!(!session.tick().expired);
        assert_err!(session.record_answer("b", Some(AnswerValue::Choice(2))));
    }

    #[test]
    fn forced_submission_keeps_the_pending_draft() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 10, clock.clone());
        session.edit_draft(AnswerValue::Text("FOO ".into())).unwrap();

        clock.advance(15);
        assert!(session.tick().expired);

        let submission = session.submit(SubmitTrigger::Timeout).unwrap();
        assert_eq!(submission.trigger, SubmitTrigger::Timeout);
        assert_eq!(submission.time_taken, 10);
        assert_eq!(submission.answers["a"], AnswerValue::Text("FOO ".into()));
        assert_eq!(submission.result.questions[0].outcome, Outcome::Correct);
    }

    #[test]
    fn submit_happens_once() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 600, clock.clone());
        session.record_answer("b", Some(AnswerValue::Choice(2))).unwrap();
        clock.advance(42);

        let submission = session.submit(SubmitTrigger::Manual).unwrap();
        assert_eq!(submission.time_taken, 42);
        assert_eq!(submission.result.correct, 1);
        assert_eq!(submission.session_id, session.id());

        assert!(matches!(session.submit(SubmitTrigger::Manual), Err(Error::Conflict(_))));
        assert!(matches!(session.navigate(1), Err(Error::Conflict(_))));
        assert!(!session.teardown());
    }

    #[test]
    fn teardown_persists_without_finishing() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(paper(), 600, clock);
        session.edit_draft(AnswerValue::Text("bar".into())).unwrap();

        assert!(session.teardown());
        assert_eq!(session.answers()["a"], AnswerValue::Text("bar".into()));
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn empty_paper_submits_zero() {
        let clock = ManualClock::new();
        let mut session = QuizSession::new(Vec::new(), 60, clock);
        assert!(session.edit_draft(AnswerValue::Choice(0)).is_err());
        let submission = session.submit(SubmitTrigger::Manual).unwrap();
        assert_eq!(submission.result.score, 0);
        assert_eq!(submission.result.accuracy, 0);
    }
}
