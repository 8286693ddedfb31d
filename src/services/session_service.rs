use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::dto::public_dto::{SessionStatusResponse, StartQuizResponse};
use crate::error::{Error, Result};
use crate::models::answer::{AnswerValue, CodingAnswer};
use crate::models::question::{validate_question_ids, Question};
use crate::models::result::{SubmitTrigger, Submission};
use crate::services::judge_service::{CodingJudge, JudgeRequest};
use crate::services::session::{QuizSession, SessionPhase, Tick};
use crate::services::timer_service::SessionTimer;
use crate::utils::time::{Clock, MonotonicClock};
use crate::utils::token::generate_session_token;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    TimeWarning {
        session_token: String,
        time_left: u32,
    },
    Submitted {
        session_token: String,
        submission: Box<Submission>,
    },
}

pub struct LiveSession {
    pub session: QuizSession,
    timer: Option<SessionTimer>,
    submission: Option<Submission>,
}

impl LiveSession {
    fn new(session: QuizSession) -> Self {
        Self {
            session,
            timer: None,
            submission: None,
        }
    }

    /// Installs `timer`, cancelling any previous one first so a session never
    /// has two live countdowns.
    pub fn arm_timer(&mut self, timer: SessionTimer) {
        if let Some(previous) = self.timer.replace(timer) {
            previous.cancel();
        }
    }

    /// Whether a countdown task is still running for this session.
    pub fn has_timer(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }
}

type SessionHandle = Arc<Mutex<LiveSession>>;

/// Registry of live quiz sessions keyed by session token.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
    judge: Arc<dyn CodingJudge>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<SessionEvent>,
    warning_threshold: u32,
}

impl SessionService {
    pub fn new(judge: Arc<dyn CodingJudge>, warning_threshold: u32) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            judge,
            clock: Arc::new(MonotonicClock::new()),
            events,
            warning_threshold,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn start(
        &self,
        questions: Vec<Question>,
        test_duration: u32,
    ) -> Result<StartQuizResponse> {
        if test_duration == 0 {
            return Err(Error::BadRequest(
                "Test duration must be at least one second".to_string(),
            ));
        }
        validate_question_ids(&questions)?;

        let session = QuizSession::new(questions, test_duration, self.clock.clone())
            .with_warning_threshold(self.warning_threshold);
        let token = generate_session_token();
        let response = StartQuizResponse {
            session_token: token.clone(),
            session_id: session.id(),
            started_at: session.started_at(),
            expires_at: session.expires_at(),
            time_left: session.time_left(),
            total_questions: session.questions().len(),
            questions: session.questions().iter().map(Into::into).collect(),
        };

        let handle = Arc::new(Mutex::new(LiveSession::new(session)));
        self.sessions
            .write()
            .await
            .insert(token.clone(), handle.clone());
        handle
            .lock()
            .await
            .arm_timer(SessionTimer::arm(self.clone(), token.clone()));

        tracing::info!(
            session_id = %response.session_id,
            questions = response.total_questions,
            test_duration,
            "Quiz session started"
        );
        Ok(response)
    }

    async fn handle(&self, token: &str) -> Result<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| Error::NotFound("Quiz session not found".to_string()))
    }

    pub async fn status(&self, token: &str) -> Result<SessionStatusResponse> {
        let handle = self.handle(token).await?;
        let live = handle.lock().await;
        Ok(SessionStatusResponse::from(&live.session))
    }

    /// Advances the countdown of one session. Called by its timer.
    pub async fn tick(&self, token: &str) -> Result<Tick> {
        let handle = self.handle(token).await?;
        let tick = handle.lock().await.session.tick();

        if tick.warning {
            tracing::info!(time_left = tick.time_left, "Quiz time warning");
            let _ = self.events.send(SessionEvent::TimeWarning {
                session_token: token.to_string(),
                time_left: tick.time_left,
            });
        }
        Ok(tick)
    }

    pub async fn edit_draft(&self, token: &str, value: AnswerValue) -> Result<SessionStatusResponse> {
        let handle = self.handle(token).await?;
        let mut live = handle.lock().await;
        live.session.edit_draft(value)?;
        Ok(SessionStatusResponse::from(&live.session))
    }

    pub async fn record_answer(
        &self,
        token: &str,
        question_id: &str,
        value: Option<AnswerValue>,
    ) -> Result<bool> {
        let handle = self.handle(token).await?;
        let mut live = handle.lock().await;
        live.session.record_answer(question_id, value)
    }

    pub async fn navigate(&self, token: &str, target: usize) -> Result<SessionStatusResponse> {
        let handle = self.handle(token).await?;
        let mut live = handle.lock().await;
        live.session.navigate(target)?;
        Ok(SessionStatusResponse::from(&live.session))
    }

    /// Records a coding answer locally, then asks the judge for a verdict.
    /// A failed judge call leaves the local `{code, language}` in place.
    pub async fn submit_code(
        &self,
        token: &str,
        question_id: &str,
        code: String,
        language: String,
    ) -> Result<(CodingAnswer, bool)> {
        let handle = self.handle(token).await?;
        let local = CodingAnswer::new(code, language);
        handle
            .lock()
            .await
            .session
            .record_answer(question_id, Some(AnswerValue::Code(local.clone())))?;

        let request = JudgeRequest {
            question_id: question_id.to_string(),
            code: local.code.clone(),
            language: local.language.clone(),
        };
        let verdict = match self.judge.judge(&request).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(question_id, error = %e, "Coding judge failed, keeping local answer");
                return Ok((local, false));
            }
        };

        let judged = CodingAnswer {
            submission: Some(verdict.submission),
            points: verdict.points,
            ..local.clone()
        };
        let mut live = handle.lock().await;
        let still_current = matches!(
            live.session.answers().get(question_id),
            Some(AnswerValue::Code(stored)) if stored.code == local.code && stored.language == local.language
        );
        if !still_current {
            tracing::debug!(question_id, "Answer changed while judging, dropping verdict");
            return Ok((local, false));
        }
        match live
            .session
            .record_answer(question_id, Some(AnswerValue::Code(judged.clone())))
        {
            Ok(_) => Ok((judged, true)),
            Err(e) => {
                tracing::warn!(question_id, error = %e, "Verdict arrived after the quiz closed");
                Ok((local, false))
            }
        }
    }

    pub async fn submit(&self, token: &str) -> Result<Submission> {
        self.finish(token, SubmitTrigger::Manual).await
    }

    /// Produces the terminal submission of a session exactly once.
    pub async fn finish(&self, token: &str, trigger: SubmitTrigger) -> Result<Submission> {
        let handle = self.handle(token).await?;
        let (submission, timer) = {
            let mut live = handle.lock().await;
            if live.submission.is_some() {
                return Err(Error::Conflict("Quiz has already been submitted".to_string()));
            }
            let submission = live.session.submit(trigger)?;
            live.submission = Some(submission.clone());
            (submission, live.timer.take())
        };

        tracing::info!(
            session_id = %submission.session_id,
            trigger = ?trigger,
            score = submission.result.score,
            time_taken = submission.time_taken,
            "Quiz submitted"
        );
        let _ = self.events.send(SessionEvent::Submitted {
            session_token: token.to_string(),
            submission: Box::new(submission.clone()),
        });

        // On timeout the timer task is the caller and ends on its own.
        if let (SubmitTrigger::Manual, Some(timer)) = (trigger, timer) {
            timer.cancel();
        }
        Ok(submission)
    }

    pub async fn leave(&self, token: &str) -> Result<bool> {
        let handle = self.handle(token).await?;
        let persisted = handle.lock().await.session.teardown();
        tracing::debug!(persisted, "Quiz session left");
        Ok(persisted)
    }

    pub async fn result(&self, token: &str) -> Result<Submission> {
        let handle = self.handle(token).await?;
        let live = handle.lock().await;
        live.submission
            .clone()
            .ok_or_else(|| Error::NotFound("Quiz has not been submitted yet".to_string()))
    }

    /// Drops finished sessions completed more than `retention` ago.
    pub async fn purge_finished(&self, retention: Duration) -> usize {
        let cutoff = self.clock.now() - retention;
        let handles: Vec<(String, SessionHandle)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(token, handle)| (token.clone(), handle.clone()))
            .collect();

        let mut stale = Vec::new();
        for (token, handle) in handles {
            let live = handle.lock().await;
            let done = live.session.phase() == SessionPhase::Finished
                && live
                    .submission
                    .as_ref()
                    .is_some_and(|s| s.completed_at <= cutoff);
            if done {
                stale.push(token);
            }
        }

        if !stale.is_empty() {
            let mut sessions = self.sessions.write().await;
            for token in &stale {
                sessions.remove(token);
            }
            tracing::info!(purged = stale.len(), "Purged finished quiz sessions");
        }
        stale.len()
    }
}
