use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use placement_quiz::{
    error::{Error, Result},
    models::{
        answer::AnswerValue,
        question::Question,
        result::SubmitTrigger,
    },
    services::{
        judge_service::{CodingJudge, JudgeRequest, JudgeVerdict},
        session::SessionPhase,
        session_service::{SessionEvent, SessionService},
    },
};
use tokio::sync::broadcast::{error::TryRecvError, Receiver};
use tokio_test::{assert_err, assert_ok};

struct OfflineJudge;

#[async_trait]
impl CodingJudge for OfflineJudge {
    async fn judge(&self, _request: &JudgeRequest) -> Result<JudgeVerdict> {
        Err(Error::Judge("offline".into()))
    }
}

fn service() -> SessionService {
    SessionService::new(Arc::new(OfflineJudge), 300)
}

fn drain(events: &mut Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => seen.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return seen,
            Err(TryRecvError::Lagged(n)) => panic!("lost {} events", n),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn timeout_submits_exactly_once_with_the_pending_draft() {
    let service = service();
    let mut events = service.subscribe();
    let token = service
        .start(vec![Question::fill("capital", "paris"), Question::fill("river", "seine")], 3)
        .await
        .unwrap()
        .session_token;

    assert_ok!(
        service
            .edit_draft(&token, AnswerValue::Text("Paris".into()))
            .await
    );

    tokio::time::sleep(Duration::from_secs(10)).await;

    let submissions: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            SessionEvent::Submitted { submission, .. } => Some(submission),
            SessionEvent::TimeWarning { .. } => None,
        })
        .collect();
    assert_eq!(submissions.len(), 1);
    let submission = &submissions[0];
    assert_eq!(submission.trigger, SubmitTrigger::Timeout);
    assert_eq!(submission.time_taken, 3);
    assert_eq!(submission.result.correct, 1);
    assert_eq!(submission.result.unanswered, 1);

    let err = assert_err!(service.submit(&token).await);
    assert!(matches!(err, Error::Conflict(_)));

    let status = service.status(&token).await.unwrap();
    assert_eq!(status.status, SessionPhase::Finished);
    assert_eq!(status.time_left, 0);
}

#[tokio::test(start_paused = true)]
async fn warning_fires_once_before_expiry() {
    let service = service();
    let mut events = service.subscribe();
    let token = service
        .start(vec![Question::mcq("m1", &["a", "b"], 0)], 303)
        .await
        .unwrap()
        .session_token;

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(drain(&mut events).is_empty());

    tokio::time::sleep(Duration::from_secs(3)).await;
    let warnings = drain(&mut events);
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0],
        SessionEvent::TimeWarning { time_left: 300, session_token } if *session_token == token
    ));

    tokio::time::sleep(Duration::from_secs(305)).await;
    let rest = drain(&mut events);
    assert_eq!(rest.len(), 1);
    assert!(matches!(rest[0], SessionEvent::Submitted { .. }));
}

#[tokio::test(start_paused = true)]
async fn short_quizzes_never_warn() {
    let service = service();
    let mut events = service.subscribe();
    service
        .start(vec![Question::fill("f1", "x")], 120)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(130)).await;
    let seen = drain(&mut events);
    assert_eq!(seen.len(), 1);
    assert!(matches!(seen[0], SessionEvent::Submitted { .. }));
}

#[tokio::test(start_paused = true)]
async fn manual_submit_stops_the_countdown() {
    let service = service();
    let mut events = service.subscribe();
    let token = service
        .start(vec![Question::mcq("m1", &["a", "b"], 1)], 5)
        .await
        .unwrap()
        .session_token;

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_ok!(
        service
            .record_answer(&token, "m1", Some(AnswerValue::Choice(1)))
            .await
    );
    let manual = service.submit(&token).await.unwrap();
    assert_eq!(manual.trigger, SubmitTrigger::Manual);
    assert_eq!(manual.time_taken, 2);
    assert_eq!(manual.result.score, 100);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let seen = drain(&mut events);
    assert_eq!(seen.len(), 1);
    assert!(matches!(
        &seen[0],
        SessionEvent::Submitted { submission, .. } if submission.trigger == SubmitTrigger::Manual
    ));
    assert_eq!(service.result(&token).await.unwrap(), manual);
}
