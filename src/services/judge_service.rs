use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeRequest {
    pub question_id: String,
    pub code: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    /// Full judge response, kept opaque.
    pub submission: JsonValue,
    pub points: Option<f64>,
}

/// External service that runs and grades coding answers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodingJudge: Send + Sync {
    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeVerdict>;
}

#[derive(Clone)]
pub struct HttpCodingJudge {
    client: Client,
    base_url: Option<String>,
}

impl HttpCodingJudge {
    pub fn new(base_url: Option<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }
}

#[async_trait]
impl CodingJudge for HttpCodingJudge {
    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeVerdict> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| Error::Judge("Coding judge is not configured".to_string()))?;

        let resp = self
            .client
            .post(format!("{}/submissions", base_url))
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Judge(format!(
                "Judge returned {} for question {}: {}",
                status, request.question_id, body
            )));
        }

        let submission: JsonValue = resp.json().await?;
        Ok(verdict_from_body(submission))
    }
}

fn verdict_from_body(body: JsonValue) -> JudgeVerdict {
    let points = body.get("points").and_then(|v| v.as_f64());
    JudgeVerdict {
        submission: body,
        points,
    }
}
