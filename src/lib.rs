pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::services::judge_service::{CodingJudge, HttpCodingJudge};
use crate::services::session_service::SessionService;
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub session_service: SessionService,
}

impl AppState {
    pub fn new(config: &Config) -> error::Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.coding_judge_timeout_secs))
            .build()?;
        let judge = HttpCodingJudge::new(config.coding_judge_url.clone(), http_client);
        Ok(Self::with_judge(config, Arc::new(judge)))
    }

    pub fn with_judge(config: &Config, judge: Arc<dyn CodingJudge>) -> Self {
        Self {
            session_service: SessionService::new(judge, config.time_warning_seconds),
        }
    }
}
