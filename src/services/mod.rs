pub mod judge_service;
pub mod scoring_service;
pub mod session;
pub mod session_service;
pub mod timer_service;
