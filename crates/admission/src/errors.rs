use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("inflight limit reached ({max} concurrent calls)")]
    InflightLimit { max: usize },
    #[error("sender {sender} exceeded {max_requests} calls per {window:?}")]
    SenderRateLimit {
        sender: String,
        max_requests: u32,
        window: Duration,
    },
}

impl AdmissionError {
    pub fn kind(&self) -> &'static str {
        match self {
            AdmissionError::InflightLimit { .. } => "inflight_limit",
            AdmissionError::SenderRateLimit { .. } => "sender_rate_limit",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionConfigError {
    #[error("resume_percent_of_max must be between 0 and 100, got {0}")]
    ResumePercent(u8),
    #[error("sender.time_period_ms must be positive when sender.max_requests is set")]
    ZeroWindow,
}
