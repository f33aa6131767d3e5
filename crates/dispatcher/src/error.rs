use std::time::Duration;

use routegate_admission::AdmissionError;
use thiserror::Error;

/// Failure reported by a forwarder.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForwardError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("producer answered with status {status}")]
    Producer { status: u16 },
}

/// Structured reason a call was not forwarded, or not forwarded successfully.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("gateway overloaded: {0}")]
    Overloaded(String),
    #[error("sender {sender} is over its call rate")]
    SenderThrottled { sender: String },
    #[error("no contact with the registry at startup and no local copy to fall back on")]
    NotInitialized,
    #[error("no route for receiver {receiver} and contract {contract}")]
    NoRoute { receiver: String, contract: String },
    #[error("sender {sender} is not authorized to call {receiver} for {contract}")]
    NotAuthorized {
        sender: String,
        receiver: String,
        contract: String,
    },
    #[error("no route for {receiver} with transport profile {profile}")]
    ProfileMismatch { receiver: String, profile: String },
    #[error("more than one address for {receiver}: {addresses:?}")]
    AmbiguousRoute {
        receiver: String,
        addresses: Vec<String>,
    },
    #[error("forwarding to {address} failed: {source}")]
    ForwardFailed {
        address: String,
        #[source]
        source: ForwardError,
    },
    #[error("producer at {address} did not answer within {timeout:?}")]
    Timeout { address: String, timeout: Duration },
}

impl Rejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::Overloaded(_) => "overloaded",
            Rejection::SenderThrottled { .. } => "sender_throttled",
            Rejection::NotInitialized => "not_initialized",
            Rejection::NoRoute { .. } => "no_route",
            Rejection::NotAuthorized { .. } => "not_authorized",
            Rejection::ProfileMismatch { .. } => "profile_mismatch",
            Rejection::AmbiguousRoute { .. } => "ambiguous_route",
            Rejection::ForwardFailed { .. } => "forward_failed",
            Rejection::Timeout { .. } => "timeout",
        }
    }

    /// HTTP-style status for the rejection response.
    pub fn status(&self) -> u16 {
        match self {
            Rejection::Overloaded(_) => 503,
            Rejection::SenderThrottled { .. } => 429,
            Rejection::NotInitialized => 503,
            Rejection::NoRoute { .. } => 404,
            Rejection::NotAuthorized { .. } => 403,
            Rejection::ProfileMismatch { .. } => 404,
            Rejection::AmbiguousRoute { .. } => 500,
            Rejection::ForwardFailed { .. } => 502,
            Rejection::Timeout { .. } => 504,
        }
    }

    /// True when the caller may retry elsewhere or later.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            Rejection::Overloaded(_) | Rejection::SenderThrottled { .. }
        )
    }
}

impl From<AdmissionError> for Rejection {
    fn from(value: AdmissionError) -> Self {
        match value {
            AdmissionError::SenderRateLimit { sender, .. } => Rejection::SenderThrottled { sender },
            other => Rejection::Overloaded(other.to_string()),
        }
    }
}
