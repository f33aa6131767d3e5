use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AdmissionConfigError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum concurrent calls; 0 disables the gate.
    pub max_inflight: usize,
    /// Once the gate has tripped it stays closed until inflight drops to this
    /// share of `max_inflight`.
    pub resume_percent_of_max: u8,
    pub sender: SenderThrottleConfig,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_inflight: 0,
            resume_percent_of_max: 100,
            sender: SenderThrottleConfig::default(),
        }
    }
}

impl AdmissionConfig {
    pub fn validate(&self) -> Result<(), AdmissionConfigError> {
        if self.resume_percent_of_max > 100 {
            return Err(AdmissionConfigError::ResumePercent(self.resume_percent_of_max));
        }
        self.sender.validate()
    }

    /// Inflight count at or below which a tripped gate admits again.
    pub fn resume_threshold(&self) -> usize {
        self.max_inflight * usize::from(self.resume_percent_of_max) / 100
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderThrottleConfig {
    /// Calls allowed per sender within one window; 0 disables the gate.
    pub max_requests: u32,
    pub time_period_ms: u64,
    /// Reject over-limit calls, otherwise delay them until the window has room.
    pub reject_execution: bool,
    /// Windows untouched for this long are dropped by `prune_idle`.
    pub idle_eviction_ms: u64,
}

impl Default for SenderThrottleConfig {
    fn default() -> Self {
        Self {
            max_requests: 0,
            time_period_ms: 1_000,
            reject_execution: true,
            idle_eviction_ms: 600_000,
        }
    }
}

impl SenderThrottleConfig {
    pub fn enabled(&self) -> bool {
        self.max_requests > 0
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.time_period_ms)
    }

    pub fn idle_eviction(&self) -> Duration {
        Duration::from_millis(self.idle_eviction_ms)
    }

    pub fn validate(&self) -> Result<(), AdmissionConfigError> {
        if self.enabled() && self.time_period_ms == 0 {
            return Err(AdmissionConfigError::ZeroWindow);
        }
        Ok(())
    }
}
