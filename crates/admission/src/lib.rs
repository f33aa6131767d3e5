//! Admission control: a global inflight gate and a per-sender rate gate.

pub mod config;
pub mod controller;
pub mod errors;
pub mod inflight;
pub mod sender;

pub use config::{AdmissionConfig, SenderThrottleConfig};
pub use controller::{AdmissionController, AdmissionPermit, AdmissionStats};
pub use errors::{AdmissionConfigError, AdmissionError};
pub use inflight::{InflightGate, InflightSlot};
pub use sender::{SenderRateGate, SenderTicket};
