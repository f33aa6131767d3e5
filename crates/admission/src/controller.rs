use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::AdmissionConfig;
use crate::errors::AdmissionError;
use crate::inflight::{InflightGate, InflightSlot};
use crate::sender::SenderRateGate;

#[derive(Default)]
struct Counters {
    admitted: AtomicU64,
    rejected_inflight: AtomicU64,
    rejected_sender: AtomicU64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionStats {
    pub inflight: usize,
    pub admitted: u64,
    pub rejected_inflight: u64,
    pub rejected_sender: u64,
    pub tracked_senders: usize,
}

/// Held for the lifetime of one admitted call. Dropping it frees the slot,
/// including when the owning future is cancelled.
pub struct AdmissionPermit {
    _slot: InflightSlot,
}

pub struct AdmissionController {
    inflight: InflightGate,
    senders: SenderRateGate,
    counters: Counters,
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            inflight: InflightGate::new(config.max_inflight, config.resume_threshold()),
            senders: SenderRateGate::new(config.sender.clone()),
            counters: Counters::default(),
            config,
        }
    }

    pub fn shared(config: AdmissionConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Per-sender gate first, then the inflight gate. The sender's window
    /// only keeps the call once the inflight gate has let it through.
    pub async fn admit(&self, sender: &str) -> Result<AdmissionPermit, AdmissionError> {
        let ticket = match self.senders.acquire(sender).await {
            Ok(ticket) => ticket,
            Err(err) => {
                self.counters.rejected_sender.fetch_add(1, Ordering::Relaxed);
                return Err(err);
            }
        };
        match self.inflight.try_enter() {
            Ok(slot) => {
                ticket.commit();
                self.counters.admitted.fetch_add(1, Ordering::Relaxed);
                Ok(AdmissionPermit { _slot: slot })
            }
            Err(err) => {
                drop(ticket);
                self.counters.rejected_inflight.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    pub fn inflight(&self) -> usize {
        self.inflight.inflight()
    }

    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        self.senders.prune_idle(max_idle)
    }

    pub fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            inflight: self.inflight(),
            admitted: self.counters.admitted.load(Ordering::Relaxed),
            rejected_inflight: self.counters.rejected_inflight.load(Ordering::Relaxed),
            rejected_sender: self.counters.rejected_sender.load(Ordering::Relaxed),
            tracked_senders: self.senders.tracked_senders(),
        }
    }
}
