//! Global inflight gate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{info, warn};

use crate::errors::AdmissionError;

pub struct InflightGate {
    semaphore: Option<Arc<Semaphore>>,
    max: usize,
    resume_threshold: usize,
    tripped: AtomicBool,
    inflight: Arc<AtomicUsize>,
}

/// Occupies one inflight slot until dropped.
pub struct InflightSlot {
    _permit: Option<OwnedSemaphorePermit>,
    inflight: Arc<AtomicUsize>,
}

impl Drop for InflightSlot {
    fn drop(&mut self) {
        self.inflight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl InflightGate {
    /// `max == 0` leaves the gate open while still counting calls.
    pub fn new(max: usize, resume_threshold: usize) -> Self {
        let semaphore = (max > 0).then(|| Arc::new(Semaphore::new(max)));
        Self {
            semaphore,
            max,
            resume_threshold: resume_threshold.min(max),
            tripped: AtomicBool::new(false),
            inflight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Never waits for capacity.
    pub fn try_enter(&self) -> Result<InflightSlot, AdmissionError> {
        let Some(semaphore) = &self.semaphore else {
            return Ok(self.slot(None));
        };

        if self.is_tripped() {
            if self.inflight() > self.resume_threshold {
                return Err(AdmissionError::InflightLimit { max: self.max });
            }
            if self.tripped.swap(false, Ordering::AcqRel) {
                info!(
                    target: "admission",
                    inflight = self.inflight(),
                    "inflight below resume threshold; admitting again"
                );
            }
        }

        match semaphore.clone().try_acquire_owned() {
            Ok(permit) => Ok(self.slot(Some(permit))),
            Err(TryAcquireError::NoPermits | TryAcquireError::Closed) => {
                if !self.tripped.swap(true, Ordering::AcqRel) {
                    warn!(target: "admission", max = self.max, "inflight limit reached; rejecting calls");
                }
                Err(AdmissionError::InflightLimit { max: self.max })
            }
        }
    }

    fn slot(&self, permit: Option<OwnedSemaphorePermit>) -> InflightSlot {
        self.inflight.fetch_add(1, Ordering::AcqRel);
        InflightSlot {
            _permit: permit,
            inflight: self.inflight.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_the_call_after_max_and_admits_after_release() {
        let gate = InflightGate::new(2, 2);
        let first = gate.try_enter().unwrap();
        let _second = gate.try_enter().unwrap();
        assert_eq!(
            gate.try_enter().err(),
            Some(AdmissionError::InflightLimit { max: 2 })
        );
        drop(first);
        assert!(gate.try_enter().is_ok());
    }

    #[test]
    fn zero_max_is_unbounded_but_counted() {
        let gate = InflightGate::new(0, 0);
        let slots: Vec<_> = (0..64).map(|_| gate.try_enter().unwrap()).collect();
        assert_eq!(gate.inflight(), 64);
        drop(slots);
        assert_eq!(gate.inflight(), 0);
    }

    #[test]
    fn tripped_gate_waits_for_resume_threshold() {
        let gate = InflightGate::new(4, 2);
        let mut slots: Vec<_> = (0..4).map(|_| gate.try_enter().unwrap()).collect();
        assert!(gate.try_enter().is_err());
        assert!(gate.is_tripped());

        slots.pop();
        assert_eq!(gate.inflight(), 3);
        assert!(gate.try_enter().is_err());

        slots.pop();
        assert_eq!(gate.inflight(), 2);
        let admitted = gate.try_enter().unwrap();
        assert!(!gate.is_tripped());
        assert_eq!(gate.inflight(), 3);
        drop(admitted);
    }
}
