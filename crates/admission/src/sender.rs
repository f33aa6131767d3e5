//! Per-sender rolling window gate.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::config::SenderThrottleConfig;
use crate::errors::AdmissionError;

struct SenderWindow {
    /// Start times of counted calls, oldest first. Entries after `now` are
    /// reservations held by delayed calls.
    calls: VecDeque<Instant>,
    last_seen: Instant,
}

impl SenderWindow {
    fn new(now: Instant) -> Self {
        Self {
            calls: VecDeque::new(),
            last_seen: now,
        }
    }

    fn evict_expired(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.calls.front() {
            if now.saturating_duration_since(*oldest) >= window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Earliest start that keeps at most `max` calls in any window.
    fn next_start(&mut self, now: Instant, window: Duration, max: usize) -> Instant {
        self.last_seen = now;
        self.evict_expired(now, window);
        if self.calls.len() < max {
            return now;
        }
        let anchor = self.calls[self.calls.len() - max];
        (anchor + window).max(now)
    }

    fn insert(&mut self, at: Instant) {
        let pos = self.calls.partition_point(|call| *call <= at);
        self.calls.insert(pos, at);
    }

    fn remove(&mut self, at: Instant) {
        if let Some(pos) = self.calls.iter().rposition(|call| *call == at) {
            self.calls.remove(pos);
        }
    }
}

/// A call counted against its sender's window.
///
/// Dropping the ticket without [`SenderTicket::commit`] gives the spot back,
/// so calls rejected later or cancelled while delayed do not use up quota.
#[must_use = "dropping a ticket releases the sender's window entry"]
pub struct SenderTicket<'a> {
    gate: &'a SenderRateGate,
    sender: String,
    at: Option<Instant>,
}

impl SenderTicket<'_> {
    pub fn commit(mut self) {
        self.at = None;
    }
}

impl Drop for SenderTicket<'_> {
    fn drop(&mut self) {
        if let Some(at) = self.at.take() {
            self.gate.release(&self.sender, at);
        }
    }
}

pub struct SenderRateGate {
    windows: DashMap<String, SenderWindow>,
    config: SenderThrottleConfig,
}

impl SenderRateGate {
    pub fn new(config: SenderThrottleConfig) -> Self {
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SenderThrottleConfig {
        &self.config
    }

    pub fn tracked_senders(&self) -> usize {
        self.windows.len()
    }

    fn limit_error(&self, sender: &str) -> AdmissionError {
        AdmissionError::SenderRateLimit {
            sender: sender.to_string(),
            max_requests: self.config.max_requests,
            window: self.config.window(),
        }
    }

    fn release(&self, sender: &str, at: Instant) {
        if let Some(mut window) = self.windows.get_mut(sender) {
            window.remove(at);
        }
    }

    /// Counts one call for `sender` and returns its ticket.
    ///
    /// In reject mode an over-limit call fails at once. In delay mode the call
    /// reserves the next free start time and sleeps until then; when that
    /// start is more than one window away the call is rejected instead.
    pub async fn acquire(&self, sender: &str) -> Result<SenderTicket<'_>, AdmissionError> {
        if !self.config.enabled() {
            return Ok(SenderTicket {
                gate: self,
                sender: String::new(),
                at: None,
            });
        }

        let window = self.config.window();
        let now = Instant::now();
        let at = {
            let mut entry = self
                .windows
                .entry(sender.to_string())
                .or_insert_with(|| SenderWindow::new(now));
            let at = entry.next_start(now, window, self.config.max_requests as usize);
            let wait = at.saturating_duration_since(now);
            if !wait.is_zero() && (self.config.reject_execution || wait > window) {
                drop(entry);
                debug!(target: "admission", sender = %sender, wait_ms = wait.as_millis() as u64, "sender over rate limit; rejecting");
                return Err(self.limit_error(sender));
            }
            entry.insert(at);
            at
        };

        let ticket = SenderTicket {
            gate: self,
            sender: sender.to_string(),
            at: Some(at),
        };
        if at > now {
            debug!(target: "admission", sender = %sender, wait_ms = (at - now).as_millis() as u64, "sender over rate limit; delaying");
            sleep_until(at).await;
        }
        Ok(ticket)
    }

    /// Drops windows with no calls for `max_idle`; returns how many went.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        if max_idle.is_zero() {
            return 0;
        }
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now.duration_since(window.last_seen) < max_idle);
        before.saturating_sub(self.windows.len())
    }
}
