use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStatistics {
    pub service: String,
    pub calls: u64,
    pub successful_calls: u64,
    pub total_duration_ms: u64,
    pub average_duration_ms: u64,
}

/// Call counts and durations per service key.
#[derive(Default)]
pub struct ServiceStats {
    entries: DashMap<String, ServiceStatistics>,
}

impl ServiceStats {
    pub fn record_call(&self, service: &str) {
        let mut entry = self
            .entries
            .entry(service.to_string())
            .or_insert_with(|| ServiceStatistics {
                service: service.to_string(),
                ..ServiceStatistics::default()
            });
        entry.calls += 1;
    }

    pub fn record_success(&self, service: &str, elapsed: Duration) {
        if let Some(mut entry) = self.entries.get_mut(service) {
            entry.successful_calls += 1;
            entry.total_duration_ms += elapsed.as_millis() as u64;
            entry.average_duration_ms = entry.total_duration_ms / entry.successful_calls;
        }
    }

    pub fn get(&self, service: &str) -> Option<ServiceStatistics> {
        self.entries.get(service).map(|entry| entry.clone())
    }

    pub fn snapshot(&self) -> Vec<ServiceStatistics> {
        let mut all: Vec<ServiceStatistics> =
            self.entries.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by(|a, b| a.service.cmp(&b.service));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_covers_successful_calls_only() {
        let stats = ServiceStats::default();
        stats.record_call("ns-receiver");
        stats.record_call("ns-receiver");
        stats.record_call("ns-receiver");
        stats.record_success("ns-receiver", Duration::from_millis(10));
        stats.record_success("ns-receiver", Duration::from_millis(30));

        let entry = stats.get("ns-receiver").unwrap();
        assert_eq!(entry.calls, 3);
        assert_eq!(entry.successful_calls, 2);
        assert_eq!(entry.total_duration_ms, 40);
        assert_eq!(entry.average_duration_ms, 20);
    }
}
