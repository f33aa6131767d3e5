//! Receiver/contract routing index.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use routegate_core_types::{RouteRequest, VirtualizationRecord};
use serde::Serialize;

use crate::hierarchy::HierarchyLookup;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct RouteKey {
    receiver_id: String,
    contract_namespace: String,
}

impl RouteKey {
    fn new(receiver_id: &str, contract_namespace: &str) -> Self {
        Self {
            receiver_id: receiver_id.to_string(),
            contract_namespace: contract_namespace.to_string(),
        }
    }
}

/// Receiver addresses to look up, in the order they are tried.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReceiverCandidates {
    addresses: Vec<String>,
    legacy: bool,
}

impl ReceiverCandidates {
    /// The requested receiver only. This is the primary strategy.
    pub fn direct(receiver_id: impl Into<String>) -> Self {
        Self {
            addresses: vec![receiver_id.into()],
            legacy: false,
        }
    }

    /// Deprecated multi-address default routing.
    ///
    /// `receiver_id` holds several literal addresses joined by `delimiter`.
    /// The last declared address is tried first, duplicates keep their first
    /// (rightmost) position and empty tokens are dropped.
    pub fn legacy_multi_address(receiver_id: &str, delimiter: &str) -> Self {
        let mut addresses: Vec<String> = Vec::new();
        for token in receiver_id.split(delimiter) {
            if token.is_empty() || addresses.iter().any(|existing| existing == token) {
                continue;
            }
            addresses.insert(0, token.to_string());
        }
        Self {
            addresses,
            legacy: true,
        }
    }

    /// Picks the legacy strategy only when it is enabled, a delimiter is
    /// configured and the receiver actually contains it.
    pub fn for_request(receiver_id: &str, delimiter: Option<&str>, allow_legacy: bool) -> Self {
        match delimiter {
            Some(delim) if allow_legacy && !delim.is_empty() && receiver_id.contains(delim) => {
                Self::legacy_multi_address(receiver_id, delim)
            }
            _ => Self::direct(receiver_id),
        }
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy
    }
}

/// Addresses visited while resolving one request.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RouteTrace {
    pub visited: Vec<String>,
}

impl RouteTrace {
    fn visit(&mut self, address: &str) {
        self.visited.push(address.to_string());
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    /// Every record of the matched group that is active at the request time.
    pub records: Vec<VirtualizationRecord>,
    /// Address (candidate or ancestor) whose group produced the records.
    pub matched_address: String,
    /// Receivers to check permissions for, in order.
    pub authorization_candidates: Vec<String>,
    pub trace: RouteTrace,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RouteResult {
    Routed(RouteMatch),
    NoRoute(RouteTrace),
}

impl RouteResult {
    pub fn is_routed(&self) -> bool {
        matches!(self, RouteResult::Routed(_))
    }

    pub fn trace(&self) -> &RouteTrace {
        match self {
            RouteResult::Routed(found) => &found.trace,
            RouteResult::NoRoute(trace) => trace,
        }
    }
}

/// Immutable index of virtualization records grouped by receiver and contract.
pub struct RoutingIndex {
    records: Vec<VirtualizationRecord>,
    groups: HashMap<RouteKey, Vec<usize>>,
    hierarchy: Arc<dyn HierarchyLookup>,
}

impl RoutingIndex {
    pub fn new(hierarchy: Arc<dyn HierarchyLookup>, records: Vec<VirtualizationRecord>) -> Self {
        let mut groups: HashMap<RouteKey, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            groups
                .entry(RouteKey::new(&record.receiver_id, &record.contract_namespace))
                .or_default()
                .push(idx);
        }
        Self {
            records,
            groups,
            hierarchy,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[VirtualizationRecord] {
        &self.records
    }

    /// All records of one group regardless of validity, `None` for an unknown group.
    pub fn lookup(&self, receiver_id: &str, contract_namespace: &str) -> Option<Vec<&VirtualizationRecord>> {
        self.groups
            .get(&RouteKey::new(receiver_id, contract_namespace))
            .map(|indices| indices.iter().map(|idx| &self.records[*idx]).collect())
    }

    /// Records of one group whose interval contains `at`.
    pub fn active_at(
        &self,
        receiver_id: &str,
        contract_namespace: &str,
        at: DateTime<Utc>,
    ) -> Vec<VirtualizationRecord> {
        self.lookup(receiver_id, contract_namespace)
            .map(|group| {
                group
                    .into_iter()
                    .filter(|record| record.is_active_at(at))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolves the active records for `request`.
    ///
    /// Candidates are tried literally first, then each candidate's ancestor
    /// chain nearest first. The first address with an active record wins.
    pub fn get_routing_information(
        &self,
        request: &RouteRequest,
        candidates: &ReceiverCandidates,
    ) -> RouteResult {
        let mut trace = RouteTrace::default();

        for address in candidates.addresses() {
            trace.visit(address);
            let records = self.active_at(address, &request.contract_namespace, request.at);
            if !records.is_empty() {
                return self.routed(request, candidates, address, address, records, trace);
            }
        }

        for address in candidates.addresses() {
            for ancestor in self.hierarchy.ancestors(address) {
                trace.visit(&ancestor);
                let records = self.active_at(&ancestor, &request.contract_namespace, request.at);
                if !records.is_empty() {
                    return self.routed(request, candidates, address, &ancestor, records, trace);
                }
            }
        }

        RouteResult::NoRoute(trace)
    }

    fn routed(
        &self,
        request: &RouteRequest,
        candidates: &ReceiverCandidates,
        candidate: &str,
        matched_address: &str,
        records: Vec<VirtualizationRecord>,
        trace: RouteTrace,
    ) -> RouteResult {
        // Legacy routing only authorizes against the literal address that routed.
        let authorization_candidates = if candidates.is_legacy() {
            vec![candidate.to_string()]
        } else {
            vec![request.receiver_id.clone()]
        };
        RouteResult::Routed(RouteMatch {
            records,
            matched_address: matched_address.to_string(),
            authorization_candidates,
            trace,
        })
    }
}
