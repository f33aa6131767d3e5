use std::collections::HashMap;
use std::sync::Arc;

use routegate_core_types::{PermissionRecord, RouteRequest};

use crate::hierarchy::HierarchyLookup;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct GrantKey {
    sender_id: String,
    receiver_id: String,
    contract_namespace: String,
}

/// Permissions grouped by (sender, receiver, contract).
pub struct AuthorizationIndex {
    records: Vec<PermissionRecord>,
    grants: HashMap<GrantKey, Vec<usize>>,
    hierarchy: Arc<dyn HierarchyLookup>,
}

impl AuthorizationIndex {
    pub fn new(hierarchy: Arc<dyn HierarchyLookup>, records: Vec<PermissionRecord>) -> Self {
        let mut grants: HashMap<GrantKey, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            grants
                .entry(GrantKey {
                    sender_id: record.sender_id.clone(),
                    receiver_id: record.receiver_id.clone(),
                    contract_namespace: record.contract_namespace.clone(),
                })
                .or_default()
                .push(idx);
        }
        Self {
            records,
            grants,
            hierarchy,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PermissionRecord] {
        &self.records
    }

    fn has_active_grant(&self, request: &RouteRequest, receiver_id: &str) -> bool {
        let key = GrantKey {
            sender_id: request.sender_id.clone(),
            receiver_id: receiver_id.to_string(),
            contract_namespace: request.contract_namespace.clone(),
        };
        self.grants
            .get(&key)
            .map(|indices| {
                indices
                    .iter()
                    .any(|idx| self.records[*idx].is_active_at(request.at))
            })
            .unwrap_or(false)
    }

    /// True when the sender holds an active grant on any candidate or on one
    /// of a candidate's ancestors.
    pub fn is_authorized(&self, request: &RouteRequest, candidates: &[String]) -> bool {
        for candidate in candidates {
            if self.has_active_grant(request, candidate) {
                return true;
            }
            if self
                .hierarchy
                .ancestors(candidate)
                .iter()
                .any(|ancestor| self.has_active_grant(request, ancestor))
            {
                return true;
            }
        }
        false
    }
}
