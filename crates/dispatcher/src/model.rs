use std::time::Duration;

use routegate_core_types::{CallId, RouteRequest};
use serde::Serialize;

/// One inbound call as handed over by the transport layer.
#[derive(Clone, Debug)]
pub struct InboundCall {
    pub call_id: CallId,
    pub request: RouteRequest,
    /// Transport profile the consumer asked for, if any.
    pub transport_profile: Option<String>,
    /// Opt in to the deprecated multi-address receiver form.
    pub allow_legacy: bool,
    pub payload: Vec<u8>,
}

impl InboundCall {
    pub fn new(request: RouteRequest) -> Self {
        Self {
            call_id: CallId::new(),
            request,
            transport_profile: None,
            allow_legacy: false,
            payload: Vec::new(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.transport_profile = Some(profile.into());
        self
    }

    pub fn with_legacy(mut self, allow: bool) -> Self {
        self.allow_legacy = allow;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Key used for per-service call statistics.
    pub fn service_key(&self) -> String {
        format!(
            "{}-{}",
            self.request.contract_namespace, self.request.receiver_id
        )
    }
}

/// Where a call is sent after routing and authorization succeeded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForwardTarget {
    pub physical_address: String,
    pub transport_profile: String,
    /// Receiver address whose records produced the target.
    pub matched_receiver: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct DispatchOutcome {
    pub call_id: CallId,
    pub target: ForwardTarget,
    pub response: ForwardResponse,
    pub elapsed: Duration,
}
