use async_trait::async_trait;

use crate::error::ForwardError;
use crate::model::{ForwardResponse, ForwardTarget, InboundCall};

/// Sends a routed call to its producer.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        target: &ForwardTarget,
        call: &InboundCall,
    ) -> Result<ForwardResponse, ForwardError>;
}

/// Answers 200 with the request payload; used for dry runs.
#[derive(Clone, Copy, Default, Debug)]
pub struct NoopForwarder;

#[async_trait]
impl Forwarder for NoopForwarder {
    async fn forward(
        &self,
        _target: &ForwardTarget,
        call: &InboundCall,
    ) -> Result<ForwardResponse, ForwardError> {
        Ok(ForwardResponse {
            status: 200,
            body: call.payload.clone(),
        })
    }
}
