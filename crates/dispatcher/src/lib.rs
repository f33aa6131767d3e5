pub mod api;
pub mod error;
pub mod forwarder;
pub mod metrics;
pub mod model;

pub use api::{Dispatcher, GatewayDispatcher};
pub use error::{ForwardError, Rejection};
pub use forwarder::{Forwarder, NoopForwarder};
pub use metrics::{ServiceStatistics, ServiceStats};
pub use model::{DispatchOutcome, ForwardResponse, ForwardTarget, InboundCall};
