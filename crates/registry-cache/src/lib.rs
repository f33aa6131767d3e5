pub mod api;
pub mod authorization;
pub mod client;
pub mod errors;
pub mod hierarchy;
pub mod local_copy;
pub mod model;
pub mod refresh;
pub mod routing;

pub use api::{RegistryCache, RegistryCacheBuilder};
pub use authorization::AuthorizationIndex;
pub use client::{HttpRegistryClient, RegistryClient, StaticRegistryClient};
pub use errors::{PersistError, RegistryError};
pub use hierarchy::{HierarchyError, HierarchyLookup, NoHierarchy, StaticHierarchy};
pub use local_copy::LocalCopy;
pub use model::{
    PersistedSnapshot, ProcessingLog, RefreshOutcome, RegistrySnapshot, ResetOutcome,
    SnapshotSource,
};
pub use refresh::spawn_refresh_loop;
pub use routing::{ReceiverCandidates, RouteMatch, RouteResult, RouteTrace, RoutingIndex};
