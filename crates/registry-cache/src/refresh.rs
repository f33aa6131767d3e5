use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::api::RegistryCache;

/// Spawns the periodic background refresh.
///
/// Each tick runs a non-forced refresh, so a tick that lands while an
/// administrative reset is running is skipped. Abort the handle to stop.
pub fn spawn_refresh_loop(cache: Arc<RegistryCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcome = cache.refresh(false).await;
            if outcome.skipped {
                debug!(target: "registry-cache", "background refresh skipped");
            } else if !outcome.success {
                warn!(target: "registry-cache",
                    routes = outcome.routes_loaded,
                    permissions = outcome.permissions_loaded,
                    "background refresh failed"
                );
            }
        }
    })
}
