//! Rafraîchissement périodique de l'index.
//!
//! The filesystem walk is blocking, so it runs on tokio's blocking pool and
//! never stalls the runtime threads serving browse requests.

use crate::error::{Error, Result};
use crate::index::MediaIndex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest accepted refresh period
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Runs one refresh on the blocking pool
///
/// Returns `Ok(None)` when another refresh was already running: the two are
/// coalesced and this call does no work.
pub async fn refresh_in_background(index: Arc<MediaIndex>) -> Result<Option<usize>> {
    tokio::task::spawn_blocking(move || index.try_refresh())
        .await
        .map_err(|e| Error::RefreshTask(e.to_string()))?
}

/// Démarre le rafraîchissement périodique.
///
/// The first refresh happens one full `interval` after the call; callers
/// usually run an initial [`MediaIndex::refresh`] themselves. A failed pass
/// is logged and the previous tree stays published until the next tick.
///
/// # Returns
///
/// Un handle vers la tâche tokio ; `abort()` l'arrête.
pub fn spawn_refresh_task(index: Arc<MediaIndex>, interval: Duration) -> tokio::task::JoinHandle<()> {
    let interval = interval.max(MIN_REFRESH_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("✅ Starting media refresh every {:?}", interval);

        loop {
            ticker.tick().await;
            match refresh_in_background(index.clone()).await {
                Ok(Some(count)) => debug!(count, "Periodic refresh done"),
                Ok(None) => debug!("Periodic refresh skipped, another one is running"),
                Err(e) => warn!("⚠️ Failed to refresh media index: {}", e),
            }
        }
    })
}
