use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::inventory::OccupancyStore;

/// Re-saves the tool table every `interval`, on top of the saves each
/// mutation already triggers. An empty table is left alone.
pub fn spawn_autosave(store: Arc<OccupancyStore>, interval: Duration) -> JoinHandle<()> {
    info!("Autosave enabled, every {}s", interval.as_secs());

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let store = store.clone();
            let saved = tokio::task::spawn_blocking(move || store.persist_snapshot())
                .await
                .unwrap_or(false);
            if saved {
                debug!("Autosaved inventory");
            }
        }
    })
}
