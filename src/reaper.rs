use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::model::ReservationStatus;
use crate::observability;
use crate::store::ReservationStore;

/// Move pending reservations whose start has passed to `expired`.
/// Returns how many were expired.
pub async fn expire_pending(store: &ReservationStore, clock: &dyn Clock) -> usize {
    let now = clock.now();
    let mut expired = 0;
    for id in store.collect_expired_pending(now).await {
        match store.update_status(id, ReservationStatus::Expired).await {
            Ok(r) => {
                info!(reservation = %id, resource = %r.resource_id, "expired pending reservation");
                expired += 1;
            }
            // Confirmed or cancelled since it was collected.
            Err(e) => debug!("reaper skip {id}: {e}"),
        }
    }
    if expired > 0 {
        metrics::counter!(observability::RESERVATIONS_EXPIRED_TOTAL).increment(expired as u64);
    }
    expired
}

/// Background task that periodically expires stale pending reservations.
pub async fn run_reaper(store: Arc<ReservationStore>, clock: Arc<dyn Clock>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        expire_pending(&store, clock.as_ref()).await;
    }
}

/// Background task that compacts the WAL once enough appends pile up.
pub async fn run_compactor(store: Arc<ReservationStore>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        if store.appends_since_compact().await < threshold {
            continue;
        }
        match store.compact().await {
            Ok(_) => metrics::counter!(observability::WAL_COMPACTIONS_TOTAL).increment(1),
            Err(e) => warn!("compaction failed: {e}"),
        }
    }
}
