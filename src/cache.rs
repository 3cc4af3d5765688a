use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::{ManualBlock, Ms, Reservation};
use crate::notify::NotifyHub;
use crate::observability;
use crate::repository::ReservationRepository;

/// Snapshot of one resource's blocking intervals that end after `from`.
#[derive(Debug, Clone)]
struct Entry {
    from: Ms,
    reservations: Arc<Vec<Reservation>>,
    blocks: Arc<Vec<ManualBlock>>,
}

/// Read-through cache in front of a repository.
///
/// An entry fetched for bound `from` serves any later bound by filtering.
/// Entries are dropped when the store broadcasts a change for the resource;
/// see [`CachedRepository::spawn_invalidator`].
pub struct CachedRepository<R> {
    inner: R,
    entries: DashMap<Ulid, Entry>,
    /// Bumped on every invalidation. A fill started before a bump is discarded.
    epoch: AtomicU64,
}

impl<R: ReservationRepository> CachedRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn invalidate(&self, resource_id: &Ulid) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if self.entries.remove(resource_id).is_some() {
            metrics::counter!(observability::CACHE_INVALIDATIONS_TOTAL).increment(1);
        }
    }

    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    async fn entry(&self, resource_id: Ulid, from: Ms) -> Result<Entry, EngineError> {
        if let Some(hit) = self.entries.get(&resource_id)
            && hit.from <= from
        {
            metrics::counter!(observability::CACHE_LOOKUPS_TOTAL, "result" => "hit").increment(1);
            return Ok(hit.value().clone());
        }
        metrics::counter!(observability::CACHE_LOOKUPS_TOTAL, "result" => "miss").increment(1);

        let epoch = self.epoch.load(Ordering::Acquire);
        let (reservations, blocks) = futures::try_join!(
            self.inner.get_blocking_reservations(resource_id, from),
            self.inner.get_manual_blocks(resource_id, from),
        )?;
        let entry = Entry {
            from,
            reservations: Arc::new(reservations),
            blocks: Arc::new(blocks),
        };
        if self.epoch.load(Ordering::Acquire) == epoch {
            self.entries.insert(resource_id, entry.clone());
        } else {
            debug!(resource = %resource_id, "cache fill raced an invalidation; not stored");
        }
        Ok(entry)
    }
}

impl<R: ReservationRepository + 'static> CachedRepository<R> {
    /// Drop entries as the store broadcasts changes. If the subscriber falls
    /// behind, the whole cache is cleared. Ends when the hub is dropped.
    pub fn spawn_invalidator(self: Arc<Self>, hub: &NotifyHub) -> JoinHandle<()> {
        let mut rx = hub.subscribe_all();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.invalidate(&event.resource_id()),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "cache invalidator lagged; clearing cache");
                        self.clear();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[async_trait]
impl<R: ReservationRepository> ReservationRepository for CachedRepository<R> {
    async fn get_blocking_reservations(
        &self,
        resource_id: Ulid,
        from: Ms,
    ) -> Result<Vec<Reservation>, EngineError> {
        let entry = self.entry(resource_id, from).await?;
        Ok(entry
            .reservations
            .iter()
            .filter(|r| r.interval.end() > from)
            .cloned()
            .collect())
    }

    async fn get_manual_blocks(
        &self,
        resource_id: Ulid,
        from: Ms,
    ) -> Result<Vec<ManualBlock>, EngineError> {
        let entry = self.entry(resource_id, from).await?;
        Ok(entry
            .blocks
            .iter()
            .filter(|b| b.interval.end() > from)
            .cloned()
            .collect())
    }

    async fn get_reservations(&self, resource_id: Ulid) -> Result<Vec<Reservation>, EngineError> {
        self.inner.get_reservations(resource_id).await
    }
}
