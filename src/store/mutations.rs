use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::ReservationStore;

pub(crate) fn validate_interval(interval: &DateInterval) -> Result<(), EngineError> {
    if interval.start() < MIN_VALID_TIMESTAMP_MS || interval.end() > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if interval.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("interval too long"));
    }
    Ok(())
}

fn record_commit(outcome: &'static str) {
    metrics::counter!(observability::COMMITS_TOTAL, "outcome" => outcome).increment(1);
}

impl ReservationStore {
    /// Record a reservation. Blocking reservations are rejected with
    /// [`EngineError::Conflict`] if they overlap another blocking one; the
    /// check and the write happen under the same lock.
    pub async fn commit_reservation(&self, reservation: Reservation) -> Result<(), EngineError> {
        validate_interval(&reservation.interval)?;
        // Early out only; the claim taken under the calendar lock decides.
        if self.entity_to_resource.contains_key(&reservation.id) {
            record_commit("duplicate");
            return Err(EngineError::AlreadyExists(reservation.id));
        }

        let _gate = self.commit_gate.read().await;
        let cal = self.calendar_or_create(reservation.resource_id);
        let mut guard = cal.write().await;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_RESOURCE {
            record_commit("rejected");
            return Err(EngineError::LimitExceeded("too many reservations on resource"));
        }

        if reservation.is_blocking()
            && let Some(existing) = guard.first_blocking_conflict(&reservation.interval)
        {
            warn!(
                reservation = %reservation.id,
                resource = %reservation.resource_id,
                conflict = %existing.id,
                interval = %reservation.interval,
                "commit rejected: overlapping reservation"
            );
            record_commit("conflict");
            return Err(EngineError::Conflict(existing.id));
        }

        let (id, resource_id, interval, status) = (
            reservation.id,
            reservation.resource_id,
            reservation.interval,
            reservation.status,
        );
        let event = Event::ReservationCommitted { reservation };
        if let Err(e) = self.persist_new_entity(&mut guard, id, &event).await {
            record_commit(if matches!(e, EngineError::AlreadyExists(_)) { "duplicate" } else { "rejected" });
            return Err(e);
        }
        info!(
            reservation = %id,
            resource = %resource_id,
            interval = %interval,
            status = status.as_str(),
            "reservation committed"
        );
        record_commit("committed");
        Ok(())
    }

    /// Move a reservation to `status`. Turning a non-blocking reservation
    /// back into a blocking one is conflict-checked like a new commit.
    pub async fn update_status(
        &self,
        id: Ulid,
        status: ReservationStatus,
    ) -> Result<Reservation, EngineError> {
        let _gate = self.commit_gate.read().await;
        let (resource_id, mut guard) = self.resolve_entity_write(&id).await?;
        let current = guard
            .reservations
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;

        if status.is_blocking()
            && !current.is_blocking()
            && let Some(existing) = guard
                .overlapping(&current.interval)
                .find(|r| r.id != id && r.is_blocking())
        {
            warn!(reservation = %id, conflict = %existing.id, "status change rejected: overlapping reservation");
            return Err(EngineError::Conflict(existing.id));
        }

        debug!(reservation = %id, from = current.status.as_str(), to = status.as_str(), "status changed");
        let event = Event::StatusChanged {
            id,
            resource_id,
            status,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(Reservation { status, ..current })
    }

    /// Owner block. Not conflict-checked: owners may block over bookings.
    pub async fn add_manual_block(&self, block: ManualBlock) -> Result<(), EngineError> {
        validate_interval(&block.interval)?;
        if let Some(ref reason) = block.reason
            && reason.len() > MAX_REASON_LEN
        {
            return Err(EngineError::LimitExceeded("block reason too long"));
        }
        // Early out only; the claim taken under the calendar lock decides.
        if self.entity_to_resource.contains_key(&block.id) {
            return Err(EngineError::AlreadyExists(block.id));
        }

        let _gate = self.commit_gate.read().await;
        let cal = self.calendar_or_create(block.resource_id);
        let mut guard = cal.write().await;
        if guard.blocks.len() >= MAX_BLOCKS_PER_RESOURCE {
            return Err(EngineError::LimitExceeded("too many blocks on resource"));
        }

        let (id, resource_id, interval) = (block.id, block.resource_id, block.interval);
        let event = Event::BlockAdded { block };
        self.persist_new_entity(&mut guard, id, &event).await?;
        info!(block = %id, resource = %resource_id, interval = %interval, "manual block added");
        Ok(())
    }

    pub async fn remove_manual_block(&self, id: Ulid) -> Result<Ulid, EngineError> {
        let _gate = self.commit_gate.read().await;
        let (resource_id, mut guard) = self.resolve_entity_write(&id).await?;
        if !guard.blocks.iter().any(|b| b.id == id) {
            return Err(EngineError::NotFound(id));
        }
        let event = Event::BlockRemoved { id, resource_id };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(resource_id)
    }

    /// Rewrite the WAL as the minimal event set for the current state.
    pub async fn compact(&self) -> Result<usize, EngineError> {
        let _gate = self.commit_gate.write().await;
        let events = self.snapshot_events().await;
        self.wal
            .lock()
            .await
            .compact(&events)
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        info!(events = events.len(), "WAL compacted");
        Ok(events.len())
    }
}
