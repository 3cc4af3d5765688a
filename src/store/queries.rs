use async_trait::async_trait;
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::*;
use crate::repository::ReservationRepository;

use super::ReservationStore;

impl ReservationStore {
    pub fn resource_ids(&self) -> Vec<Ulid> {
        self.calendars.iter().map(|e| *e.key()).collect()
    }

    pub fn resource_count(&self) -> usize {
        self.calendars.len()
    }

    pub async fn appends_since_compact(&self) -> u64 {
        self.wal.lock().await.appends_since_compact()
    }

    /// Events that recreate the current state: one commit per reservation
    /// (carrying its latest status) and one add per live block.
    pub(super) async fn snapshot_events(&self) -> Vec<Event> {
        let calendars: Vec<_> = self.calendars.iter().map(|e| e.value().clone()).collect();
        let mut events = Vec::new();
        for cal in calendars {
            let guard = cal.read().await;
            events.extend(
                guard
                    .reservations
                    .iter()
                    .map(|r| Event::ReservationCommitted {
                        reservation: r.clone(),
                    }),
            );
            events.extend(
                guard
                    .blocks
                    .iter()
                    .map(|b| Event::BlockAdded { block: b.clone() }),
            );
        }
        events
    }

    /// Pending reservations whose start is at or before `now`.
    pub async fn collect_expired_pending(&self, now: Ms) -> Vec<Ulid> {
        let calendars: Vec<_> = self.calendars.iter().map(|e| e.value().clone()).collect();
        let mut expired = Vec::new();
        for cal in calendars {
            let guard = cal.read().await;
            expired.extend(
                guard
                    .reservations
                    .iter()
                    .take_while(|r| r.interval.start() <= now)
                    .filter(|r| r.status.is_pending())
                    .map(|r| r.id),
            );
        }
        expired
    }
}

#[async_trait]
impl ReservationRepository for ReservationStore {
    async fn get_blocking_reservations(
        &self,
        resource_id: Ulid,
        from: Ms,
    ) -> Result<Vec<Reservation>, EngineError> {
        let Some(cal) = self.calendar(&resource_id) else {
            return Ok(Vec::new());
        };
        let guard = cal.read().await;
        Ok(guard.blocking_from(from).cloned().collect())
    }

    async fn get_manual_blocks(
        &self,
        resource_id: Ulid,
        from: Ms,
    ) -> Result<Vec<ManualBlock>, EngineError> {
        let Some(cal) = self.calendar(&resource_id) else {
            return Ok(Vec::new());
        };
        let guard = cal.read().await;
        Ok(guard.blocks_from(from).cloned().collect())
    }

    async fn get_reservations(&self, resource_id: Ulid) -> Result<Vec<Reservation>, EngineError> {
        let Some(cal) = self.calendar(&resource_id) else {
            return Ok(Vec::new());
        };
        let guard = cal.read().await;
        Ok(guard.reservations.clone())
    }
}
