//! Authoritative reservation store.
//!
//! Commits are conflict-checked under the resource's write lock, so two
//! racing bookings for the same window cannot both succeed here even when
//! the advisory engine told both callers the window was free.

mod mutations;
mod queries;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedCalendar = Arc<RwLock<ResourceCalendar>>;

pub struct ReservationStore {
    calendars: DashMap<Ulid, SharedCalendar>,
    /// Reverse lookup: reservation/block id → resource id
    entity_to_resource: DashMap<Ulid, Ulid>,
    /// Mutations hold it shared; compaction holds it exclusively.
    commit_gate: RwLock<()>,
    wal: Mutex<Wal>,
    pub notify: Arc<NotifyHub>,
}

/// Apply an event to a calendar. Caller holds the lock.
fn apply_to_calendar(cal: &mut ResourceCalendar, event: &Event, index: &DashMap<Ulid, Ulid>) {
    match event {
        Event::ReservationCommitted { reservation } => {
            index.insert(reservation.id, reservation.resource_id);
            cal.insert_reservation(reservation.clone());
        }
        Event::StatusChanged { id, status, .. } => {
            if let Some(r) = cal.reservation_mut(*id) {
                r.status = *status;
            }
        }
        Event::BlockAdded { block } => {
            index.insert(block.id, block.resource_id);
            cal.insert_block(block.clone());
        }
        Event::BlockRemoved { id, .. } => {
            cal.remove_block(*id);
            index.remove(id);
        }
    }
}

impl ReservationStore {
    pub fn open(wal_path: PathBuf, notify: Arc<NotifyHub>) -> std::io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;

        let entity_to_resource = DashMap::new();
        let mut replayed: HashMap<Ulid, ResourceCalendar> = HashMap::new();
        for event in &events {
            let resource_id = event.resource_id();
            let cal = replayed
                .entry(resource_id)
                .or_insert_with(|| ResourceCalendar::new(resource_id));
            apply_to_calendar(cal, event, &entity_to_resource);
        }

        info!(
            events = events.len(),
            resources = replayed.len(),
            path = %wal_path.display(),
            "reservation store opened"
        );

        Ok(Self {
            calendars: replayed
                .into_iter()
                .map(|(id, cal)| (id, Arc::new(RwLock::new(cal))))
                .collect(),
            entity_to_resource,
            commit_gate: RwLock::new(()),
            wal: Mutex::new(wal),
            notify,
        })
    }

    pub fn calendar(&self, resource_id: &Ulid) -> Option<SharedCalendar> {
        self.calendars.get(resource_id).map(|e| e.value().clone())
    }

    fn calendar_or_create(&self, resource_id: Ulid) -> SharedCalendar {
        self.calendars
            .entry(resource_id)
            .or_insert_with(|| Arc::new(RwLock::new(ResourceCalendar::new(resource_id))))
            .clone()
    }

    pub fn resource_for_entity(&self, entity_id: &Ulid) -> Option<Ulid> {
        self.entity_to_resource.get(entity_id).map(|e| *e.value())
    }

    /// Take `id` in the entity index for `resource_id`. Exactly one caller
    /// wins a given id, whichever resource it targets.
    fn claim_entity(&self, id: Ulid, resource_id: Ulid) -> Result<(), EngineError> {
        match self.entity_to_resource.entry(id) {
            Entry::Occupied(_) => Err(EngineError::AlreadyExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(resource_id);
                Ok(())
            }
        }
    }

    /// Claim, then persist. The claim is dropped again if the WAL append fails.
    async fn persist_new_entity(
        &self,
        cal: &mut ResourceCalendar,
        id: Ulid,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.claim_entity(id, event.resource_id())?;
        let result = self.persist_and_apply(cal, event).await;
        if result.is_err() {
            self.entity_to_resource.remove(&id);
        }
        result
    }

    /// WAL-append + apply + notify. Caller holds the commit gate and the calendar lock.
    async fn persist_and_apply(
        &self,
        cal: &mut ResourceCalendar,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal
            .lock()
            .await
            .append(event)
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        apply_to_calendar(cal, event, &self.entity_to_resource);
        self.notify.send(event);
        Ok(())
    }

    /// Lookup entity → resource, acquire its write lock.
    async fn resolve_entity_write(
        &self,
        entity_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<ResourceCalendar>), EngineError> {
        let resource_id = self
            .resource_for_entity(entity_id)
            .ok_or(EngineError::NotFound(*entity_id))?;
        let cal = self
            .calendar(&resource_id)
            .ok_or(EngineError::NotFound(resource_id))?;
        Ok((resource_id, cal.write_owned().await))
    }
}
