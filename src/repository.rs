use std::sync::Arc;

use async_trait::async_trait;
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::{ManualBlock, Ms, Reservation};

/// Source of reservation snapshots for the advisory layer.
///
/// Failures surface as [`EngineError::RepositoryUnavailable`]; callers pick
/// their own fallback.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Blocking reservations (no cancelled, completed or expired ones) that
    /// end after `from`. Order is unspecified.
    async fn get_blocking_reservations(
        &self,
        resource_id: Ulid,
        from: Ms,
    ) -> Result<Vec<Reservation>, EngineError>;

    /// Owner blocks that end after `from`.
    async fn get_manual_blocks(
        &self,
        resource_id: Ulid,
        from: Ms,
    ) -> Result<Vec<ManualBlock>, EngineError>;

    /// Every reservation on the resource regardless of status.
    async fn get_reservations(&self, resource_id: Ulid) -> Result<Vec<Reservation>, EngineError>;
}

#[async_trait]
impl<T: ReservationRepository + ?Sized> ReservationRepository for Arc<T> {
    async fn get_blocking_reservations(
        &self,
        resource_id: Ulid,
        from: Ms,
    ) -> Result<Vec<Reservation>, EngineError> {
        (**self).get_blocking_reservations(resource_id, from).await
    }

    async fn get_manual_blocks(
        &self,
        resource_id: Ulid,
        from: Ms,
    ) -> Result<Vec<ManualBlock>, EngineError> {
        (**self).get_manual_blocks(resource_id, from).await
    }

    async fn get_reservations(&self, resource_id: Ulid) -> Result<Vec<Reservation>, EngineError> {
        (**self).get_reservations(resource_id).await
    }
}
