//! Advisory queries over a repository snapshot: single and fleet checks,
//! free ranges, blocked-range shading and active-booking summaries.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::engine::{AvailabilityEngine, EngineError, SearchOptions, free_ranges, next_free_day};
use crate::limits::*;
use crate::model::*;
use crate::observability::record_query;
use crate::repository::ReservationRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityReport {
    pub resource_id: Ulid,
    pub requested: DateInterval,
    pub available: bool,
    /// Only filled in when the request is unavailable.
    pub suggestions: Vec<AlternativeSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveReservations {
    pub count: usize,
    /// Earliest-starting active reservations.
    pub preview: Vec<Reservation>,
}

pub struct AvailabilityService<R> {
    repo: Arc<R>,
    engine: AvailabilityEngine,
    options: SearchOptions,
}

impl<R: ReservationRepository> AvailabilityService<R> {
    pub fn new(repo: Arc<R>, engine: AvailabilityEngine, options: SearchOptions) -> Self {
        Self {
            repo,
            engine,
            options,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn engine(&self) -> &AvailabilityEngine {
        &self.engine
    }

    /// Blocking intervals (reservations and owner blocks) ending after `from`.
    async fn blocked_from(&self, resource_id: Ulid, from: Ms) -> Result<Vec<DateInterval>, EngineError> {
        let (reservations, blocks) = futures::try_join!(
            self.repo.get_blocking_reservations(resource_id, from),
            self.repo.get_manual_blocks(resource_id, from),
        )
        .inspect_err(|e| warn!(%resource_id, error = %e, "snapshot fetch failed"))?;
        let manual: Vec<DateInterval> = blocks.iter().map(|b| b.interval).collect();
        Ok(self
            .engine
            .list_blocked_date_ranges(resource_id, &reservations, &manual))
    }

    /// Is the requested window free, and if not, what else is.
    pub async fn check(
        &self,
        query: &AvailabilityQuery,
        price_per_day: Option<Cents>,
    ) -> Result<AvailabilityReport, EngineError> {
        let started = Instant::now();
        let result = self.check_inner(query, price_per_day).await;
        record_query("check", started, &result);
        result
    }

    async fn check_inner(
        &self,
        query: &AvailabilityQuery,
        price_per_day: Option<Cents>,
    ) -> Result<AvailabilityReport, EngineError> {
        let resource_id = query.resource_id;
        let blocked = self
            .blocked_from(resource_id, day_floor(query.requested.start()))
            .await?;
        let available = self
            .engine
            .is_available(resource_id, &query.requested, &blocked);

        let suggestions = if available {
            Vec::new()
        } else {
            let options = SearchOptions {
                price_per_day,
                ..self.options
            };
            self.engine
                .find_next_available_windows(resource_id, &query.requested, &blocked, &options)?
        };

        debug!(%resource_id, requested = %query.requested, available, suggestions = suggestions.len(), "check");
        Ok(AvailabilityReport {
            resource_id,
            requested: query.requested,
            available,
            suggestions,
        })
    }

    /// Ids from `resource_ids` that are free for `requested`, in input order.
    /// `excluded` ids are skipped without a lookup. Any repository failure
    /// fails the whole batch.
    pub async fn filter_available(
        &self,
        resource_ids: &[Ulid],
        requested: &DateInterval,
        excluded: &HashSet<Ulid>,
    ) -> Result<Vec<Ulid>, EngineError> {
        if resource_ids.len() > MAX_FLEET_QUERY_IDS {
            return Err(EngineError::LimitExceeded("too many resources in one query"));
        }
        let started = Instant::now();
        let mut seen = HashSet::new();
        let candidates: Vec<Ulid> = resource_ids
            .iter()
            .copied()
            .filter(|id| !excluded.contains(id) && seen.insert(*id))
            .collect();

        let from = day_floor(requested.start());
        let result = try_join_all(candidates.iter().map(|&id| async move {
            let blocked = self.blocked_from(id, from).await?;
            Ok::<_, EngineError>(self.engine.is_available(id, requested, &blocked).then_some(id))
        }))
        .await
        .map(|found| found.into_iter().flatten().collect::<Vec<_>>());

        record_query("filter_available", started, &result);
        if let Ok(ref available) = result {
            debug!(
                requested = %requested,
                candidates = candidates.len(),
                available = available.len(),
                "fleet filter"
            );
        }
        result
    }

    /// Free gaps between `from` and `until`, widened to whole UTC days.
    pub async fn next_available_range(
        &self,
        resource_id: Ulid,
        from: Ms,
        until: Ms,
        max_options: usize,
    ) -> Result<Vec<DateInterval>, EngineError> {
        if max_options > MAX_SEARCH_RESULTS {
            return Err(EngineError::LimitExceeded("too many results requested"));
        }
        let started = Instant::now();
        let result = async {
            let window = DateInterval::try_new(day_floor(from), day_ceil(until))?;
            let blocked = self.blocked_from(resource_id, window.start()).await?;
            Ok::<_, EngineError>(free_ranges(&blocked, &window, max_options))
        }
        .await;
        record_query("next_available_range", started, &result);
        result
    }

    /// First UTC day at or after `from` with nothing booked or blocked,
    /// looking ahead a fixed number of days.
    pub async fn next_available_date(
        &self,
        resource_id: Ulid,
        from: Ms,
    ) -> Result<Option<Ms>, EngineError> {
        let started = Instant::now();
        let result = async {
            let blocked = self.blocked_from(resource_id, day_floor(from)).await?;
            Ok::<_, EngineError>(next_free_day(&blocked, from, NEXT_FREE_DAY_HORIZON_DAYS))
        }
        .await;
        record_query("next_available_date", started, &result);
        result
    }

    /// Source-tagged blocked ranges touching `[from, to)`. `to` defaults to
    /// a fixed lookahead.
    pub async fn blocked_ranges(
        &self,
        resource_id: Ulid,
        from: Ms,
        to: Option<Ms>,
    ) -> Result<Vec<BlockedRange>, EngineError> {
        let started = Instant::now();
        let result = async {
            let start = day_floor(from);
            let end = to.unwrap_or_else(|| add_days(start, DEFAULT_BLOCKED_LOOKAHEAD_DAYS));
            let window = DateInterval::try_new(start, day_ceil(end))?;
            let (reservations, blocks) = futures::try_join!(
                self.repo.get_blocking_reservations(resource_id, window.start()),
                self.repo.get_manual_blocks(resource_id, window.start()),
            )?;
            let mut ranges = self
                .engine
                .list_blocked_ranges_detailed(resource_id, &reservations, &blocks);
            ranges.retain(|r| r.interval.overlaps(&window));
            Ok::<_, EngineError>(ranges)
        }
        .await;
        record_query("blocked_ranges", started, &result);
        result
    }

    /// Confirmed and in-progress reservations: total and a short preview.
    pub async fn active_reservations(
        &self,
        resource_id: Ulid,
    ) -> Result<ActiveReservations, EngineError> {
        let started = Instant::now();
        let result = self.repo.get_reservations(resource_id).await.map(|all| {
            let mut active: Vec<Reservation> =
                all.into_iter().filter(|r| r.status.is_active()).collect();
            active.sort_by_key(|r| r.interval.start());
            let count = active.len();
            active.truncate(ACTIVE_RESERVATIONS_PREVIEW);
            ActiveReservations {
                count,
                preview: active,
            }
        });
        record_query("active_reservations", started, &result);
        result
    }
}
