//! Availability checks and alternative-date search over a reservation snapshot.
//!
//! # Advisory only
//!
//! Every answer here is computed from a snapshot the caller fetched earlier.
//! Two callers can both see a window as free and both try to book it, so
//! `is_available() == true` is a pre-flight filter, never a booking
//! guarantee. The authoritative check is the conflict test inside
//! [`ReservationStore::commit_reservation`](crate::store::ReservationStore::commit_reservation),
//! which runs under the resource's write lock at commit time.

mod availability;
mod blocked;
mod error;
mod search;
#[cfg(test)]
mod tests;

pub use availability::{
    free_ranges, is_free, latest_conflict_end, merge_overlapping, next_free_day, subtract_intervals,
};
pub use blocked::{blocked_date_ranges, blocked_ranges_detailed};
pub use error::EngineError;
pub use search::{SearchOptions, SweepOutcome, forward_sweep};

use std::sync::Arc;

use tracing::{debug, trace};
use ulid::Ulid;

use crate::clock::{Clock, SystemClock};
use crate::model::*;
use crate::pricing::{PricingPolicy, TieredDiscount};

/// Stateless engine. Holds only its collaborators; safe to share across tasks.
#[derive(Clone)]
pub struct AvailabilityEngine {
    clock: Arc<dyn Clock>,
    pricing: Arc<dyn PricingPolicy>,
}

impl Default for AvailabilityEngine {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl AvailabilityEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            pricing: Arc::new(TieredDiscount::default()),
        }
    }

    pub fn with_pricing(mut self, pricing: Arc<dyn PricingPolicy>) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn pricing(&self) -> &dyn PricingPolicy {
        self.pricing.as_ref()
    }

    /// `false` iff some blocking interval overlaps `requested` (half-open).
    /// No time-windowing is applied to the snapshot.
    pub fn is_available(
        &self,
        resource_id: Ulid,
        requested: &DateInterval,
        blocking: &[DateInterval],
    ) -> bool {
        let available = is_free(requested, blocking);
        trace!(%resource_id, %requested, snapshot = blocking.len(), available, "availability check");
        metrics::counter!(
            crate::observability::AVAILABILITY_CHECKS_TOTAL,
            "outcome" => if available { "available" } else { "unavailable" }
        )
        .increment(1);
        available
    }

    /// Up to `options.max_results` free windows of the same length as
    /// `requested`, searched forward from the day after it ends.
    pub fn find_next_available_windows(
        &self,
        resource_id: Ulid,
        requested: &DateInterval,
        blocking: &[DateInterval],
        options: &SearchOptions,
    ) -> Result<Vec<AlternativeSuggestion>, EngineError> {
        options.validate()?;
        let now = options.reference_now.unwrap_or_else(|| self.clock.now());
        let outcome = forward_sweep(requested, blocking, now, options, self.pricing.as_ref())?;

        debug!(
            %resource_id,
            %requested,
            found = outcome.suggestions.len(),
            attempts = outcome.attempts,
            "forward search finished"
        );
        metrics::histogram!(crate::observability::SEARCH_ATTEMPTS).record(outcome.attempts as f64);
        metrics::counter!(crate::observability::SUGGESTIONS_TOTAL)
            .increment(outcome.suggestions.len() as u64);

        Ok(outcome.suggestions)
    }

    /// Blocking reservations plus manual owner blocks, uncollapsed.
    pub fn list_blocked_date_ranges(
        &self,
        resource_id: Ulid,
        reservations: &[Reservation],
        manual_blocks: &[DateInterval],
    ) -> Vec<DateInterval> {
        let ranges = blocked_date_ranges(reservations, manual_blocks);
        trace!(%resource_id, ranges = ranges.len(), "blocked ranges listed");
        ranges
    }

    /// Like [`Self::list_blocked_date_ranges`], tagging each range with its source.
    pub fn list_blocked_ranges_detailed(
        &self,
        resource_id: Ulid,
        reservations: &[Reservation],
        manual_blocks: &[ManualBlock],
    ) -> Vec<BlockedRange> {
        let ranges = blocked_ranges_detailed(reservations, manual_blocks);
        trace!(%resource_id, ranges = ranges.len(), "detailed blocked ranges listed");
        ranges
    }
}
