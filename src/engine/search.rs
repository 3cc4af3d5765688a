use crate::limits::*;
use crate::model::*;
use crate::pricing::PricingPolicy;

use super::availability::latest_conflict_end;
use super::EngineError;

/// Knobs for [`forward_sweep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub max_results: usize,
    /// Candidates must start before `reference_now + search_horizon_days`.
    pub search_horizon_days: i64,
    /// Falls back to the engine's clock when unset.
    pub reference_now: Option<Ms>,
    /// Hard cap on candidate windows tried.
    pub max_attempts: usize,
    /// Daily price used to fill in suggestion totals.
    pub price_per_day: Option<Cents>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            search_horizon_days: DEFAULT_SEARCH_HORIZON_DAYS,
            reference_now: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            price_per_day: None,
        }
    }
}

impl SearchOptions {
    pub(super) fn validate(&self) -> Result<(), EngineError> {
        if self.max_results > MAX_SEARCH_RESULTS {
            return Err(EngineError::LimitExceeded("too many results requested"));
        }
        if self.search_horizon_days > MAX_SEARCH_HORIZON_DAYS {
            return Err(EngineError::LimitExceeded("search horizon too far"));
        }
        if self.max_attempts > MAX_SEARCH_ATTEMPTS {
            return Err(EngineError::LimitExceeded("too many attempts requested"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    pub suggestions: Vec<AlternativeSuggestion>,
    pub attempts: usize,
}

/// Walk forward from the day after `requested` ends, collecting free
/// windows of the same length.
///
/// A free candidate is emitted and the next one starts where it ends. A
/// conflicting candidate moves the cursor past the latest-ending conflict
/// plus one turnaround day, and always by at least one day, so the loop
/// makes progress even over malformed data. `max_attempts` bounds the loop.
pub fn forward_sweep(
    requested: &DateInterval,
    blocking: &[DateInterval],
    reference_now: Ms,
    options: &SearchOptions,
    pricing: &dyn PricingPolicy,
) -> Result<SweepOutcome, EngineError> {
    let days = requested.duration_days();
    if days < 1 {
        return Err(EngineError::InvalidDuration { days });
    }

    let mut sorted = blocking.to_vec();
    sorted.sort_by_key(|s| s.start());

    let horizon_end = add_days(reference_now, options.search_horizon_days);
    let mut cursor = day_floor(add_days(requested.end(), 1));
    let mut suggestions = Vec::new();
    let mut attempts = 0usize;

    while suggestions.len() < options.max_results
        && cursor < horizon_end
        && attempts < options.max_attempts
    {
        attempts += 1;
        let candidate = DateInterval::from_days(cursor, days)?;

        match latest_conflict_end(&candidate, &sorted) {
            None => {
                let quote = pricing.quote(days, options.price_per_day);
                suggestions.push(AlternativeSuggestion {
                    window: candidate,
                    duration_days: days,
                    discount_percent: quote.discount_percent,
                    price_per_day: quote.price_per_day,
                    total_price: quote.total_price,
                    savings: quote.savings,
                });
                cursor = candidate.end();
            }
            Some(conflict_end) => {
                cursor = day_floor(add_days(conflict_end, 1)).max(add_days(cursor, 1));
            }
        }
    }

    Ok(SweepOutcome {
        suggestions,
        attempts,
    })
}
