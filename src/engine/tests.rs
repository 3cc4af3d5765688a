use super::*;
use crate::clock::FixedClock;
use crate::limits::*;
use crate::pricing::NoDiscount;

use proptest::prelude::*;

fn day(s: &str) -> Ms {
    parse_day(s).unwrap()
}

fn days(from: &str, to: &str) -> DateInterval {
    DateInterval::parse_days(from, to).unwrap()
}

fn engine_at(now: &str) -> AvailabilityEngine {
    AvailabilityEngine::new(Arc::new(FixedClock::new(day(now))))
}

fn reservation(from: &str, to: &str, status: ReservationStatus) -> Reservation {
    Reservation {
        id: Ulid::new(),
        resource_id: Ulid::nil(),
        interval: days(from, to),
        status,
    }
}

// ── Scenarios ────────────────────────────────────────────

#[test]
fn overlapping_request_is_unavailable() {
    let engine = engine_at("2025-10-01");
    let blocking = [days("2025-11-01", "2025-11-05")];
    assert!(!engine.is_available(Ulid::new(), &days("2025-11-03", "2025-11-06"), &blocking));
}

#[test]
fn adjacent_request_is_available() {
    let engine = engine_at("2025-10-01");
    let blocking = [days("2025-11-01", "2025-11-05")];
    assert!(engine.is_available(Ulid::new(), &days("2025-11-05", "2025-11-08"), &blocking));
}

#[test]
fn no_reservations_is_available() {
    let engine = engine_at("2025-10-01");
    assert!(engine.is_available(Ulid::new(), &days("2025-11-05", "2025-11-08"), &[]));
    assert!(engine.is_available(Ulid::new(), &days("1990-01-01", "2199-01-01"), &[]));
}

#[test]
fn conflicting_request_gets_three_consecutive_windows() {
    let engine = engine_at("2025-11-01");
    let requested = days("2025-11-10", "2025-11-15");
    let blocking = [days("2025-11-10", "2025-11-20")];
    assert!(!engine.is_available(Ulid::new(), &requested, &blocking));

    let suggestions = engine
        .find_next_available_windows(Ulid::new(), &requested, &blocking, &SearchOptions::default())
        .unwrap();
    let windows: Vec<_> = suggestions.iter().map(|s| s.window).collect();
    assert_eq!(
        windows,
        vec![
            days("2025-11-21", "2025-11-26"),
            days("2025-11-26", "2025-12-01"),
            days("2025-12-01", "2025-12-06"),
        ]
    );
    assert!(suggestions.iter().all(|s| s.duration_days == 5));
}

#[test]
fn zero_length_query_is_invalid_duration() {
    let d = day("2025-11-10");
    let result = AvailabilityQuery::from_bounds(Ulid::new(), d, d);
    assert!(matches!(result, Err(EngineError::InvalidDuration { days: 0 })));
}

// ── Boundaries ───────────────────────────────────────────

#[test]
fn one_ms_into_reservation_conflicts() {
    let engine = engine_at("2025-10-01");
    let blocking = [days("2025-11-01", "2025-11-05")];
    let requested = DateInterval::try_new(day("2025-11-05") - 1, day("2025-11-08")).unwrap();
    assert!(!engine.is_available(Ulid::new(), &requested, &blocking));
}

#[test]
fn request_ending_where_reservation_starts_is_available() {
    let engine = engine_at("2025-10-01");
    let blocking = [days("2025-11-05", "2025-11-08")];
    assert!(engine.is_available(Ulid::new(), &days("2025-11-01", "2025-11-05"), &blocking));
}

#[test]
fn reservations_far_in_the_past_still_checked() {
    let engine = engine_at("2030-01-01");
    let blocking = [days("2001-01-01", "2001-01-10")];
    assert!(!engine.is_available(Ulid::new(), &days("2001-01-05", "2001-01-06"), &blocking));
}

#[test]
fn is_available_idempotent() {
    let engine = engine_at("2025-10-01");
    let blocking = [days("2025-11-01", "2025-11-05"), days("2025-11-09", "2025-11-10")];
    let requested = days("2025-11-04", "2025-11-06");
    let first = engine.is_available(Ulid::new(), &requested, &blocking);
    let second = engine.is_available(Ulid::new(), &requested, &blocking);
    assert_eq!(first, second);
}

// ── Forward search ───────────────────────────────────────

#[test]
fn search_uses_clock_when_reference_now_unset() {
    let clock = Arc::new(FixedClock::new(day("2025-11-01")));
    let engine = AvailabilityEngine::new(clock.clone());
    let requested = days("2025-11-10", "2025-11-15");
    let opts = SearchOptions {
        search_horizon_days: 20,
        ..SearchOptions::default()
    };
    let found = engine
        .find_next_available_windows(Ulid::new(), &requested, &[], &opts)
        .unwrap();
    assert_eq!(found.len(), 1);

    // Moving the clock moves the horizon.
    clock.set(day("2025-12-01"));
    let found = engine
        .find_next_available_windows(Ulid::new(), &requested, &[], &opts)
        .unwrap();
    assert_eq!(found.len(), 3);
}

#[test]
fn explicit_reference_now_wins_over_clock() {
    let engine = engine_at("2030-01-01");
    let requested = days("2025-11-10", "2025-11-15");
    let opts = SearchOptions {
        reference_now: Some(day("2025-11-01")),
        ..SearchOptions::default()
    };
    let found = engine
        .find_next_available_windows(Ulid::new(), &requested, &[], &opts)
        .unwrap();
    assert_eq!(found[0].window.start(), day("2025-11-16"));
}

#[test]
fn horizon_already_passed_returns_empty() {
    let engine = engine_at("2025-11-01");
    let requested = days("2026-06-01", "2026-06-03");
    let found = engine
        .find_next_available_windows(Ulid::new(), &requested, &[], &SearchOptions::default())
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn full_range_request_does_not_overflow() {
    let engine = engine_at("2025-11-01");
    let requested = DateInterval::try_new(i64::MIN, 1).unwrap();
    let found = engine
        .find_next_available_windows(Ulid::new(), &requested, &[], &SearchOptions::default())
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].window.start(), DAY_MS);
    assert_eq!(found[0].window.end(), i64::MAX);

    let everything = [DateInterval::try_new(i64::MIN, i64::MAX).unwrap()];
    assert!(!engine.is_available(Ulid::new(), &requested, &everything));
    let found = engine
        .find_next_available_windows(Ulid::new(), &requested, &everything, &SearchOptions::default())
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn oversized_options_rejected() {
    let engine = engine_at("2025-11-01");
    let opts = SearchOptions {
        max_results: MAX_SEARCH_RESULTS + 1,
        ..SearchOptions::default()
    };
    let result =
        engine.find_next_available_windows(Ulid::new(), &days("2025-11-10", "2025-11-11"), &[], &opts);
    assert!(matches!(result, Err(EngineError::LimitExceeded(_))));
}

#[test]
fn dense_one_day_reservations_terminate_within_cap() {
    let engine = engine_at("2025-01-01");
    let start = day("2025-01-01");
    // Thousands of back-to-back one-day bookings, shuffled by reversing.
    let blocking: Vec<_> = (0..5_000)
        .rev()
        .map(|i| DateInterval::from_days(add_days(start, i), 1).unwrap())
        .collect();
    let opts = SearchOptions {
        search_horizon_days: MAX_SEARCH_HORIZON_DAYS,
        ..SearchOptions::default()
    };
    let found = engine
        .find_next_available_windows(Ulid::new(), &days("2025-01-01", "2025-01-03"), &blocking, &opts)
        .unwrap();
    assert!(found.is_empty());
    let outcome = forward_sweep(
        &days("2025-01-01", "2025-01-03"),
        &blocking,
        start,
        &opts,
        &NoDiscount,
    )
    .unwrap();
    assert_eq!(outcome.attempts, DEFAULT_MAX_ATTEMPTS);
}

#[test]
fn suggestions_pass_is_available() {
    let engine = engine_at("2025-11-01");
    let blocking = [
        days("2025-11-10", "2025-11-20"),
        days("2025-11-23", "2025-11-24"),
        days("2025-12-02", "2025-12-09"),
    ];
    let requested = days("2025-11-10", "2025-11-14");
    let opts = SearchOptions {
        max_results: 10,
        ..SearchOptions::default()
    };
    let found = engine
        .find_next_available_windows(Ulid::new(), &requested, &blocking, &opts)
        .unwrap();
    assert!(!found.is_empty());
    for s in &found {
        assert!(engine.is_available(Ulid::new(), &s.window, &blocking), "{} conflicts", s.window);
    }
}

#[test]
fn custom_pricing_is_used() {
    let engine = engine_at("2025-11-01").with_pricing(Arc::new(NoDiscount));
    let opts = SearchOptions {
        max_results: 1,
        price_per_day: Some(1_000),
        ..SearchOptions::default()
    };
    let found = engine
        .find_next_available_windows(Ulid::new(), &days("2025-11-02", "2025-12-02"), &[], &opts)
        .unwrap();
    assert_eq!(found[0].duration_days, 30);
    assert_eq!(found[0].discount_percent, 0);
    assert_eq!(found[0].total_price, Some(30_000));
}

#[test]
fn default_pricing_discounts_long_rentals() {
    let engine = engine_at("2025-11-01");
    let opts = SearchOptions {
        max_results: 1,
        price_per_day: Some(1_000),
        ..SearchOptions::default()
    };
    let found = engine
        .find_next_available_windows(Ulid::new(), &days("2025-11-02", "2025-12-02"), &[], &opts)
        .unwrap();
    assert_eq!(found[0].discount_percent, 20);
    assert_eq!(found[0].total_price, Some(24_000));
    assert_eq!(found[0].savings, Some(6_000));
}

// ── Blocked ranges ───────────────────────────────────────

#[test]
fn blocked_ranges_merge_reservations_and_manual_blocks() {
    let engine = engine_at("2025-11-01");
    let reservations = [
        reservation("2025-11-01", "2025-11-05", ReservationStatus::Pending),
        reservation("2025-11-02", "2025-11-03", ReservationStatus::Completed),
    ];
    let manual = [days("2025-11-04", "2025-11-10")];
    let ranges = engine.list_blocked_date_ranges(Ulid::new(), &reservations, &manual);
    assert_eq!(ranges, vec![days("2025-11-01", "2025-11-05"), days("2025-11-04", "2025-11-10")]);
}

// ── Properties ───────────────────────────────────────────

fn arb_interval() -> impl Strategy<Value = DateInterval> {
    let base = day("2025-01-01");
    (0i64..400 * 24, 1i64..30 * 24).prop_map(move |(offset_h, len_h)| {
        let start = base + offset_h * 3_600_000;
        DateInterval::try_new(start, start + len_h * 3_600_000).unwrap()
    })
}

proptest! {
    #[test]
    fn overlap_symmetric(a in arb_interval(), b in arb_interval()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    #[test]
    fn overlap_reflexive(a in arb_interval()) {
        prop_assert!(a.overlaps(&a));
    }

    #[test]
    fn suggestions_always_free(
        requested in arb_interval(),
        blocking in prop::collection::vec(arb_interval(), 0..60),
        max_results in 0usize..10,
    ) {
        let now = day("2025-01-01");
        let opts = SearchOptions {
            max_results,
            reference_now: Some(now),
            search_horizon_days: 500,
            ..SearchOptions::default()
        };
        let out = forward_sweep(&requested, &blocking, now, &opts, &NoDiscount).unwrap();
        prop_assert!(out.attempts <= opts.max_attempts);
        prop_assert!(out.suggestions.len() <= max_results);
        for s in &out.suggestions {
            prop_assert!(is_free(&s.window, &blocking), "{} overlaps snapshot", s.window);
            prop_assert_eq!(s.duration_days, requested.duration_days());
            prop_assert!(s.window.start() > requested.end());
        }
        // Windows are emitted strictly forward in time.
        for pair in out.suggestions.windows(2) {
            prop_assert!(pair[0].window.end() <= pair[1].window.start());
        }
    }

    #[test]
    fn sweep_bounded_by_max_attempts(
        blocking in prop::collection::vec(arb_interval(), 0..200),
        max_attempts in 0usize..50,
    ) {
        let now = day("2025-01-01");
        let opts = SearchOptions {
            max_results: MAX_SEARCH_RESULTS,
            max_attempts,
            search_horizon_days: MAX_SEARCH_HORIZON_DAYS,
            reference_now: Some(now),
            price_per_day: None,
        };
        let requested = days("2025-01-01", "2025-01-02");
        let out = forward_sweep(&requested, &blocking, now, &opts, &NoDiscount).unwrap();
        prop_assert!(out.attempts <= max_attempts);
    }

    #[test]
    fn availability_matches_pairwise_overlap(
        requested in arb_interval(),
        blocking in prop::collection::vec(arb_interval(), 0..20),
    ) {
        let expected = blocking.iter().all(|b| !(requested.start() < b.end() && requested.end() > b.start()));
        prop_assert_eq!(is_free(&requested, &blocking), expected);
    }
}
