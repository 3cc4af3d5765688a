use crate::model::*;

// ── Overlap checks ───────────────────────────────────────────────

/// True iff no interval in `blocking` overlaps `requested`. Order-independent.
pub fn is_free(requested: &DateInterval, blocking: &[DateInterval]) -> bool {
    !blocking.iter().any(|b| b.overlaps(requested))
}

/// End of the latest-ending interval overlapping `candidate`.
/// `sorted` must be ordered by start; everything starting at or after
/// `candidate.end` is skipped by binary search.
pub fn latest_conflict_end(candidate: &DateInterval, sorted: &[DateInterval]) -> Option<Ms> {
    let right_bound = sorted.partition_point(|s| s.start() < candidate.end());
    sorted[..right_bound]
        .iter()
        .filter(|s| s.end() > candidate.start())
        .map(|s| s.end())
        .max()
}

// ── Interval algebra ─────────────────────────────────────────────

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[DateInterval]) -> Vec<DateInterval> {
    let mut merged: Vec<DateInterval> = Vec::new();
    for span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start() <= last.end()
        {
            *last = last.hull(span);
            continue;
        }
        merged.push(*span);
    }
    merged
}

/// `base` minus `to_remove`. Both inputs sorted by start, `to_remove` disjoint.
pub fn subtract_intervals(base: &[DateInterval], to_remove: &[DateInterval]) -> Vec<DateInterval> {
    let mut result = Vec::new();
    let mut ri = 0;

    for b in base {
        let mut current_start = b.start();

        while ri < to_remove.len() && to_remove[ri].end() <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start() < b.end() {
            let r = &to_remove[j];
            if let Ok(piece) = DateInterval::try_new(current_start, r.start()) {
                result.push(piece);
            }
            current_start = current_start.max(r.end());
            j += 1;
        }

        if let Ok(tail) = DateInterval::try_new(current_start, b.end()) {
            result.push(tail);
        }
    }

    result
}

fn sorted_merged(blocked: &[DateInterval]) -> Vec<DateInterval> {
    let mut sorted = blocked.to_vec();
    sorted.sort_by_key(|s| s.start());
    merge_overlapping(&sorted)
}

/// Free gaps inside `window`, earliest first, at most `max_options`.
pub fn free_ranges(
    blocked: &[DateInterval],
    window: &DateInterval,
    max_options: usize,
) -> Vec<DateInterval> {
    let merged = sorted_merged(blocked);
    let mut free = subtract_intervals(std::slice::from_ref(window), &merged);
    free.truncate(max_options);
    free
}

/// First UTC day at or after `from` that no blocked interval touches.
/// Days up to and including `from + horizon_days` are considered.
pub fn next_free_day(blocked: &[DateInterval], from: Ms, horizon_days: i64) -> Option<Ms> {
    let first_day = day_floor(from);
    let last_day = add_days(first_day, horizon_days);
    let mut cursor = first_day;

    for span in &sorted_merged(blocked) {
        if span.end() <= cursor {
            continue;
        }
        if span.start() >= add_days(cursor, 1) {
            break;
        }
        cursor = day_ceil(span.end());
        if cursor > last_day {
            return None;
        }
    }

    (cursor <= last_day).then_some(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: Ms, end: Ms) -> DateInterval {
        DateInterval::try_new(start, end).unwrap()
    }

    fn days(from: &str, to: &str) -> DateInterval {
        DateInterval::parse_days(from, to).unwrap()
    }

    #[test]
    fn is_free_empty() {
        assert!(is_free(&iv(0, 10), &[]));
    }

    #[test]
    fn is_free_unsorted_input() {
        let blocking = [iv(500, 600), iv(0, 100), iv(250, 300)];
        assert!(!is_free(&iv(90, 95), &blocking));
        assert!(is_free(&iv(100, 250), &blocking));
        assert!(!is_free(&iv(299, 301), &blocking));
    }

    #[test]
    fn latest_conflict_picks_max_end() {
        let sorted = [iv(0, 50), iv(10, 300), iv(20, 120), iv(400, 500)];
        assert_eq!(latest_conflict_end(&iv(40, 60), &sorted), Some(300));
        assert_eq!(latest_conflict_end(&iv(300, 400), &sorted), None);
        assert_eq!(latest_conflict_end(&iv(350, 450), &sorted), Some(500));
    }

    #[test]
    fn merge_adjacent_and_overlapping() {
        let sorted = [iv(0, 100), iv(100, 200), iv(150, 180), iv(300, 400)];
        assert_eq!(merge_overlapping(&sorted), vec![iv(0, 200), iv(300, 400)]);
    }

    #[test]
    fn merge_empty() {
        assert!(merge_overlapping(&[]).is_empty());
    }

    #[test]
    fn subtract_splits_base() {
        let base = [iv(0, 1000)];
        let remove = [iv(100, 200), iv(500, 600)];
        assert_eq!(
            subtract_intervals(&base, &remove),
            vec![iv(0, 100), iv(200, 500), iv(600, 1000)]
        );
    }

    #[test]
    fn subtract_covering_removes_all() {
        let base = [iv(100, 200)];
        let remove = [iv(0, 1000)];
        assert!(subtract_intervals(&base, &remove).is_empty());
    }

    #[test]
    fn subtract_multiple_bases_share_cursor() {
        let base = [iv(0, 100), iv(200, 300)];
        let remove = [iv(50, 250)];
        assert_eq!(
            subtract_intervals(&base, &remove),
            vec![iv(0, 50), iv(250, 300)]
        );
    }

    #[test]
    fn free_ranges_between_bookings() {
        let blocked = [
            days("2025-11-10", "2025-11-15"),
            days("2025-11-01", "2025-11-04"),
            days("2025-11-12", "2025-11-18"),
        ];
        let window = days("2025-11-01", "2025-12-01");
        assert_eq!(
            free_ranges(&blocked, &window, 5),
            vec![
                days("2025-11-04", "2025-11-10"),
                days("2025-11-18", "2025-12-01"),
            ]
        );
        assert_eq!(free_ranges(&blocked, &window, 1).len(), 1);
    }

    #[test]
    fn free_ranges_fully_blocked() {
        let blocked = [days("2025-10-01", "2026-01-01")];
        assert!(free_ranges(&blocked, &days("2025-11-01", "2025-12-01"), 3).is_empty());
    }

    #[test]
    fn next_free_day_skips_chained_blocks() {
        let blocked = [
            days("2025-11-01", "2025-11-03"),
            days("2025-11-03", "2025-11-05"),
            days("2025-11-06", "2025-11-07"),
        ];
        let from = parse_day("2025-11-01").unwrap();
        assert_eq!(
            next_free_day(&blocked, from, 90),
            Some(parse_day("2025-11-05").unwrap())
        );
    }

    #[test]
    fn next_free_day_partial_day_block_taints_whole_day() {
        let d = parse_day("2025-11-01").unwrap();
        let blocked = [iv(d + 3_600_000, d + 2 * 3_600_000)];
        assert_eq!(next_free_day(&blocked, d, 10), Some(d + DAY_MS));
    }

    #[test]
    fn next_free_day_none_within_horizon() {
        let blocked = [days("2025-11-01", "2026-03-01")];
        let from = parse_day("2025-11-01").unwrap();
        assert_eq!(next_free_day(&blocked, from, 30), None);
    }

    #[test]
    fn next_free_day_immediately() {
        let from = parse_day("2025-11-01").unwrap() + 5_000;
        assert_eq!(next_free_day(&[], from, 0), Some(day_floor(from)));
    }
}
