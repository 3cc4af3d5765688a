use crate::model::*;

/// Blocking-status reservations followed by manual blocks. Overlaps are kept.
pub fn blocked_date_ranges(
    reservations: &[Reservation],
    manual_blocks: &[DateInterval],
) -> Vec<DateInterval> {
    reservations
        .iter()
        .filter(|r| r.is_blocking())
        .map(|r| r.interval)
        .chain(manual_blocks.iter().copied())
        .collect()
}

/// Same merge as [`blocked_date_ranges`], keeping track of the source of each range.
pub fn blocked_ranges_detailed(
    reservations: &[Reservation],
    manual_blocks: &[ManualBlock],
) -> Vec<BlockedRange> {
    let mut ranges: Vec<BlockedRange> = reservations
        .iter()
        .filter(|r| r.is_blocking())
        .map(|r| BlockedRange {
            interval: r.interval,
            source: BlockSource::Reservation { id: r.id },
        })
        .chain(manual_blocks.iter().map(|b| BlockedRange {
            interval: b.interval,
            source: BlockSource::Manual {
                id: b.id,
                reason: b.reason.clone(),
            },
        }))
        .collect();
    ranges.sort_by_key(|r| r.interval.start());
    ranges
}
