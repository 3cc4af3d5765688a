use crate::model::{DAY_MS, Ms};

// ── Timestamps ───────────────────────────────────────────────

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2200-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 7_258_118_400_000;
/// Longest single reservation or block we accept (two years).
pub const MAX_SPAN_DURATION_MS: Ms = 730 * DAY_MS;

// ── Store ────────────────────────────────────────────────────

pub const MAX_RESERVATIONS_PER_RESOURCE: usize = 10_000;
pub const MAX_BLOCKS_PER_RESOURCE: usize = 1_000;
pub const MAX_REASON_LEN: usize = 256;

// ── WAL ──────────────────────────────────────────────────────

/// Largest frame payload written or replayed. A length header above this is
/// treated as a torn tail.
pub const MAX_FRAME_LEN: usize = 1 << 20;

// ── Forward search ───────────────────────────────────────────

pub const DEFAULT_MAX_RESULTS: usize = 3;
pub const MAX_SEARCH_RESULTS: usize = 50;
pub const DEFAULT_SEARCH_HORIZON_DAYS: i64 = 60;
pub const MAX_SEARCH_HORIZON_DAYS: i64 = 730;
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;
pub const MAX_SEARCH_ATTEMPTS: usize = 10_000;

// ── Service queries ──────────────────────────────────────────

pub const NEXT_FREE_DAY_HORIZON_DAYS: i64 = 90;
pub const DEFAULT_FREE_RANGE_DAYS: i64 = 60;
pub const DEFAULT_BLOCKED_LOOKAHEAD_DAYS: i64 = 90;
pub const ACTIVE_RESERVATIONS_PREVIEW: usize = 10;
pub const MAX_FLEET_QUERY_IDS: usize = 1_000;

// ── Background tasks ─────────────────────────────────────────

pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1_000;
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;
