use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use ulid::Ulid;

use crate::engine::EngineError;

/// Unix milliseconds; the only time type.
pub type Ms = i64;

/// Money in minor currency units.
pub type Cents = i64;

pub const DAY_MS: Ms = 86_400_000;

// ── Day arithmetic (UTC) ─────────────────────────────────────────

/// Floor a timestamp to 00:00 UTC of the day containing it. Saturates at
/// `Ms::MIN`.
pub fn day_floor(t: Ms) -> Ms {
    t.saturating_sub(t.rem_euclid(DAY_MS))
}

/// Round up to the next 00:00 UTC; already-aligned timestamps stay put.
pub fn day_ceil(t: Ms) -> Ms {
    day_floor(t.saturating_add(DAY_MS - 1))
}

pub fn add_days(t: Ms, days: i64) -> Ms {
    t.saturating_add(days.saturating_mul(DAY_MS))
}

/// Whole days covered by `ms`, rounded up. Zero or negative input rounds toward zero.
pub fn ceil_days(ms: Ms) -> i64 {
    let whole = ms.div_euclid(DAY_MS);
    if ms.rem_euclid(DAY_MS) == 0 { whole } else { whole + 1 }
}

pub fn date_to_ms(date: Date) -> Ms {
    date.midnight().assume_utc().unix_timestamp() * 1000
}

/// Parse a `YYYY-MM-DD` calendar date as 00:00 UTC.
pub fn parse_day(input: &str) -> Result<Ms, EngineError> {
    let date = Date::parse(input, format_description!("[year]-[month]-[day]")).map_err(|e| {
        EngineError::InvalidDate {
            input: input.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(date_to_ms(date))
}

/// Render the UTC calendar day of `t` as `YYYY-MM-DD`.
pub fn format_day(t: Ms) -> String {
    match OffsetDateTime::from_unix_timestamp(t.div_euclid(1000)) {
        Ok(dt) => dt.date().to_string(),
        Err(_) => t.to_string(),
    }
}

// ── Intervals ────────────────────────────────────────────────────

/// Half-open interval `[start, end)`. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct DateInterval {
    start: Ms,
    end: Ms,
}

#[derive(Deserialize)]
struct RawInterval {
    start: Ms,
    end: Ms,
}

impl TryFrom<RawInterval> for DateInterval {
    type Error = EngineError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Self::try_new(raw.start, raw.end)
    }
}

impl DateInterval {
    pub fn try_new(start: Ms, end: Ms) -> Result<Self, EngineError> {
        if start >= end {
            return Err(EngineError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// `days` whole days starting at `start`.
    pub fn from_days(start: Ms, days: i64) -> Result<Self, EngineError> {
        Self::try_new(start, add_days(start, days))
    }

    /// Parse a pair of `YYYY-MM-DD` dates; `to` is exclusive.
    pub fn parse_days(from: &str, to: &str) -> Result<Self, EngineError> {
        Self::try_new(parse_day(from)?, parse_day(to)?)
    }

    pub fn start(&self) -> Ms {
        self.start
    }

    pub fn end(&self) -> Ms {
        self.end
    }

    /// Saturates at `Ms::MAX` for intervals wider than the `i64` range.
    pub fn duration_ms(&self) -> Ms {
        self.end.saturating_sub(self.start)
    }

    /// Duration rounded up to whole days; at least 1 for any valid interval.
    pub fn duration_days(&self) -> i64 {
        ceil_days(self.duration_ms())
    }

    pub fn overlaps(&self, other: &DateInterval) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }

    /// Smallest interval covering both.
    pub fn hull(&self, other: &DateInterval) -> DateInterval {
        DateInterval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Intersection with `other`, if non-empty.
    pub fn clamp_to(&self, other: &DateInterval) -> Option<DateInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(DateInterval { start, end })
    }
}

impl std::fmt::Display for DateInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", format_day(self.start), format_day(self.end))
    }
}

// ── Reservations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    PendingPayment,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    /// A pending reservation whose start passed without confirmation.
    Expired,
}

impl ReservationStatus {
    /// Blocking statuses occupy the resource.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::PendingPayment | Self::Confirmed | Self::InProgress
        )
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending | Self::PendingPayment)
    }

    /// Confirmed or running; what an owner sees as an active booking.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Confirmed | Self::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingPayment => "pending_payment",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub resource_id: Ulid,
    pub interval: DateInterval,
    pub status: ReservationStatus,
}

impl Reservation {
    pub fn is_blocking(&self) -> bool {
        self.status.is_blocking()
    }
}

/// Owner-entered unavailability (maintenance, personal use).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualBlock {
    pub id: Ulid,
    pub resource_id: Ulid,
    pub interval: DateInterval,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockSource {
    Reservation { id: Ulid },
    Manual { id: Ulid, reason: Option<String> },
}

/// A blocked range together with what blocks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedRange {
    pub interval: DateInterval,
    pub source: BlockSource,
}

// ── Queries ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub resource_id: Ulid,
    pub requested: DateInterval,
}

impl AvailabilityQuery {
    pub fn new(resource_id: Ulid, requested: DateInterval) -> Result<Self, EngineError> {
        let days = requested.duration_days();
        if days < 1 {
            return Err(EngineError::InvalidDuration { days });
        }
        Ok(Self {
            resource_id,
            requested,
        })
    }

    /// Build from raw bounds. Empty or inverted bounds give zero or negative
    /// days and are reported as an invalid duration.
    pub fn from_bounds(resource_id: Ulid, start: Ms, end: Ms) -> Result<Self, EngineError> {
        let days = ceil_days(end.saturating_sub(start));
        if days < 1 {
            return Err(EngineError::InvalidDuration { days });
        }
        Self::new(resource_id, DateInterval::try_new(start, end)?)
    }

    pub fn duration_days(&self) -> i64 {
        self.requested.duration_days()
    }
}

/// A free window offered instead of a conflicting request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeSuggestion {
    pub window: DateInterval,
    pub duration_days: i64,
    pub discount_percent: u8,
    pub price_per_day: Option<Cents>,
    pub total_price: Option<Cents>,
    pub savings: Option<Cents>,
}

// ── Per-resource state ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ResourceCalendar {
    pub resource_id: Ulid,
    /// Sorted by `interval.start`.
    pub reservations: Vec<Reservation>,
    /// Sorted by `interval.start`.
    pub blocks: Vec<ManualBlock>,
}

impl ResourceCalendar {
    pub fn new(resource_id: Ulid) -> Self {
        Self {
            resource_id,
            reservations: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .partition_point(|r| r.interval.start <= reservation.interval.start);
        self.reservations.insert(pos, reservation);
    }

    pub fn reservation_mut(&mut self, id: Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == id)
    }

    pub fn insert_block(&mut self, block: ManualBlock) {
        let pos = self
            .blocks
            .partition_point(|b| b.interval.start <= block.interval.start);
        self.blocks.insert(pos, block);
    }

    pub fn remove_block(&mut self, id: Ulid) -> Option<ManualBlock> {
        let pos = self.blocks.iter().position(|b| b.id == id)?;
        Some(self.blocks.remove(pos))
    }

    /// Reservations whose interval overlaps `query`, any status.
    /// Binary search skips everything starting at or after `query.end`.
    pub fn overlapping(&self, query: &DateInterval) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.interval.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.interval.end > query.start)
    }

    pub fn first_blocking_conflict(&self, query: &DateInterval) -> Option<&Reservation> {
        self.overlapping(query).find(|r| r.is_blocking())
    }

    /// Blocking reservations that end after `from`.
    pub fn blocking_from(&self, from: Ms) -> impl Iterator<Item = &Reservation> {
        self.reservations
            .iter()
            .filter(move |r| r.is_blocking() && r.interval.end > from)
    }

    pub fn blocks_from(&self, from: Ms) -> impl Iterator<Item = &ManualBlock> {
        self.blocks.iter().filter(move |b| b.interval.end > from)
    }
}

/// The WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ReservationCommitted {
        reservation: Reservation,
    },
    StatusChanged {
        id: Ulid,
        resource_id: Ulid,
        status: ReservationStatus,
    },
    BlockAdded {
        block: ManualBlock,
    },
    BlockRemoved {
        id: Ulid,
        resource_id: Ulid,
    },
}

impl Event {
    pub fn resource_id(&self) -> Ulid {
        match self {
            Event::ReservationCommitted { reservation } => reservation.resource_id,
            Event::BlockAdded { block } => block.resource_id,
            Event::StatusChanged { resource_id, .. } | Event::BlockRemoved { resource_id, .. } => {
                *resource_id
            }
        }
    }
}
