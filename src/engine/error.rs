use ulid::Ulid;

use crate::model::Ms;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `start >= end` on an interval.
    InvalidInterval { start: Ms, end: Ms },
    /// A query or search that covers less than one whole day.
    InvalidDuration { days: i64 },
    InvalidDate { input: String, reason: String },
    /// The reservation source failed; passed through untouched.
    RepositoryUnavailable(String),
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// Commit rejected: overlaps the given blocking reservation.
    Conflict(Ulid),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidInterval { start, end } => {
                write!(f, "invalid interval [{start}, {end}): start must be before end")
            }
            EngineError::InvalidDuration { days } => {
                write!(f, "invalid duration: {days} days, need at least 1")
            }
            EngineError::InvalidDate { input, reason } => {
                write!(f, "invalid date {input:?}: {reason}")
            }
            EngineError::RepositoryUnavailable(e) => write!(f, "repository unavailable: {e}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::Conflict(id) => write!(f, "conflict with reservation: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInterval { .. } => "invalid_interval",
            EngineError::InvalidDuration { .. } => "invalid_duration",
            EngineError::InvalidDate { .. } => "invalid_date",
            EngineError::RepositoryUnavailable(_) => "repository_unavailable",
            EngineError::NotFound(_) => "not_found",
            EngineError::AlreadyExists(_) => "already_exists",
            EngineError::Conflict(_) => "conflict",
            EngineError::LimitExceeded(_) => "limit_exceeded",
            EngineError::WalError(_) => "wal",
        }
    }
}
