//! Validation errors for filters and pagination.

use chrono::NaiveDate;
use thiserror::Error;

/// Date range could not be built from the supplied bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// A bound was not a `YYYY-MM-DD` calendar date.
    #[error("invalid {field} date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate {
        /// Which bound failed (`from` or `to`).
        field: &'static str,
        /// Raw input.
        value: String,
    },
    /// The start bound falls after the end bound.
    #[error("date range is inverted: {from} is after {to}")]
    Inverted {
        /// Requested start.
        from: NaiveDate,
        /// Requested end.
        to: NaiveDate,
    },
}

/// Pagination parameters were out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageError {
    /// Pages are numbered from 1.
    #[error("page numbers start at 1")]
    ZeroPage,
    /// Limit outside `1..=max`.
    #[error("page limit {limit} is outside 1..={max}")]
    LimitOutOfRange {
        /// Requested limit.
        limit: u32,
        /// Largest accepted limit.
        max: u32,
    },
}
