//! Inclusive calendar-date filters.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::RangeError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Optional inclusive `[from, to]` date filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<NaiveDate>,
}

impl DateRange {
    /// Build a range, rejecting inverted bounds.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::Inverted`] when `from` is after `to`.
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, RangeError> {
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(RangeError::Inverted { from, to });
        }
        Ok(Self { from, to })
    }

    /// Parse `YYYY-MM-DD` bounds as supplied on the command line.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::InvalidDate`] for malformed bounds and
    /// [`RangeError::Inverted`] when `from` is after `to`.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, RangeError> {
        Self::new(parse_bound("from", from)?, parse_bound("to", to)?)
    }

    /// Start bound, if any.
    #[must_use]
    pub const fn from(&self) -> Option<NaiveDate> {
        self.from
    }

    /// End bound, if any.
    #[must_use]
    pub const fn to(&self) -> Option<NaiveDate> {
        self.to
    }

    /// `true` when neither bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Query parameters for the set bounds.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(from) = self.from {
            pairs.push(("from", from.format(DATE_FORMAT).to_string()));
        }
        if let Some(to) = self.to {
            pairs.push(("to", to.format(DATE_FORMAT).to_string()));
        }
        pairs
    }
}

fn parse_bound(field: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, RangeError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .map_err(|_| RangeError::InvalidDate {
            field,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parse_accepts_open_and_closed_ranges() {
        let open = DateRange::parse(None, Some("")).expect("open range");
        assert!(open.is_unbounded());
        assert!(open.query_pairs().is_empty());

        let closed = DateRange::parse(Some("2026-01-01"), Some("2026-01-31")).expect("closed");
        assert_eq!(closed.from(), Some(date(2026, 1, 1)));
        assert_eq!(
            closed.query_pairs(),
            vec![
                ("from", "2026-01-01".to_string()),
                ("to", "2026-01-31".to_string())
            ]
        );
    }

    #[test]
    fn parse_rejects_malformed_dates() {
        let err = DateRange::parse(Some("01/02/2026"), None).expect_err("malformed");
        assert!(matches!(err, RangeError::InvalidDate { field: "from", .. }));
        assert!(err.to_string().contains("01/02/2026"));
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let err = DateRange::parse(Some("2026-02-01"), Some("2026-01-01")).expect_err("inverted");
        assert_eq!(
            err,
            RangeError::Inverted {
                from: date(2026, 2, 1),
                to: date(2026, 1, 1),
            }
        );
    }

    #[test]
    fn single_day_range_is_accepted() {
        let day = date(2026, 5, 5);
        let range = DateRange::new(Some(day), Some(day)).expect("single day");
        assert_eq!(
            range.query_pairs(),
            vec![("from", "2026-05-05".to_string()), ("to", "2026-05-05".to_string())]
        );
    }
}
