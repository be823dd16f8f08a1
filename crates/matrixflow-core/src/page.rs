//! Pagination requests for list endpoints.

use crate::error::PageError;

/// Rows per page when the caller does not ask for a size.
pub const DEFAULT_PAGE_LIMIT: u32 = 25;

/// Largest page the backend is asked for.
pub const MAX_PAGE_LIMIT: u32 = 500;

/// Validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    /// Build a request, applying defaults for omitted values.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] when `page` is zero or `limit` is outside
    /// `1..=MAX_PAGE_LIMIT`.
    pub const fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, PageError> {
        let page = match page {
            Some(0) => return Err(PageError::ZeroPage),
            Some(page) => page,
            None => 1,
        };
        let limit = match limit {
            Some(limit) if limit == 0 || limit > MAX_PAGE_LIMIT => {
                return Err(PageError::LimitOutOfRange {
                    limit,
                    max: MAX_PAGE_LIMIT,
                });
            }
            Some(limit) => limit,
            None => DEFAULT_PAGE_LIMIT,
        };
        Ok(Self { page, limit })
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Query parameters for the request.
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

/// Number of pages needed for `total` rows, never less than one.
#[must_use]
pub fn total_pages(total: u64, limit: u32) -> u64 {
    let limit = u64::from(limit.max(1));
    total.div_ceil(limit).max(1)
}
