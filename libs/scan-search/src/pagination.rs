//! Page normalization.

pub const DEFAULT_PER_PAGE: u64 = 100;
pub const MAX_PER_PAGE: u64 = 1000;
/// Largest offset a signed 64-bit `OFFSET` / `from` accepts.
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// Normalized 1-based page window. Always `page >= 1` and
/// `1 <= per_page <= MAX_PER_PAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Pagination {
    /// `per_page == 0` means the default; larger values are clamped. `page == 0`
    /// means the first page. Idempotent.
    pub fn normalize(page: u64, per_page: u64) -> Self {
        let per_page = match per_page {
            0 => DEFAULT_PER_PAGE,
            n => n.min(MAX_PER_PAGE),
        };
        Self {
            page: page.max(1),
            per_page,
        }
    }

    /// Rows to skip. Capped at `MAX_OFFSET` on absurd page numbers.
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.per_page)
            .min(MAX_OFFSET)
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::normalize(1, 0)
    }
}
