//! Page-to-window math for most-recent-first listings.
//!
//! Page `P` of a listing with `size` items per page against a live total `N`
//! starts at `from = max(N - (P+1)*size, 0)` and holds
//! `min(size, N - from)` items read in ascending order. Reversing them puts
//! the newest record first. Pages past the last one clamp to the last one.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Page actually served after clamping.
    pub page: u64,
    /// 0-based position of the first item in the ascending sequence.
    pub from: u64,
    /// Number of items in the window.
    pub size: u64,
}

impl Window {
    pub fn for_page(total: u64, page: u64, page_size: usize) -> Self {
        let page_size = page_size as u64;
        if total == 0 || page_size == 0 {
            return Self {
                page: 0,
                from: 0,
                size: 0,
            };
        }
        let last_page = (total - 1) / page_size;
        let page = page.min(last_page);
        let from = total.saturating_sub((page + 1).saturating_mul(page_size));
        let size = page_size.min(total - from);
        Self { page, from, size }
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of pages needed to show `total` items.
    pub fn page_count(total: u64, page_size: usize) -> u64 {
        if page_size == 0 {
            return 0;
        }
        total.div_ceil(page_size as u64)
    }
}
