//! Page arithmetic for list views.
//!
//! Pages are 1-indexed. Page `p` of size `n` covers the inclusive row window
//! `[(p - 1) * n, p * n - 1]`, which is what the backend's `Range` header
//! takes.

/// A requested page of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    /// 1-indexed; 0 is treated as 1.
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Page `page` of `page_size` rows. A zero size is bumped to 1.
    #[must_use]
    pub const fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: if page == 0 { 1 } else { page },
            page_size: if page_size == 0 { 1 } else { page_size },
        }
    }

    /// Index of the first row on this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.page_size as u64
    }

    /// Inclusive row window `[offset, offset + page_size - 1]`.
    #[must_use]
    pub const fn window(&self) -> (u64, u64) {
        let first = self.offset();
        (first, first + self.page_size as u64 - 1)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, crate::config::DEFAULT_PAGE_SIZE)
    }
}

/// An entry of a pager control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// Most numbered pages shown before the pager collapses into ellipses.
const MAX_VISIBLE: u32 = 5;

/// Current page of a list with a known total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    total_items: u64,
    page_size: u32,
    current: u32,
}

impl Pagination {
    /// Start on page 1.
    #[must_use]
    pub const fn new(total_items: u64, page_size: u32) -> Self {
        Self {
            total_items,
            page_size: if page_size == 0 { 1 } else { page_size },
            current: 1,
        }
    }

    /// `ceil(total / page_size)`; 0 for an empty list.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        u32::try_from(self.total_items.div_ceil(u64::from(self.page_size))).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn current_page(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub const fn total_items(&self) -> u64 {
        self.total_items
    }

    /// Move to `page`, clamped into `[1, max(1, total_pages)]`.
    pub fn go_to_page(&mut self, page: u32) {
        self.current = page.clamp(1, self.total_pages().max(1));
    }

    /// Record a new total. A changed total sends the view back to page 1.
    pub fn set_total(&mut self, total_items: u64) {
        if total_items != self.total_items {
            self.total_items = total_items;
            self.current = 1;
        }
    }

    /// The request for the current page.
    #[must_use]
    pub const fn request(&self) -> PageRequest {
        PageRequest::new(self.current, self.page_size)
    }

    /// Index of the first row on the current page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.request().offset()
    }

    /// Rows the current page actually holds, as an inclusive window.
    ///
    /// Unlike [`PageRequest::window`], the end is clamped to the last row.
    /// Returns `None` when the page is past the end of the list.
    #[must_use]
    pub fn window(&self) -> Option<(u64, u64)> {
        let (first, last) = self.request().window();
        if first >= self.total_items {
            return None;
        }
        Some((first, last.min(self.total_items - 1)))
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.current > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current < self.total_pages()
    }

    /// Pager entries: every page when there are at most five, otherwise
    /// five numbers around the current page with ellipses.
    #[must_use]
    pub fn visible_pages(&self) -> Vec<PageItem> {
        let total = self.total_pages();
        let current = self.current;

        if total <= MAX_VISIBLE {
            return (1..=total).map(PageItem::Page).collect();
        }

        if current <= 3 {
            let mut items: Vec<PageItem> = (1..=MAX_VISIBLE).map(PageItem::Page).collect();
            items.extend([PageItem::Ellipsis, PageItem::Page(total)]);
            return items;
        }

        if current >= total - 2 {
            let mut items = vec![PageItem::Page(1), PageItem::Ellipsis];
            items.extend((total - MAX_VISIBLE + 1..=total).map(PageItem::Page));
            return items;
        }

        vec![
            PageItem::Page(1),
            PageItem::Ellipsis,
            PageItem::Page(current - 1),
            PageItem::Page(current),
            PageItem::Page(current + 1),
            PageItem::Ellipsis,
            PageItem::Page(total),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageItem::{Ellipsis, Page};

    #[test]
    fn test_page_request_window() {
        assert_eq!(PageRequest::new(1, 12).window(), (0, 11));
        assert_eq!(PageRequest::new(3, 12).offset(), 24);
        assert_eq!(PageRequest::new(3, 12).window(), (24, 35));
        assert_eq!(PageRequest::new(0, 10).window(), (0, 9));
    }

    #[test]
    fn test_last_page_window_is_clamped() {
        let mut pager = Pagination::new(25, 12);
        assert_eq!(pager.total_pages(), 3);
        assert_eq!(pager.window(), Some((0, 11)));

        pager.go_to_page(3);
        assert_eq!(pager.offset(), 24);
        assert_eq!(pager.window(), Some((24, 24)));
    }

    #[test]
    fn test_go_to_page_clamps() {
        let mut pager = Pagination::new(25, 10);
        pager.go_to_page(99);
        assert_eq!(pager.current_page(), 3);
        pager.go_to_page(0);
        assert_eq!(pager.current_page(), 1);

        let mut empty = Pagination::new(0, 10);
        empty.go_to_page(4);
        assert_eq!(empty.current_page(), 1);
        assert_eq!(empty.window(), None);
    }

    #[test]
    fn test_total_change_resets_page() {
        let mut pager = Pagination::new(100, 10);
        pager.go_to_page(4);
        pager.set_total(100);
        assert_eq!(pager.current_page(), 4);
        pager.set_total(99);
        assert_eq!(pager.current_page(), 1);
    }

    #[test]
    fn test_visible_pages() {
        let mut pager = Pagination::new(40, 10);
        assert_eq!(pager.visible_pages(), vec![Page(1), Page(2), Page(3), Page(4)]);

        pager = Pagination::new(100, 10);
        assert_eq!(
            pager.visible_pages(),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(10)]
        );

        pager.go_to_page(6);
        assert_eq!(
            pager.visible_pages(),
            vec![Page(1), Ellipsis, Page(5), Page(6), Page(7), Ellipsis, Page(10)]
        );

        pager.go_to_page(9);
        assert_eq!(
            pager.visible_pages(),
            vec![Page(1), Ellipsis, Page(6), Page(7), Page(8), Page(9), Page(10)]
        );
    }
}
