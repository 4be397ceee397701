/// Pagination Engine.
///
/// Pure arithmetic over the length of the Filter Index, the page size and the
/// scroll position. Pages are numbered from 1.

use std::fmt;

/// Number of pages needed for `len` entries; 0 when there are none.
pub fn last_page(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Page holding the entry at `start`.
pub fn current_page(start: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    start / page_size + 1
}

/// Clamp a requested page into `[1, max(1, last_page)]`.
pub fn clamp_page(page: usize, last_page: usize) -> usize {
    page.clamp(1, last_page.max(1))
}

/// First page link of a window of `shown` links around `current`.
///
/// The comparisons are against half the window in real arithmetic; doubling
/// both sides keeps them in integers.
pub fn window_start(current: usize, last: usize, shown: usize) -> usize {
    if 2 * current < shown {
        1
    } else if 2 * current >= (2 * last).saturating_sub(shown) {
        (last + 1).saturating_sub(shown).max(1)
    } else {
        // floor(current - shown/2 + 1)
        (2 * current + 2 - shown) / 2
    }
}

/// Range of page links to display.
///
/// # Examples
///
/// ```
/// use datatable::paging::{last_page, current_page, PagingWindow};
///
/// assert_eq!(last_page(95, 20), 5);
/// assert_eq!(current_page(80, 20), 5);
///
/// let window = PagingWindow::new(10, 20, 9);
/// assert_eq!((window.start, window.end), (6, 14));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingWindow {
    pub start: usize,
    /// Inclusive; smaller than `start` when there are no pages.
    pub end: usize,
    pub current: usize,
    pub last: usize,
}

/// What a paging link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLinkKind {
    First,
    Prev,
    Page(usize),
    Next,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLink {
    pub kind: PageLinkKind,
    /// Page loaded when the link is followed.
    pub target: usize,
    /// Active links are highlighted and not followable.
    pub active: bool,
}

impl PagingWindow {
    pub fn new(current: usize, last: usize, shown: usize) -> Self {
        let start = window_start(current, last, shown);
        let end = last.min(start + shown.max(1) - 1);
        PagingWindow {
            start,
            end,
            current,
            last,
        }
    }

    pub fn pages(&self) -> impl Iterator<Item = usize> {
        self.start..=self.end
    }

    /// First/prev, the page links, then next/last.
    pub fn links(&self) -> Vec<PageLink> {
        let at_start = self.current == 1;
        let at_end = self.current == self.last || self.last == 0;

        let mut links = vec![
            PageLink {
                kind: PageLinkKind::First,
                target: 1,
                active: at_start,
            },
            PageLink {
                kind: PageLinkKind::Prev,
                target: self.current.saturating_sub(1).max(1),
                active: at_start,
            },
        ];
        links.extend(self.pages().map(|page| PageLink {
            kind: PageLinkKind::Page(page),
            target: page,
            active: page == self.current,
        }));
        links.push(PageLink {
            kind: PageLinkKind::Next,
            target: self.current + 1,
            active: at_end,
        });
        links.push(PageLink {
            kind: PageLinkKind::Last,
            target: self.last,
            active: at_end,
        });
        links
    }
}

/// Page and row figures shown next to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counter {
    /// 0 when nothing passes the filters.
    pub current_page: usize,
    pub last_page: usize,
    /// 1-based; 0 when nothing passes the filters.
    pub first_row: usize,
    pub last_row: usize,
    pub filtered: usize,
    pub total: usize,
}

impl Counter {
    pub fn compute(start: usize, page_size: usize, filtered: usize, total: usize) -> Self {
        let empty = filtered == 0;
        Counter {
            current_page: if empty { 0 } else { current_page(start, page_size) },
            last_page: last_page(filtered, page_size),
            first_row: if empty { 0 } else { start + 1 },
            last_row: (start + page_size).min(filtered),
            filtered,
            total,
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Page {} on {}. Showing {} to {} of {} entries",
            self.current_page, self.last_page, self.first_row, self.last_row, self.filtered
        )?;
        if self.filtered != self.total {
            write!(f, " (filtered from {} total entries)", self.total)?;
        }
        write!(f, ".")
    }
}
