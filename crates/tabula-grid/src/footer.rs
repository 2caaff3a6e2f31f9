//! Pagination footer model.

use tabula_model::{Page, total_pages_for};
use tabula_query::QueryState;

/// Entry of the page-number strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page { number: usize, current: bool },
    /// Elided run of pages.
    Gap,
}

/// Everything the footer under the grid shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationFooter {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    /// 1-based number of the first row shown, 0 when empty.
    pub first_row: usize,
    pub last_row: usize,
    pub page_size_options: Vec<usize>,
    pub links: Vec<PageLink>,
}

/// Pages shown on each side of the current one.
const SIBLINGS: usize = 1;

impl PaginationFooter {
    /// Footer for `page`, or for `query` alone while nothing is loaded yet.
    pub fn build<R>(query: &QueryState, page: Option<&Page<R>>, page_size_options: &[usize]) -> Self {
        let (number, limit, total, first_row, last_row) = match page {
            Some(page) => (
                page.page,
                page.limit,
                page.total,
                page.first_row_number(),
                page.last_row_number(),
            ),
            None => (query.page, query.limit, 0, 0, 0),
        };
        let total_pages = total_pages_for(total, limit);

        let mut page_size_options = page_size_options.to_vec();
        if !page_size_options.contains(&limit) {
            page_size_options.push(limit);
            page_size_options.sort_unstable();
        }

        Self {
            page: number,
            limit,
            total,
            total_pages,
            first_row,
            last_row,
            page_size_options,
            links: page_window(number, total_pages),
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn previous_page(&self) -> Option<usize> {
        self.has_previous().then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<usize> {
        self.has_next().then(|| self.page + 1)
    }

    /// `"11-20 of 23"`, or `"No results"`.
    pub fn range_label(&self) -> String {
        if self.total == 0 || self.first_row == 0 {
            return "No results".to_string();
        }
        format!("{}-{} of {}", self.first_row, self.last_row, self.total)
    }

    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.page, self.total_pages.max(1))
    }
}

/// Page-number strip: first, last, and a fixed-width window around `current`,
/// with gaps where pages are elided.
pub fn page_window(current: usize, total_pages: usize) -> Vec<PageLink> {
    let link = |number: usize| PageLink::Page {
        number,
        current: number == current,
    };
    let width = 2 * SIBLINGS + 1;
    if total_pages <= width + 4 {
        return (1..=total_pages).map(link).collect();
    }

    let last = total_pages;
    let current = current.clamp(1, last);
    let mut end = (current.saturating_sub(SIBLINGS).max(2) + width - 1).min(last - 1);
    let mut start = end.saturating_sub(width - 1).max(2);
    // A gap hiding a single page is wider than the page itself.
    if start == 3 {
        start = 2;
    }
    if end == last - 2 {
        end = last - 1;
    }

    let mut links = vec![link(1)];
    if start > 2 {
        links.push(PageLink::Gap);
    }
    links.extend((start..=end).map(link));
    if end < last - 1 {
        links.push(PageLink::Gap);
    }
    links.push(link(last));
    links
}
