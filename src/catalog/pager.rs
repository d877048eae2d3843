//! Fixed-size pagination over the active view.

use crate::error::{CatalogError, Result};
use std::ops::Range;

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// One rendered page.
#[derive(Debug)]
pub struct Page<T> {
    /// 1-indexed page number.
    pub number: usize,
    pub total_pages: usize,
    /// Zero-based view position of the first item.
    pub offset: usize,
    pub items: Vec<T>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pager {
    page_size: usize,
    current: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            current: 1,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.page_size).max(1)
    }

    /// View positions covered by the current page.
    pub fn range(&self, len: usize) -> Range<usize> {
        let start = ((self.current - 1) * self.page_size).min(len);
        let end = (start + self.page_size).min(len);
        start..end
    }

    /// Advance one page; returns false (and stays put) on the last page.
    pub fn next(&mut self, len: usize) -> bool {
        if self.current < self.total_pages(len) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.current > 1 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to a page typed by the user. Leaves the current page alone on
    /// any validation failure.
    pub fn goto(&mut self, input: &str, len: usize) -> Result<usize> {
        let total = self.total_pages(len);
        let page: usize = input
            .trim()
            .parse()
            .map_err(|_| CatalogError::validation(format!("'{}' is not a valid page number", input.trim())))?;
        if page < 1 || page > total {
            return Err(CatalogError::validation(format!(
                "page must be between 1 and {total}, got {page}"
            )));
        }
        self.current = page;
        Ok(page)
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }

    /// Pull the current page back inside range after the view shrank.
    pub fn clamp(&mut self, len: usize) {
        self.current = self.current.clamp(1, self.total_pages(len));
    }
}
