use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PAGE_SIZE, RECIPE_COUNT_PER_PAGE};

/// Page/limit pair resolved from query parameters. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page_size = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(RECIPE_COUNT_PER_PAGE)
            .min(MAX_PAGE_SIZE);

        Self {
            page: page.filter(|page| *page > 0).unwrap_or(1),
            page_size,
        }
    }

    /// Saturates instead of overflowing on absurd page numbers, which then
    /// simply yield an empty page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        let next = if request.offset().saturating_add(request.page_size) < total_rows {
            Some(request.page + 1)
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(request.page - 1)
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }
}
