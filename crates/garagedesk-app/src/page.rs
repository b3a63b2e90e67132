// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// One page of a collection as returned by a fetch capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub pages: usize,
    pub total: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    /// Enforces `1 <= page <= pages`, `limit > 0` and `items.len() <= limit`.
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.max(1);
        self.pages = self.pages.max(1);
        self.page = self.page.clamp(1, self.pages);
        self.items.truncate(self.limit);
        self.total = self.total.max(self.items.len());
        self
    }

    /// Converts every row, keeping the paging fields. Stops at the first
    /// row that fails.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, E>>()?,
            page: self.page,
            pages: self.pages,
            total: self.total,
            limit: self.limit,
        })
    }
}

/// Page count for `total` records split into pages of `limit`; never below one.
pub fn page_count(total: usize, limit: usize) -> usize {
    let limit = limit.max(1);
    total.div_ceil(limit).max(1)
}

#[cfg(test)]
mod tests {
    use super::{Page, page_count};

    #[test]
    fn normalized_clamps_page_into_range() {
        let page = Page {
            items: vec![1, 2, 3],
            page: 9,
            pages: 3,
            total: 25,
            limit: 10,
        }
        .normalized();
        assert_eq!(page.page, 3);

        let zero = Page::<u8> {
            items: Vec::new(),
            page: 0,
            pages: 0,
            total: 0,
            limit: 0,
        }
        .normalized();
        assert_eq!((zero.page, zero.pages, zero.limit), (1, 1, 1));
    }

    #[test]
    fn normalized_truncates_oversized_pages() {
        let page = Page {
            items: (0..12).collect::<Vec<_>>(),
            page: 1,
            pages: 1,
            total: 12,
            limit: 10,
        }
        .normalized();
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total, 12);
    }

    #[test]
    fn try_map_keeps_paging_and_stops_at_first_failure() {
        let page = Page {
            items: vec!["1", "2"],
            page: 2,
            pages: 4,
            total: 32,
            limit: 10,
        };
        let parsed = page
            .clone()
            .try_map(str::parse::<u8>)
            .expect("both rows parse");
        assert_eq!(parsed.items, vec![1, 2]);
        assert_eq!((parsed.page, parsed.pages, parsed.total), (2, 4, 32));

        let broken = Page {
            items: vec!["1", "x"],
            ..page
        };
        assert!(broken.try_map(str::parse::<u8>).is_err());
    }

    #[test]
    fn page_count_rounds_up_and_never_hits_zero() {
        assert_eq!(page_count(25, 10), 3);
        assert_eq!(page_count(20, 10), 2);
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(5, 0), 5);
    }
}
