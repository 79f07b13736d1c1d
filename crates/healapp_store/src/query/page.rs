//! Sort keys, page requests and page results.

use super::filter::Field;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub direction: Direction,
}

impl<F: Field> Sort<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            field,
            direction: Direction::Desc,
        }
    }
}

/// Zero-based page index, page size and sort keys.
///
/// A size of 0 asks for the configured default size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<F> {
    pub page: u32,
    pub size: u32,
    pub sort: Vec<Sort<F>>,
}

impl<F: Field> PageRequest<F> {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            sort: Vec::new(),
        }
    }

    pub fn sorted_by(mut self, sort: Sort<F>) -> Self {
        self.sort.push(sort);
        self
    }

    /// Same page and size with `sort` replacing the caller's keys.
    pub(crate) fn with_sort(&self, sort: Vec<Sort<F>>) -> Self {
        Self {
            page: self.page,
            size: self.size,
            sort,
        }
    }
}

/// One slice of an ordered result plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    /// Effective size after default and clamp were applied.
    pub size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty(page: u32, size: u32, total: u64) -> Self {
        Self {
            items: Vec::new(),
            page,
            size,
            total,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<u8> = Page::empty(0, 10, 21);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
    }

    #[test]
    fn last_page_has_no_next() {
        let page: Page<u8> = Page::empty(2, 10, 21);
        assert!(!page.has_next());
        let beyond: Page<u8> = Page::empty(9, 10, 21);
        assert!(!beyond.has_next());
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page: Page<u8> = Page::empty(0, 20, 0);
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next());
    }
}
