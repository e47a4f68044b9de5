use serde::{Deserialize, Serialize};

use super::PageRequestError;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// A zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Creates a page request, validating that `1 <= size <= MAX_PAGE_SIZE`.
    pub fn new(page: u32, size: u32) -> Result<Self, PageRequestError> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(PageRequestError::InvalidSize(size));
        }
        Ok(Self { page, size })
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 20 }
    }
}

/// A bounded slice of a larger result plus its total-count metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    /// Total number of items across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            size: request.size,
            total,
        }
    }

    /// Number of pages needed to hold `total` items.
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.size))
    }

    /// Splits the page into its slice and its metadata.
    pub fn into_parts(self) -> (Vec<T>, PageMeta) {
        (
            self.items,
            PageMeta {
                page: self.page,
                size: self.size,
                total: self.total,
            },
        )
    }
}

/// Page coordinates and total count, detached from the slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

impl PageMeta {
    pub fn with_items<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            page: self.page,
            size: self.size,
            total: self.total,
        }
    }
}
