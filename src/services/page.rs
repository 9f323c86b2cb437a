//! Pagination shared by list endpoints.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Zero-based page request as sent in query strings (`?page=0&size=10`).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: DEFAULT_PAGE_SIZE }
    }
}

impl PageRequest {
    /// Clamp to a non-negative page and a size in `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self { page: self.page.max(0), size: self.size.clamp(1, MAX_PAGE_SIZE) }
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        let p = self.clamped();
        p.page.saturating_mul(p.size)
    }

    #[must_use]
    pub fn limit(self) -> i64 {
        self.clamped().size
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: i64) -> Self {
        let request = request.clamped();
        let total_pages = if total_elements <= 0 { 0 } else { (total_elements + request.size - 1) / request.size };
        Self { content, page: request.page, size: request.size, total_elements, total_pages }
    }
}
