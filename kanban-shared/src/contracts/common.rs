/// Messages shared by several services

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct IdRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,
}

impl IdRequest {
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default = "default_page_number")]
    #[validate(range(min = 1, message = "pageNumber must be at least 1"))]
    pub page_number: i64,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, message = "pageSize must be at least 1"))]
    pub page_size: i64,
}

fn default_page_number() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: default_page_number(),
            page_size: default_page_size(),
        }
    }
}

impl PageRequest {
    /// Page size after capping
    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows to skip; saturates so far-out pages read as empty
    pub fn offset(&self) -> i64 {
        (self.page_number.max(1) - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub items_per_page: i64,
    pub total_items: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(page: &PageRequest, total_items: i64) -> Self {
        let per_page = page.limit();
        let total_pages = (total_items + per_page - 1) / per_page;
        Self {
            current_page: page.page_number,
            total_pages,
            items_per_page: per_page,
            total_items,
            has_more: page.page_number < total_pages,
        }
    }
}
