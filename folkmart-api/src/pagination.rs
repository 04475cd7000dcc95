//! Pagination utilities
//!
//! Lists take `page` (1-based) and `limit` query parameters and report
//! `{ page, limit, total, pages }` alongside the data.

use serde::{Deserialize, Serialize};

/// Page size when the client does not ask for one
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page a client may request
pub const MAX_LIMIT: i64 = 100;

/// Raw query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Requested limit clamped to [1, MAX_LIMIT]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Wire form of [`Pagination`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl From<Pagination> for PageInfo {
    fn from(p: Pagination) -> Self {
        Self {
            page: p.page,
            limit: p.limit,
            total: p.total,
            pages: p.total_pages,
        }
    }
}

/// One page of results
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

/// Calculate pagination metadata from total results and the request
///
/// Page is kept within [1, total_pages]; an out-of-range page returns the
/// last page rather than an empty one.
pub fn calculate_pagination(total_results: i64, request: PageRequest) -> Pagination {
    let limit = request.limit();
    let total_pages = (total_results + limit - 1) / limit;
    let page = request.page.unwrap_or(1).max(1).min(total_pages.max(1));
    let offset = (page - 1) * limit;

    Pagination {
        page,
        limit,
        total: total_results,
        total_pages,
        offset,
    }
}
