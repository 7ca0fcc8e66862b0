//! Uniform JSON envelope for successful responses.
//!
//! ```json
//! { "success": true, "data": ..., "message": "...", "count": 3,
//!   "total": 42, "page": 1, "pages": 5 }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Position of a page within a filtered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

/// Response wrapper for consistent API format.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(flatten)]
    page: Option<PageInfo>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            data: Some(data),
            message: None,
            count: None,
            page: None,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn page(mut self, page: PageInfo) -> Self {
        self.page = Some(page);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// One rejected item of a bulk request.
#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub index: usize,
    pub data: serde_json::Value,
    pub error: String,
}

/// Result of a bulk write: stored items plus the ones that were rejected.
#[derive(Debug, Serialize)]
pub struct BulkOutcome<T: Serialize> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BulkFailure>,
}

impl<T: Serialize> Default for BulkOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> BulkOutcome<T> {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn fail(&mut self, index: usize, data: serde_json::Value, error: impl ToString) {
        self.failed.push(BulkFailure {
            index,
            data,
            error: error.to_string(),
        });
    }

    pub fn summary(&self, noun: &str) -> String {
        format!(
            "Processed {} of {} {noun}",
            self.succeeded.len(),
            self.succeeded.len() + self.failed.len()
        )
    }
}

/// `page`/`limit` query handling. Defaults to page 1 of 10, at most 100 per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Pagination {
    pub const DEFAULT_LIMIT: usize = 10;
    pub const MAX_LIMIT: usize = 100;

    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<usize>().ok()).filter(|v| *v > 0);
        Self {
            page: parse(page).unwrap_or(1),
            limit: parse(limit)
                .unwrap_or(Self::DEFAULT_LIMIT)
                .min(Self::MAX_LIMIT),
        }
    }

    /// Cut one page out of an already filtered and sorted list.
    /// A zero page or limit is read as 1.
    pub fn slice<T>(&self, items: Vec<T>) -> (Vec<T>, PageInfo) {
        let page = self.page.max(1);
        let limit = self.limit.max(1);
        let total = items.len();
        let pages = total.div_ceil(limit);
        let start = page.saturating_sub(1).saturating_mul(limit);
        let page_items = items.into_iter().skip(start).take(limit).collect();
        (page_items, PageInfo { total, page, pages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_skips_empty_fields() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2]).count(2)).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": [1, 2], "count": 2}));
    }

    #[test]
    fn envelope_flattens_page_info() {
        let (items, page) = Pagination::from_query(Some("2"), Some("2")).slice(vec![1, 2, 3, 4, 5]);
        let body = serde_json::to_value(ApiResponse::ok(items).page(page)).unwrap();
        assert_eq!(body["data"], serde_json::json!([3, 4]));
        assert_eq!(body["total"], 5);
        assert_eq!(body["page"], 2);
        assert_eq!(body["pages"], 3);
    }

    #[test]
    fn pagination_defaults_and_caps() {
        assert_eq!(
            Pagination::from_query(None, None),
            Pagination { page: 1, limit: 10 }
        );
        assert_eq!(
            Pagination::from_query(Some("0"), Some("5000")),
            Pagination { page: 1, limit: 100 }
        );
        assert_eq!(
            Pagination::from_query(Some("abc"), Some("-1")),
            Pagination { page: 1, limit: 10 }
        );
    }

    #[test]
    fn zero_page_and_limit_are_clamped() {
        let (items, page) = Pagination { page: 0, limit: 0 }.slice(vec![1, 2, 3]);
        assert_eq!(items, vec![1]);
        assert_eq!(page, PageInfo { total: 3, page: 1, pages: 3 });
    }

    #[test]
    fn page_past_end_is_empty() {
        let (items, page) = Pagination { page: 9, limit: 10 }.slice(vec![1, 2, 3]);
        assert!(items.is_empty());
        assert_eq!(page.pages, 1);
    }

    #[test]
    fn created_sets_status() {
        let response = ApiResponse::created("x").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
