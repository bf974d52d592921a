use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::document::Meta;
use crate::error::Fault;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_SIZE: u64 = 20;
pub const MAX_PAGE: u64 = 999_999;
pub const MAX_SIZE: u64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub size: Option<u64>,
}

/// Validated `page` / `size` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub size: u64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            size: DEFAULT_SIZE,
        }
    }
}

impl PageParams {
    pub fn from_query(query: PageQuery) -> Result<Self, String> {
        let page = query.page.unwrap_or(DEFAULT_PAGE);
        let size = query.size.unwrap_or(DEFAULT_SIZE);

        check_range("page", page, 1, MAX_PAGE)?;
        check_range("size", size, 1, MAX_SIZE)?;

        Ok(Self { page, size })
    }

    pub fn limit(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.size
    }

    pub fn context(&self, count: u64) -> PaginationContext {
        PaginationContext {
            count,
            limit: self.limit(),
            offset: self.offset(),
        }
    }
}

fn check_range(name: &str, value: u64, min: u64, max: u64) -> Result<(), String> {
    if value < min {
        return Err(format!("\"{}\" must be larger than or equal to {}", name, min));
    }
    if value > max {
        return Err(format!("\"{}\" must be less than or equal to {}", name, max));
    }
    Ok(())
}

#[async_trait]
impl<S> FromRequestParts<S> for PageParams
where
    S: Send + Sync,
{
    type Rejection = Fault;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PageQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| Fault::new(e.status(), e.body_text()))?;
        PageParams::from_query(query).map_err(Fault::bad_request)
    }
}

/// Totals for one page of a collection, lives for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationContext {
    pub count: u64,
    pub limit: u64,
    pub offset: u64,
}

impl PaginationContext {
    /// Offsets that are not a multiple of the limit round down to the page
    /// they start in. A zero limit has no pages.
    pub fn current_page(&self) -> u64 {
        self.offset.checked_div(self.limit).unwrap_or(0) + 1
    }

    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.count.div_ceil(self.limit)
    }

    pub fn meta(&self) -> Meta {
        let mut meta = Meta::new();
        meta.insert("total-count".to_string(), JsonValue::from(self.count));
        meta.insert("current-page".to_string(), JsonValue::from(self.current_page()));
        meta.insert("total-pages".to_string(), JsonValue::from(self.total_pages()));
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pagination_meta() {
        let ctx = PaginationContext {
            count: 95,
            limit: 20,
            offset: 40,
        };
        assert_eq!(
            JsonValue::Object(ctx.meta()),
            json!({ "total-count": 95, "current-page": 3, "total-pages": 5 })
        );
    }

    #[test]
    fn test_unaligned_offset_and_zero_limit() {
        let unaligned = PaginationContext {
            count: 50,
            limit: 20,
            offset: 30,
        };
        assert_eq!(unaligned.current_page(), 2);
        assert_eq!(unaligned.total_pages(), 3);

        let empty = PaginationContext {
            count: 10,
            limit: 0,
            offset: 0,
        };
        assert_eq!(empty.current_page(), 1);
        assert_eq!(empty.total_pages(), 0);
    }

    #[test]
    fn test_page_params_defaults_and_offset() {
        let params = PageParams::from_query(PageQuery::default()).unwrap();
        assert_eq!(params, PageParams::default());
        assert_eq!(params.offset(), 0);

        let params = PageParams::from_query(PageQuery {
            page: Some(3),
            size: Some(20),
        })
        .unwrap();
        assert_eq!(params.offset(), 40);
        assert_eq!(params.context(95).current_page(), 3);
    }

    #[test]
    fn test_page_params_bounds() {
        let err = PageParams::from_query(PageQuery {
            page: Some(0),
            size: None,
        })
        .unwrap_err();
        assert_eq!(err, "\"page\" must be larger than or equal to 1");

        let err = PageParams::from_query(PageQuery {
            page: None,
            size: Some(101),
        })
        .unwrap_err();
        assert_eq!(err, "\"size\" must be less than or equal to 100");
    }
}
