//! Store listing query types: filters, sort specification, and pagination.
//!
//! Validation happens here, at the boundary, so the query engine only ever
//! sees well-formed windows and whitelisted sort columns.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default page number.
pub const DEFAULT_PAGE: u32 = 1;
/// Default page size.
pub const DEFAULT_LIMIT: u32 = 10;
/// Maximum page size.
pub const MAX_LIMIT: u32 = 100;

/// Errors for malformed listing parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("page must be at least 1, got {0}")]
    InvalidPage(u32),
    #[error("limit must be between 1 and {MAX_LIMIT}, got {0}")]
    InvalidLimit(u32),
}

/// Whitelisted sort columns for store listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Name,
    Email,
    Address,
    CreatedAt,
}

impl SortBy {
    /// The SQL column this sorts on. Identifiers come from this whitelist,
    /// never from request input.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Address => "address",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// The SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A validated sort specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub by: SortBy,
    pub order: SortOrder,
}

/// A page window in row terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Rows to skip.
    pub offset: i64,
    /// Rows to return.
    pub limit: i64,
}

/// Raw store listing query, as deserialized from the request.
///
/// `search` and the discrete filters are mutually exclusive: when `search`
/// is present the discrete filters are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreQuery {
    /// Case-insensitive substring filter on store name.
    pub name: Option<String>,
    /// Case-insensitive substring filter on store email.
    pub email: Option<String>,
    /// Case-insensitive substring filter on store address.
    pub address: Option<String>,
    /// Free-text OR-match over name and address.
    pub search: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for StoreQuery {
    fn default() -> Self {
        Self {
            name: None,
            email: None,
            address: None,
            search: None,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl StoreQuery {
    /// Check pagination bounds.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when `page` is zero or `limit` is outside
    /// 1..=[`MAX_LIMIT`].
    pub const fn validate(&self) -> Result<(), QueryError> {
        if self.page < 1 {
            return Err(QueryError::InvalidPage(self.page));
        }
        if self.limit < 1 || self.limit > MAX_LIMIT {
            return Err(QueryError::InvalidLimit(self.limit));
        }
        Ok(())
    }

    /// The row window for this query. Call [`Self::validate`] first.
    #[must_use]
    pub const fn window(&self) -> PageWindow {
        PageWindow {
            offset: (self.page as i64 - 1) * self.limit as i64,
            limit: self.limit as i64,
        }
    }

    /// The sort specification for this query.
    #[must_use]
    pub const fn sort(&self) -> SortSpec {
        SortSpec {
            by: self.sort_by,
            order: self.sort_order,
        }
    }
}

/// Filter predicate for store listings, already shaped per result variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreFilter {
    /// OR-match over name and address. Wins over the discrete filters.
    pub search: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl StoreFilter {
    /// Filter for the admin listing: all discrete filters apply.
    #[must_use]
    pub fn admin(query: &StoreQuery) -> Self {
        if let Some(search) = &query.search {
            return Self {
                search: Some(search.clone()),
                ..Self::default()
            };
        }
        Self {
            search: None,
            name: query.name.clone(),
            email: query.email.clone(),
            address: query.address.clone(),
        }
    }

    /// Filter for the public listing: the email filter is not exposed.
    #[must_use]
    pub fn public(query: &StoreQuery) -> Self {
        let mut filter = Self::admin(query);
        filter.email = None;
        filter
    }
}

/// Pagination metadata returned alongside every listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    /// Build pagination metadata; `pages` is `ceil(total / limit)`.
    #[must_use]
    pub const fn new(page: u32, limit: u32, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit as u64),
        }
    }
}

/// A page of results with its pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let query: StoreQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);
        assert_eq!(query.sort_by, SortBy::Name);
        assert_eq!(query.sort_order, SortOrder::Asc);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_sort_by_wire_names() {
        let query: StoreQuery =
            serde_json::from_str(r#"{"sortBy":"createdAt","sortOrder":"desc"}"#).unwrap();
        assert_eq!(query.sort_by, SortBy::CreatedAt);
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert_eq!(query.sort().by.column(), "created_at");
        assert_eq!(query.sort().order.as_sql(), "DESC");
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let query = StoreQuery {
            page: 0,
            ..StoreQuery::default()
        };
        assert_eq!(query.validate(), Err(QueryError::InvalidPage(0)));

        let query = StoreQuery {
            limit: 0,
            ..StoreQuery::default()
        };
        assert_eq!(query.validate(), Err(QueryError::InvalidLimit(0)));

        let query = StoreQuery {
            limit: 101,
            ..StoreQuery::default()
        };
        assert_eq!(query.validate(), Err(QueryError::InvalidLimit(101)));
    }

    #[test]
    fn test_window_math() {
        let query = StoreQuery {
            page: 3,
            limit: 10,
            ..StoreQuery::default()
        };
        let window = query.window();
        assert_eq!(window.offset, 20);
        assert_eq!(window.limit, 10);
    }

    #[test]
    fn test_search_wins_over_discrete_filters() {
        let query = StoreQuery {
            search: Some("pizza".to_string()),
            name: Some("ignored".to_string()),
            email: Some("ignored".to_string()),
            ..StoreQuery::default()
        };
        let filter = StoreFilter::admin(&query);
        assert_eq!(filter.search.as_deref(), Some("pizza"));
        assert_eq!(filter.name, None);
        assert_eq!(filter.email, None);
        assert_eq!(filter.address, None);
    }

    #[test]
    fn test_public_filter_drops_email() {
        let query = StoreQuery {
            name: Some("pizza".to_string()),
            email: Some("pp@x.com".to_string()),
            ..StoreQuery::default()
        };
        let filter = StoreFilter::public(&query);
        assert_eq!(filter.name.as_deref(), Some("pizza"));
        assert_eq!(filter.email, None);
    }

    #[test]
    fn test_pagination_pages_is_ceiling() {
        assert_eq!(Pagination::new(1, 10, 25).pages, 3);
        assert_eq!(Pagination::new(1, 10, 30).pages, 3);
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 3, 7).pages, 3);
    }
}
