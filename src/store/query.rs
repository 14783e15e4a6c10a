//! Listing: title filter and pagination over the record set.

use super::Product;
use crate::types::{DEFAULT_LIMIT, DEFAULT_PAGE};

/// Listing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Case-insensitive title substring; `None` or blank matches everything
    pub title: Option<String>,
    /// 1-based page number
    pub page: usize,
    pub limit: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            title: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListQuery {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            title: None,
            page: if page == 0 { DEFAULT_PAGE } else { page },
            limit: if limit == 0 { DEFAULT_LIMIT } else { limit },
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Build from raw query-string values. Missing, unparseable or
    /// non-positive numbers fall back to the defaults.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>, title: Option<&str>) -> Self {
        let parse = |raw: Option<&str>, default: usize| {
            raw.and_then(|s| s.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };
        Self {
            title: title.map(str::to_string),
            page: parse(page, DEFAULT_PAGE),
            limit: parse(limit, DEFAULT_LIMIT),
        }
    }

    fn title_needle(&self) -> Option<String> {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }
}

/// One page of a filtered listing
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub page: usize,
    pub limit: usize,
    /// Size of the filtered set
    pub total: usize,
    pub total_pages: usize,
    pub products: Vec<Product>,
}

impl ProductPage {
    /// Transform the products while keeping the paging metadata.
    pub fn map<T>(self, f: impl FnMut(Product) -> T) -> (PageInfo, Vec<T>) {
        let info = PageInfo {
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
        };
        (info, self.products.into_iter().map(f).collect())
    }
}

/// Paging metadata detached from the items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Filter `records` by title, then slice the requested page.
///
/// Pages past the end produce an empty list.
pub fn paginate(records: &[Product], query: &ListQuery) -> ProductPage {
    let page = query.page.max(1);
    let limit = query.limit.max(1);

    let filtered: Vec<&Product> = match query.title_needle() {
        Some(needle) => records
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .collect(),
        None => records.iter().collect(),
    };

    let total = filtered.len();
    let start = (page - 1).saturating_mul(limit).min(total);
    let end = start.saturating_add(limit).min(total);

    ProductPage {
        page,
        limit,
        total,
        total_pages: total.div_ceil(limit),
        products: filtered[start..end].iter().map(|p| (*p).clone()).collect(),
    }
}
