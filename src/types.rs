//! Core types shared across the catalog.

/// ProductId: store-assigned positive integer identifier
pub type ProductId = u64;

/// Default page number for listings
pub const DEFAULT_PAGE: usize = 1;

/// Default page size for listings
pub const DEFAULT_LIMIT: usize = 5;
