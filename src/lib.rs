//! Catalog: Product Catalog Service
//!
//! Stores product records in a snapshot-persisted record store and manages
//! the lifecycle of their image assets: magic-byte validation on upload,
//! storage under generated names, and background deletion of images that an
//! update leaves unreferenced.

pub mod asset;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod store;
pub mod tooling;
pub mod types;

pub use catalog::{CatalogService, ProductFields};
pub use error::{ApiError, StorageError};
pub use store::{ListQuery, Product, ProductPage, ProductRecordStore};
