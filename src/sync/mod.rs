//! Official piece import from the remote catalog
//!
//! - [`catalog`]: Catalog trait and listing entries
//! - [`cloud`]: HTTP catalog client
//! - [`official`]: Staggered import of missing versions
//! - [`error`]: Catalog error type

pub mod catalog;
pub mod cloud;
pub mod error;
pub mod official;

pub use catalog::{CatalogEntry, PieceCatalog};
pub use cloud::CloudCatalog;
pub use error::CatalogError;
pub use official::{SyncReport, sync_official_pieces};
