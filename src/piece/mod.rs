//! Piece metadata layer
//!
//! This module resolves which piece records a caller can see, picks versions
//! under semver specifiers, and persists piece records.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Snapshot   │────▶│   Service   │◀────│ FilterHook  │
//! │  (sorted)   │     │  (resolve)  │     │  (search)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!        ┌───────────────────┼───────────────────┐
//!        ▼                   ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Visibility  │     │   Semver    │     │    Store    │
//! │ (scope/rel) │     │  (ranges)   │     │  (SQLite)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`service`]: Listing, lookup, versioning and mutation operations
//! - [`resolution`]: Pure passes over a sorted snapshot
//! - [`visibility`]: Tenant visibility and release compatibility predicates
//! - [`semver`]: Version specifier parsing and range arithmetic
//! - [`hooks`]: Pluggable filtering of listings
//! - [`store`]: Snapshot and store traits
//! - [`db`]: SQLite-backed store
//! - [`project`]: Project lookup trait
//! - [`error`]: Error types
//! - [`types`]: Records, summaries and operation parameters

pub mod db;
pub mod error;
pub mod hooks;
pub mod project;
pub mod resolution;
pub mod semver;
pub mod service;
pub mod store;
pub mod types;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testing;
