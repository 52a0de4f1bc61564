//! Shared utilities for integration tests

#![allow(dead_code)]

mod store;

pub use store::*;
