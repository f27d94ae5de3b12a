//! Core types and trait definitions for the warehouse catalog store.
//!
//! This crate has no database dependencies. Storage backends
//! implement [`store::CatalogStore`]; callers depend on that abstraction.

pub mod edge;
pub mod entry;
pub mod error;
pub mod property;
pub mod store;
pub mod tag;

pub use error::{Error, Result};
