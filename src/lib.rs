//! catalog-migrate - Catalog data migrations
//!
//! A bulk document transformer and a memoizing cross-reference resolver over
//! a pluggable document store, plus the catalog's upgrade steps built on them.

pub mod cli;
pub mod config;
pub mod error;
pub mod migrations;
pub mod models;
pub mod store;
pub mod transform;
