//! # Folio Shared Library
//!
//! Domain types, persistence and business logic for the Folio article
//! service. The HTTP server in `folio-api` is a thin layer over this crate.
//!
//! ## Module Organization
//!
//! - `models`: Database records and their SQL queries
//! - `db`: Connection pool, migrations and the `Store` interface
//! - `auth`: Session tokens, the identity provider and the identity resolver
//! - `services`: Article service, slug generator and tree builder

pub mod auth;
pub mod db;
pub mod models;
pub mod services;

/// Current version of the Folio shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
