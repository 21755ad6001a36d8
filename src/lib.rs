//! parkpass library
//!
//! Resolves parkrun athlete IDs to display names for wallet passes, caching
//! the results. Exposed as a library for the binary and integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod data;
pub mod logging;
pub mod resolver;
pub mod server;
