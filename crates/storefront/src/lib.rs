//! Virtual Craft storefront library.
//!
//! Catalog, image gallery, and user services behind a JSON HTTP API,
//! exposed as a library so the binary, CLI, and integration tests share it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
