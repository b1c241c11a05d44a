//! Virtual Craft Core - Shared types library.
//!
//! This crate provides common types used across all Virtual Craft components:
//! - `storefront` - JSON API server for the catalog and user records
//! - `client` - API client and session-scoped mirror stores
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows the server and
//! the client to share one wire format.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices, catalog and user models
//! - [`api`] - The `{success, data}` response envelope

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod types;

pub use api::ApiResponse;
pub use types::*;
