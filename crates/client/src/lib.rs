//! Virtual Craft client library.
//!
//! - [`api`] - `StorefrontApi` trait and the `reqwest`-backed [`ApiClient`]
//! - [`stores`] - Product, user, and cart mirrors
//! - [`session`] - Per-login bundle of stores with a `clear()` lifecycle
//! - [`preprocess`] - Downscale and recompress images before upload

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod preprocess;
pub mod session;
pub mod stores;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ClientError, ImageUpload, StorefrontApi};
pub use preprocess::{ImageLimits, PreprocessError, ProcessedImage, preprocess_image};
pub use session::ClientSession;
pub use stores::{CartItem, CartStore, ProductStore, UserStore};
