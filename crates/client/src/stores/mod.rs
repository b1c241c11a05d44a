//! Session-scoped mirror stores.
//!
//! Remote-backed stores keep a cache plus `loading`/`error` state. Each
//! mutation snapshots the cache, applies the pending change, then either
//! takes the server-confirmed result or restores the snapshot and records
//! the error. Nothing is retried. A store expects one operation at a time.

pub mod cart;
pub mod products;
pub mod users;

pub use cart::{CartItem, CartStore};
pub use products::ProductStore;
pub use users::UserStore;
