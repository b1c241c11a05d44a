//! Core types for Virtual Craft.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod product;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use product::{
    Customization, CustomizationOption, CustomizationType, ImagePatch, NewProduct, Product,
    ProductDetails, ProductImage, ProductPatch, ProductWithImages, ReorderImages,
};
pub use user::{ExternalIdentity, User, UserPatch};
