//! Domain models for the storefront.

pub mod product;
pub mod review;

pub use product::{Concern, Product, SkinType, UnknownTag};
pub use review::{RatingSummary, Review};
