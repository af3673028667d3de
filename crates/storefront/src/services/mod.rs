//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Cached product snapshot, filtering and sorting
//! - `reviews` - Review filtering, sorting, pagination, rating summary
//! - `quiz` - Skin quiz questions and recommendations

pub mod catalog;
pub mod quiz;
pub mod reviews;

pub use catalog::{Catalog, ProductQuery, ProductSort};
pub use quiz::{QuizAnswers, Recommendation};
pub use reviews::{ReviewPage, ReviewQuery, ReviewSort};
