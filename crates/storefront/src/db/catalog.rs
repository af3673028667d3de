//! `PostgreSQL` catalog store.
//!
//! Tag columns are `text[]` and are parsed into [`SkinType`] and
//! [`Concern`] on the way out; an unknown tag is reported as corruption
//! rather than silently dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use dewdrop_core::{CurrencyCode, ProductId, ReviewId};

use super::{CatalogStore, RepositoryError};
use crate::models::{Concern, Product, Review, SkinType};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    slug: String,
    name: String,
    tagline: Option<String>,
    description: String,
    category: String,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    currency: String,
    image_url: Option<String>,
    skin_types: Vec<String>,
    concerns: Vec<String>,
    fragrance_free: bool,
    in_stock: bool,
    position: i32,
    rating: f64,
    review_count: i64,
    created_at: DateTime<Utc>,
}

fn parse_tags<T: std::str::FromStr>(
    product_id: i64,
    tags: Vec<String>,
) -> Result<Vec<T>, RepositoryError>
where
    T::Err: std::fmt::Display,
{
    tags.into_iter()
        .map(|tag| {
            tag.parse::<T>().map_err(|e| {
                RepositoryError::DataCorruption(format!("product {product_id}: {e}"))
            })
        })
        .collect()
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let currency = row.currency.parse::<CurrencyCode>().map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            skin_types: parse_tags::<SkinType>(row.id, row.skin_types)?,
            concerns: parse_tags::<Concern>(row.id, row.concerns)?,
            slug: row.slug,
            name: row.name,
            tagline: row.tagline,
            description: row.description,
            category: row.category,
            price: row.price,
            compare_at_price: row.compare_at_price,
            currency,
            image_url: row.image_url,
            fragrance_free: row.fragrance_free,
            in_stock: row.in_stock,
            position: row.position,
            rating: row.rating,
            review_count: row.review_count,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    product_id: i64,
    author_name: String,
    rating: i16,
    title: Option<String>,
    body: String,
    verified_purchase: bool,
    skin_type: Option<String>,
    helpful_count: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = u8::try_from(row.rating)
            .ok()
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "review {} has rating {}",
                    row.id, row.rating
                ))
            })?;
        let skin_type = row
            .skin_type
            .map(|s| s.parse::<SkinType>())
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("review {}: {e}", row.id)))?;

        Ok(Self {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            author_name: row.author_name,
            rating,
            title: row.title,
            body: row.body,
            verified_purchase: row.verified_purchase,
            skin_type,
            helpful_count: row.helpful_count,
            created_at: row.created_at,
        })
    }
}

/// Catalog store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT p.id, p.slug, p.name, p.tagline, p.description, p.category,
                   p.price, p.compare_at_price, p.currency, p.image_url,
                   p.skin_types, p.concerns, p.fragrance_free, p.in_stock,
                   p.position, p.created_at,
                   COALESCE(r.rating, 0)::float8 AS rating,
                   COALESCE(r.review_count, 0) AS review_count
            FROM products p
            LEFT JOIN (
                SELECT product_id, AVG(rating) AS rating, COUNT(*) AS review_count
                FROM reviews
                WHERE approved
                GROUP BY product_id
            ) r ON r.product_id = p.id
            WHERE p.published
            ORDER BY p.position, p.id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn approved_reviews(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, product_id, author_name, rating, title, body,
                   verified_purchase, skin_type, helpful_count, created_at
            FROM reviews
            WHERE product_id = $1 AND approved
            ",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn review_row(rating: i16, skin_type: Option<&str>) -> ReviewRow {
        ReviewRow {
            id: 7,
            product_id: 1,
            author_name: "Ana".to_string(),
            rating,
            title: None,
            body: "Nice".to_string(),
            verified_purchase: true,
            skin_type: skin_type.map(String::from),
            helpful_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_review_row_rejects_out_of_range_rating() {
        assert!(Review::try_from(review_row(0, None)).is_err());
        assert!(Review::try_from(review_row(6, None)).is_err());
        assert_eq!(Review::try_from(review_row(5, None)).unwrap().rating, 5);
    }

    #[test]
    fn test_review_row_parses_skin_type() {
        let review = Review::try_from(review_row(4, Some("oily"))).unwrap();
        assert_eq!(review.skin_type, Some(SkinType::Oily));
        assert!(matches!(
            Review::try_from(review_row(4, Some("scaly"))),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_parse_tags_reports_unknown_tag() {
        let ok = parse_tags::<Concern>(1, vec!["acne".into(), "pores".into()]).unwrap();
        assert_eq!(ok, vec![Concern::Acne, Concern::Pores]);
        assert!(parse_tags::<Concern>(1, vec!["wrinkles".into()]).is_err());
    }
}
