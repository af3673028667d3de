//! Product reviews API.
//!
//! ```text
//! GET /api/products/{slug}/reviews?rating=&verified=&skinType=&sort=&page=&limit=
//! ```

use axum::extract::{Path, Query, State, rejection::QueryRejection};
use serde::Deserialize;
use tracing::instrument;

use super::products::parse_bool;
use super::{ApiResponse, query_error};
use crate::error::AppError;
use crate::services::reviews::review_page;
use crate::services::{ReviewPage, ReviewQuery, ReviewSort};
use crate::state::AppState;

/// Raw review listing query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsQuery {
    pub rating: Option<String>,
    pub verified: Option<String>,
    pub skin_type: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ReviewsQuery {
    /// Validate into a review query.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a rating outside 1-5 or unknown
    /// values.
    pub fn into_query(self) -> Result<ReviewQuery, AppError> {
        let rating = self
            .rating
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|raw| {
                raw.parse::<u8>()
                    .ok()
                    .filter(|r| (1..=5).contains(r))
                    .ok_or_else(|| {
                        AppError::BadRequest(format!("rating must be 1 to 5, got {raw}"))
                    })
            })
            .transpose()?;
        let skin_type = self
            .skin_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .transpose()
            .map_err(|e: crate::models::UnknownTag| AppError::BadRequest(e.to_string()))?;
        let sort = self
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<ReviewSort>)
            .transpose()
            .map_err(AppError::BadRequest)?
            .unwrap_or_default();

        Ok(ReviewQuery {
            rating,
            verified_only: parse_bool("verified", self.verified.as_ref())?.unwrap_or(false),
            skin_type,
            sort,
            ..ReviewQuery::default()
        }
        .with_page(self.page, self.limit))
    }
}

/// `GET /api/products/{slug}/reviews`
#[instrument(skip(state, query))]
pub async fn index(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    query: Result<Query<ReviewsQuery>, QueryRejection>,
) -> Result<ApiResponse<ReviewPage>, AppError> {
    let Query(query) = query.map_err(|e| query_error(&e))?;
    let query = query.into_query()?;

    let product = state
        .catalog()
        .product(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let reviews = state.catalog().reviews(product.id).await?;
    Ok(ApiResponse::ok(review_page(reviews, &query)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::SkinType;

    #[test]
    fn test_into_query() {
        let query = ReviewsQuery {
            rating: Some("4".to_string()),
            verified: Some("true".to_string()),
            skin_type: Some("dry".to_string()),
            sort: Some("helpful".to_string()),
            page: Some(2),
            limit: Some(5),
        }
        .into_query()
        .unwrap();

        assert_eq!(query.rating, Some(4));
        assert!(query.verified_only);
        assert_eq!(query.skin_type, Some(SkinType::Dry));
        assert_eq!(query.sort, ReviewSort::Helpful);
        assert_eq!((query.page, query.limit), (2, 5));
    }

    #[test]
    fn test_defaults() {
        let query = ReviewsQuery::default().into_query().unwrap();
        assert_eq!(query, ReviewQuery::default());
    }

    #[test]
    fn test_rejects_out_of_range_rating() {
        for raw in ["0", "6", "five"] {
            let query = ReviewsQuery {
                rating: Some(raw.to_string()),
                ..ReviewsQuery::default()
            };
            assert!(query.into_query().is_err(), "{raw} should be rejected");
        }
    }
}
