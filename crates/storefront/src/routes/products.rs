//! Catalog API.
//!
//! ```text
//! GET /api/products?category=&concern=&skinType=&minPrice=&maxPrice=&inStock=&q=&sort=
//! GET /api/products/{slug}
//! ```

use axum::{
    extract::{Path, Query, State, rejection::QueryRejection},
    http::header::CACHE_CONTROL,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ApiResponse, CATALOG_CACHE_CONTROL, query_error};
use crate::error::AppError;
use crate::models::{Product, RatingSummary};
use crate::services::{ProductQuery, ProductSort};
use crate::state::AppState;

/// Raw listing query string. Empty values are treated as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsQuery {
    pub category: Option<String>,
    pub concern: Option<String>,
    pub skin_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn parse_price(name: &str, value: Option<&String>) -> Result<Option<Decimal>, AppError> {
    present(value)
        .map(|raw| {
            raw.parse::<Decimal>()
                .ok()
                .filter(|p| !p.is_sign_negative())
                .ok_or_else(|| AppError::BadRequest(format!("Invalid {name}: {raw}")))
        })
        .transpose()
}

pub(crate) fn parse_bool(name: &str, value: Option<&String>) -> Result<Option<bool>, AppError> {
    present(value)
        .map(|raw| match raw {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(AppError::BadRequest(format!("Invalid {name}: {raw}"))),
        })
        .transpose()
}

impl ProductsQuery {
    /// Validate into a catalog query.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for unknown tags, malformed numbers,
    /// or a minimum price above the maximum.
    pub fn into_query(self) -> Result<ProductQuery, AppError> {
        let bad = |e: crate::models::UnknownTag| AppError::BadRequest(e.to_string());

        let concern = present(self.concern.as_ref())
            .map(str::parse)
            .transpose()
            .map_err(bad)?;
        let skin_type = present(self.skin_type.as_ref())
            .map(str::parse)
            .transpose()
            .map_err(bad)?;
        let min_price = parse_price("minPrice", self.min_price.as_ref())?;
        let max_price = parse_price("maxPrice", self.max_price.as_ref())?;
        if let (Some(min), Some(max)) = (min_price, max_price)
            && min > max
        {
            return Err(AppError::BadRequest(
                "minPrice must not exceed maxPrice".to_string(),
            ));
        }
        let sort = present(self.sort.as_ref())
            .map(str::parse::<ProductSort>)
            .transpose()
            .map_err(AppError::BadRequest)?
            .unwrap_or_default();

        Ok(ProductQuery {
            category: present(self.category.as_ref()).map(String::from),
            concern,
            skin_type,
            min_price,
            max_price,
            in_stock: parse_bool("inStock", self.in_stock.as_ref())?,
            search: present(self.q.as_ref()).map(String::from),
            sort,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    /// Canonical storefront URL.
    pub url: String,
    pub rating_summary: RatingSummary,
}

/// `GET /api/products`
#[instrument(skip(state, query))]
pub async fn index(
    State(state): State<AppState>,
    query: Result<Query<ProductsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query.map_err(|e| query_error(&e))?;
    let query = query.into_query()?;

    let products = state.catalog().search(&query).await?;
    let total = products.len();

    Ok((
        [(CACHE_CONTROL, CATALOG_CACHE_CONTROL)],
        ApiResponse::ok(ProductList { products, total }),
    ))
}

/// `GET /api/products/{slug}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product = state
        .catalog()
        .product(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let reviews = state.catalog().reviews(product.id).await?;
    let detail = ProductDetail {
        url: format!("{}/products/{}", state.base_url(), product.slug),
        rating_summary: RatingSummary::from_reviews(&reviews),
        product,
    };

    Ok((
        [(CACHE_CONTROL, CATALOG_CACHE_CONTROL)],
        ApiResponse::ok(detail),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{Concern, SkinType};

    fn query(pairs: &[(&str, &str)]) -> ProductsQuery {
        let encoded = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        from_query_string(&encoded)
    }

    fn from_query_string(qs: &str) -> ProductsQuery {
        let uri: axum::http::Uri = format!("/api/products?{qs}").parse().unwrap();
        Query::<ProductsQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_empty_query_is_unfiltered() {
        let q = query(&[]).into_query().unwrap();
        assert!(q.category.is_none() && q.concern.is_none() && q.search.is_none());
        assert_eq!(q.sort, ProductSort::Featured);
    }

    #[test]
    fn test_parses_every_filter() {
        let q = query(&[
            ("category", "serum"),
            ("concern", "acne"),
            ("skinType", "oily"),
            ("minPrice", "10"),
            ("maxPrice", "50.5"),
            ("inStock", "true"),
            ("q", "niacinamide"),
            ("sort", "price_desc"),
        ])
        .into_query()
        .unwrap();

        assert_eq!(q.category.as_deref(), Some("serum"));
        assert_eq!(q.concern, Some(Concern::Acne));
        assert_eq!(q.skin_type, Some(SkinType::Oily));
        assert_eq!(q.min_price, Some(Decimal::from(10)));
        assert_eq!(q.max_price, Some("50.5".parse().unwrap()));
        assert_eq!(q.in_stock, Some(true));
        assert_eq!(q.search.as_deref(), Some("niacinamide"));
        assert_eq!(q.sort, ProductSort::PriceDesc);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let q = query(&[("concern", ""), ("minPrice", ""), ("sort", "")])
            .into_query()
            .unwrap();
        assert!(q.concern.is_none());
        assert!(q.min_price.is_none());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(query(&[("concern", "wrinkles")]).into_query().is_err());
        assert!(query(&[("minPrice", "cheap")]).into_query().is_err());
        assert!(query(&[("minPrice", "-1")]).into_query().is_err());
        assert!(query(&[("inStock", "maybe")]).into_query().is_err());
        assert!(query(&[("sort", "random")]).into_query().is_err());
        assert!(
            query(&[("minPrice", "40"), ("maxPrice", "20")])
                .into_query()
                .is_err()
        );
    }
}
