//! Catalog domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dewdrop_core::{CurrencyCode, ProductId};

/// Error returned when parsing an unknown tag value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}

/// Skin types used by product tags, review metadata, and the quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinType {
    Dry,
    Oily,
    Combination,
    Normal,
    Sensitive,
}

impl SkinType {
    pub const ALL: [Self; 5] = [
        Self::Dry,
        Self::Oily,
        Self::Combination,
        Self::Normal,
        Self::Sensitive,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dry => "dry",
            Self::Oily => "oily",
            Self::Combination => "combination",
            Self::Normal => "normal",
            Self::Sensitive => "sensitive",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dry => "Dry",
            Self::Oily => "Oily",
            Self::Combination => "Combination",
            Self::Normal => "Normal",
            Self::Sensitive => "Sensitive",
        }
    }
}

impl fmt::Display for SkinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkinType {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTag {
                kind: "skin type",
                value: s.to_string(),
            })
    }
}

/// Skin concerns a product targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Concern {
    Acne,
    Aging,
    Dryness,
    Dullness,
    Redness,
    Hyperpigmentation,
    Pores,
}

impl Concern {
    pub const ALL: [Self; 7] = [
        Self::Acne,
        Self::Aging,
        Self::Dryness,
        Self::Dullness,
        Self::Redness,
        Self::Hyperpigmentation,
        Self::Pores,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Acne => "acne",
            Self::Aging => "aging",
            Self::Dryness => "dryness",
            Self::Dullness => "dullness",
            Self::Redness => "redness",
            Self::Hyperpigmentation => "hyperpigmentation",
            Self::Pores => "pores",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Acne => "Breakouts & acne",
            Self::Aging => "Fine lines & firmness",
            Self::Dryness => "Dryness & flaking",
            Self::Dullness => "Dullness",
            Self::Redness => "Redness",
            Self::Hyperpigmentation => "Dark spots",
            Self::Pores => "Visible pores",
        }
    }
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Concern {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTag {
                kind: "concern",
                value: s.to_string(),
            })
    }
}

/// A catalog product with its review aggregate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub tagline: Option<String>,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub currency: CurrencyCode,
    pub image_url: Option<String>,
    pub skin_types: Vec<SkinType>,
    pub concerns: Vec<Concern>,
    pub fragrance_free: bool,
    pub in_stock: bool,
    /// Merchandising order for the `featured` sort (lower first).
    pub position: i32,
    /// Mean approved review rating, 0 when there are no reviews.
    pub rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product is marked down from its compare-at price.
    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|p| p > self.price)
    }

    #[must_use]
    pub fn suits_skin_type(&self, skin_type: SkinType) -> bool {
        self.skin_types.contains(&skin_type)
    }

    #[must_use]
    pub fn targets(&self, concern: Concern) -> bool {
        self.concerns.contains(&concern)
    }
}
