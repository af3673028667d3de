//! Customer review types.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use dewdrop_core::{ProductId, ReviewId};

use super::product::SkinType;

/// An approved product review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub author_name: String,
    /// 1 to 5 stars.
    pub rating: u8,
    pub title: Option<String>,
    pub body: String,
    pub verified_purchase: bool,
    pub skin_type: Option<SkinType>,
    pub helpful_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Rating aggregate shown next to a product's reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal place; 0 with no reviews.
    pub average: Decimal,
    pub count: usize,
    /// Counts for 5, 4, 3, 2, and 1 stars, in that order.
    pub distribution: [usize; 5],
}

impl RatingSummary {
    /// Summarize a set of reviews.
    #[must_use]
    pub fn from_reviews(reviews: &[Review]) -> Self {
        let mut distribution = [0usize; 5];
        let mut total: u32 = 0;

        for review in reviews {
            let stars = review.rating.clamp(1, 5);
            // 5 stars lands in slot 0, 1 star in slot 4.
            if let Some(slot) = distribution.get_mut(usize::from(5 - stars)) {
                *slot += 1;
            }
            total += u32::from(stars);
        }

        let count = reviews.len();
        let mut average = if count == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(total) / Decimal::from(count))
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        };
        average.rescale(1);

        Self {
            average,
            count,
            distribution,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Review fixture.
    pub(crate) fn review(id: i64, rating: u8) -> Review {
        Review {
            id: ReviewId::new(id),
            product_id: ProductId::new(1),
            author_name: format!("Reviewer {id}"),
            rating,
            title: None,
            body: "Lovely texture.".to_string(),
            verified_purchase: false,
            skin_type: None,
            helpful_count: 0,
            created_at: DateTime::from_timestamp(1_700_000_000 + id * 60, 0).unwrap(),
        }
    }

    #[test]
    fn test_summary_empty() {
        let summary = RatingSummary::from_reviews(&[]);
        assert_eq!(summary.average, Decimal::ZERO);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.distribution, [0; 5]);
    }

    #[test]
    fn test_summary_distribution_runs_five_to_one() {
        let reviews = vec![review(1, 5), review(2, 5), review(3, 4), review(4, 1)];
        let summary = RatingSummary::from_reviews(&reviews);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.distribution, [2, 1, 0, 0, 1]);
        // 15 / 4 = 3.75
        assert_eq!(summary.average, "3.8".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_summary_average_rounds_to_one_decimal() {
        let reviews = vec![review(1, 5), review(2, 4), review(3, 4)];
        // 13 / 3 = 4.333...
        let summary = RatingSummary::from_reviews(&reviews);
        assert_eq!(summary.average, "4.3".parse::<Decimal>().unwrap());
    }
}
