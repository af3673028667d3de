//! Review filtering, sorting, and pagination.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{RatingSummary, Review, SkinType};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

/// Review listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewSort {
    #[default]
    Newest,
    Oldest,
    Highest,
    Lowest,
    /// Most helpful votes first.
    Helpful,
}

impl ReviewSort {
    fn compare(self, a: &Review, b: &Review) -> Ordering {
        let newest = || b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id));
        match self {
            Self::Newest => newest(),
            Self::Oldest => a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)),
            Self::Highest => b.rating.cmp(&a.rating).then_with(newest),
            Self::Lowest => a.rating.cmp(&b.rating).then_with(newest),
            Self::Helpful => b.helpful_count.cmp(&a.helpful_count).then_with(newest),
        }
    }
}

impl FromStr for ReviewSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "highest" => Ok(Self::Highest),
            "lowest" => Ok(Self::Lowest),
            "helpful" => Ok(Self::Helpful),
            other => Err(format!("unknown sort: {other}")),
        }
    }
}

/// Review filters and paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuery {
    pub rating: Option<u8>,
    pub verified_only: bool,
    pub skin_type: Option<SkinType>,
    pub sort: ReviewSort,
    pub page: u32,
    pub limit: u32,
}

impl Default for ReviewQuery {
    fn default() -> Self {
        Self {
            rating: None,
            verified_only: false,
            skin_type: None,
            sort: ReviewSort::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ReviewQuery {
    /// Page is at least 1, limit is clamped to `1..=50`.
    #[must_use]
    pub fn with_page(mut self, page: Option<u32>, limit: Option<u32>) -> Self {
        self.page = page.unwrap_or(1).max(1);
        self.limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        self
    }

    #[must_use]
    pub fn matches(&self, review: &Review) -> bool {
        self.rating.is_none_or(|r| review.rating == r)
            && (!self.verified_only || review.verified_purchase)
            && self.skin_type.is_none_or(|t| review.skin_type == Some(t))
    }
}

/// Pagination metadata for a review listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
}

/// One page of reviews with the product's overall rating summary.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    /// Computed over all approved reviews, not just the filtered ones.
    pub summary: RatingSummary,
    pub pagination: ReviewPagination,
}

/// Apply `query` to a product's approved reviews.
#[must_use]
pub fn review_page(mut reviews: Vec<Review>, query: &ReviewQuery) -> ReviewPage {
    let summary = RatingSummary::from_reviews(&reviews);

    reviews.retain(|r| query.matches(r));
    reviews.sort_by(|a, b| query.sort.compare(a, b));

    let limit = query.limit.max(1) as usize;
    let total = reviews.len();
    let offset = (query.page.max(1) as usize - 1).saturating_mul(limit);
    let page: Vec<Review> = reviews.into_iter().skip(offset).take(limit).collect();

    ReviewPage {
        reviews: page,
        summary,
        pagination: ReviewPagination {
            page: query.page,
            limit: query.limit,
            total,
            total_pages: total.div_ceil(limit),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::review::tests::review;

    fn reviews() -> Vec<Review> {
        let mut a = review(1, 5);
        a.verified_purchase = true;
        a.skin_type = Some(SkinType::Dry);
        a.helpful_count = 2;

        let mut b = review(2, 3);
        b.skin_type = Some(SkinType::Oily);
        b.helpful_count = 9;

        let mut c = review(3, 4);
        c.verified_purchase = true;
        c.skin_type = Some(SkinType::Oily);

        let mut d = review(4, 5);
        d.helpful_count = 2;

        let e = review(5, 1);

        vec![a, b, c, d, e]
    }

    fn ids(page: &ReviewPage) -> Vec<i64> {
        page.reviews.iter().map(|r| r.id.as_i64()).collect()
    }

    #[test]
    fn test_default_is_newest_first() {
        let page = review_page(reviews(), &ReviewQuery::default());
        assert_eq!(ids(&page), [5, 4, 3, 2, 1]);
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.total_pages, 1);
    }

    #[test]
    fn test_filters_combine() {
        let query = ReviewQuery {
            verified_only: true,
            skin_type: Some(SkinType::Oily),
            ..ReviewQuery::default()
        };
        assert_eq!(ids(&review_page(reviews(), &query)), [3]);

        let query = ReviewQuery {
            rating: Some(5),
            ..ReviewQuery::default()
        };
        assert_eq!(ids(&review_page(reviews(), &query)), [4, 1]);
    }

    #[test]
    fn test_summary_ignores_filters() {
        let query = ReviewQuery {
            rating: Some(1),
            ..ReviewQuery::default()
        };
        let page = review_page(reviews(), &query);
        assert_eq!(page.reviews.len(), 1);
        assert_eq!(page.summary.count, 5);
        assert_eq!(page.summary.distribution, [2, 1, 1, 0, 1]);
    }

    #[test]
    fn test_sorts() {
        let sorted = |sort| {
            let query = ReviewQuery {
                sort,
                ..ReviewQuery::default()
            };
            ids(&review_page(reviews(), &query))
        };
        assert_eq!(sorted(ReviewSort::Oldest), [1, 2, 3, 4, 5]);
        assert_eq!(sorted(ReviewSort::Highest), [4, 1, 3, 2, 5]);
        assert_eq!(sorted(ReviewSort::Lowest), [5, 2, 3, 4, 1]);
        assert_eq!(sorted(ReviewSort::Helpful), [2, 4, 1, 5, 3]);
    }

    #[test]
    fn test_pages_cover_every_review_once() {
        let query = ReviewQuery::default().with_page(Some(1), Some(2));
        let mut seen = Vec::new();
        let first = review_page(reviews(), &query);
        assert_eq!(first.pagination.total_pages, 3);
        for page in 1..=first.pagination.total_pages {
            let query = ReviewQuery::default().with_page(Some(u32::try_from(page).unwrap()), Some(2));
            seen.extend(ids(&review_page(reviews(), &query)));
        }
        assert_eq!(seen, [5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let query = ReviewQuery::default().with_page(Some(9), Some(10));
        let page = review_page(reviews(), &query);
        assert!(page.reviews.is_empty());
        assert_eq!(page.pagination.total, 5);
    }

    #[test]
    fn test_with_page_clamps() {
        let query = ReviewQuery::default().with_page(Some(0), Some(500));
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_PAGE_SIZE);
    }
}
