//! Skin quiz: questions and product recommendations.
//!
//! Scoring: a skin-type match is worth 3 points and each matching concern
//! 2 points. Sensitive skin restricts the pool to fragrance-free products.
//! Products scoring zero are never recommended.

use serde::{Deserialize, Serialize};

use crate::models::{Concern, Product, SkinType};

/// Maximum number of recommendations returned.
pub const MAX_RECOMMENDATIONS: usize = 3;

const SKIN_TYPE_POINTS: u32 = 3;
const CONCERN_POINTS: u32 = 2;

/// A selectable answer.
#[derive(Debug, Clone, Serialize)]
pub struct QuizOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// One quiz question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Field name the answer is submitted under.
    pub id: &'static str,
    pub prompt: &'static str,
    pub multiple: bool,
    pub options: Vec<QuizOption>,
}

/// The quiz, in display order.
#[must_use]
pub fn questions() -> Vec<QuizQuestion> {
    vec![
        QuizQuestion {
            id: "skinType",
            prompt: "How does your skin feel by midday?",
            multiple: false,
            options: SkinType::ALL
                .into_iter()
                .map(|t| QuizOption {
                    value: t.as_str(),
                    label: t.label(),
                })
                .collect(),
        },
        QuizQuestion {
            id: "concerns",
            prompt: "What would you like to work on?",
            multiple: true,
            options: Concern::ALL
                .into_iter()
                .map(|c| QuizOption {
                    value: c.as_str(),
                    label: c.label(),
                })
                .collect(),
        },
        QuizQuestion {
            id: "sensitive",
            prompt: "Does your skin react to fragrance or new products?",
            multiple: false,
            options: vec![
                QuizOption {
                    value: "true",
                    label: "Yes",
                },
                QuizOption {
                    value: "false",
                    label: "No",
                },
            ],
        },
    ]
}

/// Submitted quiz answers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswers {
    pub skin_type: Option<SkinType>,
    #[serde(default)]
    pub concerns: Vec<Concern>,
    #[serde(default)]
    pub sensitive: bool,
}

/// A recommended product with its score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub product: Product,
    pub score: u32,
    pub matched_concerns: Vec<Concern>,
}

/// Score a single product against the answers.
#[must_use]
pub fn score(product: &Product, answers: &QuizAnswers) -> u32 {
    let skin = answers
        .skin_type
        .filter(|t| product.suits_skin_type(*t))
        .map_or(0, |_| SKIN_TYPE_POINTS);

    let mut concerns = answers.concerns.clone();
    concerns.sort_by_key(|c| c.as_str());
    concerns.dedup();
    let concern_points: u32 = concerns
        .iter()
        .filter(|c| product.targets(**c))
        .map(|_| CONCERN_POINTS)
        .sum();

    skin + concern_points
}

/// Top recommendations for the answers, best first.
///
/// Ties go to the higher-rated product, then alphabetically by name.
#[must_use]
pub fn recommend(products: &[Product], answers: &QuizAnswers) -> Vec<Recommendation> {
    let mut scored: Vec<Recommendation> = products
        .iter()
        .filter(|p| !answers.sensitive || p.fragrance_free)
        .filter_map(|p| {
            let score = score(p, answers);
            (score > 0).then(|| Recommendation {
                matched_concerns: answers
                    .concerns
                    .iter()
                    .copied()
                    .filter(|c| p.targets(*c))
                    .collect(),
                product: p.clone(),
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.product.rating.total_cmp(&a.product.rating))
            .then_with(|| a.product.name.cmp(&b.product.name))
    });
    scored.truncate(MAX_RECOMMENDATIONS);
    scored
}
