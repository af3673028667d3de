//! Demo data for local development.
//!
//! Safe to run repeatedly: products are keyed by slug, orders by order
//! number, and existing rows are left alone.
//!
//! # Usage
//!
//! ```bash
//! dewdrop-cli seed              # both databases
//! dewdrop-cli seed storefront   # catalog + reviews
//! dewdrop-cli seed admin        # orders #1001, #1002, #1003
//! ```

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use dewdrop_admin::models::Address;
use dewdrop_core::{OrderStatus, PaymentStatus};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("{0} is not set (and neither is DATABASE_URL)")]
    MissingEnvVar(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

struct DemoProduct {
    slug: &'static str,
    name: &'static str,
    tagline: &'static str,
    category: &'static str,
    price_cents: i64,
    skin_types: &'static [&'static str],
    concerns: &'static [&'static str],
    fragrance_free: bool,
}

const PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        slug: "clarifying-gel-cleanser",
        name: "Clarifying Gel Cleanser",
        tagline: "Salicylic acid cleanser for congested skin",
        category: "cleanser",
        price_cents: 2_400,
        skin_types: &["oily", "combination"],
        concerns: &["acne", "pores"],
        fragrance_free: true,
    },
    DemoProduct {
        slug: "barrier-cream",
        name: "Barrier Repair Cream",
        tagline: "Ceramide moisturizer for dry, tight skin",
        category: "moisturizer",
        price_cents: 3_800,
        skin_types: &["dry", "sensitive"],
        concerns: &["dryness", "redness"],
        fragrance_free: true,
    },
    DemoProduct {
        slug: "vitamin-c-serum",
        name: "Vitamin C Brightening Serum",
        tagline: "15% ascorbic acid for dull skin",
        category: "serum",
        price_cents: 5_200,
        skin_types: &["normal", "combination", "oily"],
        concerns: &["dullness", "hyperpigmentation"],
        fragrance_free: false,
    },
    DemoProduct {
        slug: "retinal-night-serum",
        name: "Retinal Night Serum",
        tagline: "Encapsulated retinal for fine lines",
        category: "serum",
        price_cents: 6_400,
        skin_types: &["normal", "dry", "combination"],
        concerns: &["aging"],
        fragrance_free: true,
    },
    DemoProduct {
        slug: "mineral-sunscreen",
        name: "Mineral Sunscreen SPF 40",
        tagline: "Zinc oxide, no white cast",
        category: "sunscreen",
        price_cents: 3_200,
        skin_types: &["dry", "oily", "combination", "normal", "sensitive"],
        concerns: &["aging", "redness"],
        fragrance_free: true,
    },
];

struct DemoReview {
    product: &'static str,
    author: &'static str,
    rating: i16,
    title: &'static str,
    body: &'static str,
    verified: bool,
    skin_type: &'static str,
}

const REVIEWS: &[DemoReview] = &[
    DemoReview {
        product: "clarifying-gel-cleanser",
        author: "Jordan K.",
        rating: 5,
        title: "Finally, clear skin",
        body: "Two weeks in and my breakouts have calmed down a lot.",
        verified: true,
        skin_type: "oily",
    },
    DemoReview {
        product: "clarifying-gel-cleanser",
        author: "Sam R.",
        rating: 3,
        title: "A bit drying",
        body: "Works, but I need a heavier moisturizer after.",
        verified: false,
        skin_type: "combination",
    },
    DemoReview {
        product: "barrier-cream",
        author: "Priya N.",
        rating: 5,
        title: "Saved my winter skin",
        body: "No more flaking around my nose.",
        verified: true,
        skin_type: "dry",
    },
    DemoReview {
        product: "vitamin-c-serum",
        author: "Alex T.",
        rating: 4,
        title: "Noticeable glow",
        body: "Slight tingle at first, gone after a few days.",
        verified: true,
        skin_type: "normal",
    },
];

struct DemoOrder {
    number: &'static str,
    status: OrderStatus,
    payment_status: PaymentStatus,
    customer_name: &'static str,
    customer_email: &'static str,
}

/// Each demo order is four units at 120.00 plus 20.00 shipping: 500.00.
const ORDERS: &[DemoOrder] = &[
    DemoOrder {
        number: "1001",
        status: OrderStatus::Confirmed,
        payment_status: PaymentStatus::Paid,
        customer_name: "Mina Park",
        customer_email: "mina@example.com",
    },
    DemoOrder {
        number: "1002",
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        customer_name: "Leo Alvarez",
        customer_email: "leo@example.com",
    },
    DemoOrder {
        number: "1003",
        status: OrderStatus::Processing,
        payment_status: PaymentStatus::Paid,
        customer_name: "Ada Okafor",
        customer_email: "ada@example.com",
    },
];

/// Insert demo products and approved reviews.
///
/// # Errors
///
/// Returns `SeedError` if the database is unreachable or an insert fails.
pub async fn storefront() -> Result<(), SeedError> {
    let pool = super::connect("STOREFRONT_DATABASE_URL")
        .await
        .ok_or(SeedError::MissingEnvVar("STOREFRONT_DATABASE_URL"))??;

    let mut inserted = 0_u64;
    for (position, product) in (0_i32..).zip(PRODUCTS) {
        inserted += insert_product(&pool, product, position).await?;
    }
    tracing::info!(inserted, total = PRODUCTS.len(), "Seeded products");

    let mut reviews = 0_u64;
    for review in REVIEWS {
        reviews += insert_review(&pool, review).await?;
    }
    tracing::info!(inserted = reviews, total = REVIEWS.len(), "Seeded reviews");

    Ok(())
}

async fn insert_product(
    pool: &PgPool,
    product: &DemoProduct,
    position: i32,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r"
        INSERT INTO products
            (slug, name, tagline, category, price, skin_types, concerns,
             fragrance_free, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (slug) DO NOTHING
        ",
    )
    .bind(product.slug)
    .bind(product.name)
    .bind(product.tagline)
    .bind(product.category)
    .bind(Decimal::new(product.price_cents, 2))
    .bind(product.skin_types)
    .bind(product.concerns)
    .bind(product.fragrance_free)
    .bind(position)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

async fn insert_review(pool: &PgPool, review: &DemoReview) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r"
        INSERT INTO reviews
            (product_id, author_name, rating, title, body, verified_purchase,
             skin_type, approved)
        SELECT p.id, $2, $3, $4, $5, $6, $7, TRUE
        FROM products p
        WHERE p.slug = $1
          AND NOT EXISTS (
              SELECT 1 FROM reviews r
              WHERE r.product_id = p.id AND r.author_name = $2
          )
        ",
    )
    .bind(review.product)
    .bind(review.author)
    .bind(review.rating)
    .bind(review.title)
    .bind(review.body)
    .bind(review.verified)
    .bind(review.skin_type)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Insert the demo orders with their line items.
///
/// # Errors
///
/// Returns `SeedError` if the database is unreachable or an insert fails.
pub async fn admin() -> Result<(), SeedError> {
    let pool = super::connect("ADMIN_DATABASE_URL")
        .await
        .ok_or(SeedError::MissingEnvVar("ADMIN_DATABASE_URL"))??;

    for order in ORDERS {
        let mut tx = pool.begin().await?;
        if insert_order(&mut tx, order).await? {
            tracing::info!(order_number = order.number, "Seeded order");
        } else {
            tracing::info!(order_number = order.number, "Order exists, skipped");
        }
        tx.commit().await?;
    }

    Ok(())
}

/// Returns `false` when the order number is already taken.
async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    order: &DemoOrder,
) -> Result<bool, sqlx::Error> {
    let unit_price = Decimal::new(120, 0);
    let quantity = 4_i32;
    let subtotal = unit_price * Decimal::from(quantity);
    let shipping = Decimal::new(20, 0);

    let address = Address {
        name: order.customer_name.to_string(),
        line1: "12 Harbor Street".to_string(),
        line2: None,
        city: "Portland".to_string(),
        province: Some("OR".to_string()),
        postal_code: "97201".to_string(),
        country: "US".to_string(),
        phone: None,
    };

    let payment_reference = order
        .payment_status
        .is_captured()
        .then(|| format!("pi_demo_{}", order.number));

    let id: Option<(i64,)> = sqlx::query_as(
        r"
        INSERT INTO orders
            (order_number, status, payment_status, subtotal, shipping_amount,
             total_amount, payment_reference, customer_name, customer_email,
             shipping_address, billing_address)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        ON CONFLICT (order_number) DO NOTHING
        RETURNING id
        ",
    )
    .bind(order.number)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(subtotal)
    .bind(shipping)
    .bind(subtotal + shipping)
    .bind(payment_reference)
    .bind(order.customer_name)
    .bind(order.customer_email)
    .bind(Json(&address))
    .fetch_optional(&mut **tx)
    .await?;

    let Some((order_id,)) = id else {
        return Ok(false);
    };

    sqlx::query(
        r"
        INSERT INTO order_line_items
            (order_id, position, title, sku, quantity, unit_price, subtotal)
        VALUES ($1, 0, 'Radiance Ritual Set', 'SET-RADIANCE', $2, $3, $4)
        ",
    )
    .bind(order_id)
    .bind(quantity)
    .bind(unit_price)
    .bind(subtotal)
    .execute(&mut **tx)
    .await?;

    Ok(true)
}
