//! `PgOrderStore` against a real database.
//!
//! These tests require a migrated `PostgreSQL` database:
//!
//! ```bash
//! export ADMIN_DATABASE_URL=postgres://localhost/dewdrop_admin_test
//! cargo test -p dewdrop-integration-tests --test admin_orders_postgres -- --ignored
//! ```
//!
//! Each test tags its rows with a fresh marker so runs do not see each
//! other's orders.

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use dewdrop_admin::db::{OrderStore, PgOrderStore, RepositoryError};
use dewdrop_admin::models::{
    CurrencyRevenue, NewRefund, OrderFilter, OrderUpdate, PageRequest, StatisticsRange,
};
use dewdrop_core::{CurrencyCode, FulfillmentStatus, OrderId, OrderStatus, PaymentStatus};

async fn pool() -> PgPool {
    let url = std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("ADMIN_DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../admin/migrations").run(&pool).await.unwrap();
    pool
}

fn marker() -> String {
    Uuid::new_v4().simple().to_string()
}

struct Fixture<'a> {
    number: String,
    customer_name: &'a str,
    status: OrderStatus,
    payment_status: PaymentStatus,
    currency: CurrencyCode,
    refunded: Decimal,
    created_at: DateTime<Utc>,
}

impl Fixture<'_> {
    fn new(number: String, status: OrderStatus, payment_status: PaymentStatus) -> Self {
        Self {
            number,
            customer_name: "Mina Park",
            status,
            payment_status,
            currency: CurrencyCode::USD,
            refunded: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    /// Insert a 500.00 order with one line item.
    async fn insert(&self, pool: &PgPool) -> OrderId {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO orders
                (order_number, status, payment_status, subtotal, shipping_amount,
                 total_amount, refunded_amount, currency, payment_reference,
                 customer_name, customer_email, created_at, updated_at)
            VALUES ($1, $2, $3, 480, 20, 500, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id
            ",
        )
        .bind(&self.number)
        .bind(self.status)
        .bind(self.payment_status)
        .bind(self.refunded)
        .bind(self.currency.code())
        .bind(format!("pi_{}", self.number))
        .bind(self.customer_name)
        .bind(format!("buyer-{}@example.com", self.number))
        .bind(self.created_at)
        .fetch_one(pool)
        .await
        .unwrap();

        sqlx::query(
            r"
            INSERT INTO order_line_items (order_id, title, quantity, unit_price, subtotal)
            VALUES ($1, 'Radiance Ritual Set', 4, 120, 480)
            ",
        )
        .bind(id)
        .execute(pool)
        .await
        .unwrap();

        OrderId::new(id)
    }
}

fn refund(amount: i64, provider_refund_id: &str, full: bool) -> NewRefund {
    NewRefund {
        amount: Decimal::new(amount, 0),
        reason: Some("Damaged in transit".to_string()),
        refund_shipping: true,
        provider_refund_id: provider_refund_id.to_string(),
        created_by: "ops@dewdrop.test".to_string(),
        status: if full {
            OrderStatus::Refunded
        } else {
            OrderStatus::Confirmed
        },
        payment_status: if full {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        },
    }
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (ADMIN_DATABASE_URL)"]
async fn test_pg_list_filters_and_pages() {
    let pool = pool().await;
    let store = PgOrderStore::new(pool.clone());
    let tag = marker();
    let start = Utc::now() - Duration::days(1);

    let statuses = [
        (OrderStatus::Pending, PaymentStatus::Pending),
        (OrderStatus::Confirmed, PaymentStatus::Paid),
        (OrderStatus::Processing, PaymentStatus::Paid),
        (OrderStatus::Shipped, PaymentStatus::Paid),
        (OrderStatus::Cancelled, PaymentStatus::Failed),
    ];
    let mut ids = Vec::new();
    for (i, (status, payment)) in statuses.into_iter().enumerate() {
        let mut fixture = Fixture::new(format!("{tag}-{i}"), status, payment);
        fixture.created_at = start + Duration::minutes(i64::try_from(i).unwrap());
        ids.push(fixture.insert(&pool).await);
    }

    // Search alone matches all five, newest first.
    let everything = OrderFilter::new(None, None, Some(&tag));
    let mut seen = Vec::new();
    for page in 1..=3 {
        let (orders, total) = store
            .list(&everything, PageRequest::new(Some(page), Some(2)))
            .await
            .unwrap();
        assert_eq!(total, 5);
        seen.extend(orders.iter().map(|o| o.id));
        assert!(orders.iter().all(|o| o.items.len() == 1));
    }
    ids.reverse();
    assert_eq!(seen, ids);

    let paid = OrderFilter::new(None, Some(PaymentStatus::Paid), Some(&tag));
    let (orders, total) = store.list(&paid, PageRequest::default()).await.unwrap();
    assert_eq!(total, 3);
    assert!(orders.iter().all(|o| o.payment_status == PaymentStatus::Paid));

    let shipped = OrderFilter::new(Some(OrderStatus::Shipped), Some(PaymentStatus::Paid), Some(&tag));
    let (orders, total) = store.list(&shipped, PageRequest::default()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(orders[0].status, OrderStatus::Shipped);
    assert_eq!(orders[0].fulfillment_status, FulfillmentStatus::Unfulfilled);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ADMIN_DATABASE_URL)"]
async fn test_pg_search_escapes_like_metacharacters() {
    let pool = pool().await;
    let store = PgOrderStore::new(pool.clone());
    let tag = marker();

    let percent_name = format!("{tag} 50% club");
    let mut percent = Fixture::new(format!("{tag}-a"), OrderStatus::Pending, PaymentStatus::Pending);
    percent.customer_name = &percent_name;
    percent.insert(&pool).await;

    let digits_name = format!("{tag} 500 club");
    let mut digits = Fixture::new(format!("{tag}-b"), OrderStatus::Pending, PaymentStatus::Pending);
    digits.customer_name = &digits_name;
    digits.insert(&pool).await;

    let search = format!("{tag} 50%");
    let filter = OrderFilter::new(None, None, Some(&search));
    let (orders, total) = store.list(&filter, PageRequest::default()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(orders[0].customer.name, percent_name);

    // Case-insensitive on the customer name.
    let upper = tag.to_uppercase();
    let filter = OrderFilter::new(None, None, Some(&upper));
    let (_, total) = store.list(&filter, PageRequest::default()).await.unwrap();
    assert_eq!(total, 2);
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (ADMIN_DATABASE_URL)"]
async fn test_pg_update_writes_statuses_and_bumps_version() {
    let pool = pool().await;
    let store = PgOrderStore::new(pool.clone());
    let id = Fixture::new(marker(), OrderStatus::Confirmed, PaymentStatus::Paid)
        .insert(&pool)
        .await;

    let order = store.get(id).await.unwrap().unwrap();
    let changes = OrderUpdate {
        status: Some(OrderStatus::Shipped),
        fulfillment_status: Some(FulfillmentStatus::Fulfilled),
        tracking_number: Some("1Z999".to_string()),
        ..OrderUpdate::default()
    }
    .apply_to(&order);

    let updated = store.update(id, order.version, &changes).await.unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert_eq!(updated.payment_status, PaymentStatus::Paid);
    assert_eq!(updated.fulfillment_status, FulfillmentStatus::Fulfilled);
    assert_eq!(updated.tracking_number.as_deref(), Some("1Z999"));
    assert_eq!(updated.version, order.version + 1);

    // The version read above is now stale.
    let stale = store.update(id, order.version, &changes).await;
    assert!(matches!(stale, Err(RepositoryError::Conflict(_))));

    let missing = store.update(OrderId::new(i64::MAX), 1, &changes).await;
    assert!(matches!(missing, Err(RepositoryError::NotFound)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (ADMIN_DATABASE_URL)"]
async fn test_pg_record_refund_is_atomic() {
    let pool = pool().await;
    let store = PgOrderStore::new(pool.clone());
    let tag = marker();
    let id = Fixture::new(tag.clone(), OrderStatus::Confirmed, PaymentStatus::Paid)
        .insert(&pool)
        .await;

    let first = format!("re_{tag}_1");
    let order = store
        .record_refund(id, 1, &refund(200, &first, false))
        .await
        .unwrap();
    assert_eq!(order.version, 2);
    assert_eq!(order.payment_status, PaymentStatus::PartiallyRefunded);
    assert_eq!(order.refunded_amount, Decimal::new(200, 0));
    assert_eq!(order.refunds.len(), 1);
    assert_eq!(order.refunds[0].provider_refund_id, first);

    // Stale version: nothing is written.
    let stale = store
        .record_refund(id, 1, &refund(300, &format!("re_{tag}_2"), true))
        .await;
    assert!(matches!(stale, Err(RepositoryError::Conflict(_))));

    // Same provider refund twice: the order update is rolled back too.
    let duplicate = store.record_refund(id, 2, &refund(300, &first, true)).await;
    assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));

    let after = store.get(id).await.unwrap().unwrap();
    assert_eq!(after.version, 2);
    assert_eq!(after.status, OrderStatus::Confirmed);
    assert_eq!(after.payment_status, PaymentStatus::PartiallyRefunded);
    assert_eq!(after.refunded_amount, Decimal::new(200, 0));
    assert_eq!(after.refunds.len(), 1);
}

// ============================================================================
// Statistics
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (ADMIN_DATABASE_URL)"]
async fn test_pg_statistics_group_revenue_by_currency() {
    let pool = pool().await;
    let store = PgOrderStore::new(pool.clone());
    let tag = marker();

    // A fixed day far in the past keeps other tests' orders out of range.
    let day = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
    let at = day.and_hms_opt(12, 0, 0).unwrap().and_utc();
    sqlx::query(
        "DELETE FROM order_refunds WHERE order_id IN \
         (SELECT id FROM orders WHERE created_at >= $1 AND created_at < $2)",
    )
    .bind(at - Duration::hours(12))
    .bind(at + Duration::hours(12))
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("DELETE FROM orders WHERE created_at >= $1 AND created_at < $2")
        .bind(at - Duration::hours(12))
        .bind(at + Duration::hours(12))
        .execute(&pool)
        .await
        .unwrap();

    let fixtures = [
        (OrderStatus::Confirmed, PaymentStatus::Paid, CurrencyCode::USD, 0),
        (OrderStatus::Confirmed, PaymentStatus::Paid, CurrencyCode::EUR, 0),
        (OrderStatus::Shipped, PaymentStatus::PartiallyRefunded, CurrencyCode::GBP, 100),
        (OrderStatus::Cancelled, PaymentStatus::Paid, CurrencyCode::USD, 0),
        (OrderStatus::Pending, PaymentStatus::Pending, CurrencyCode::USD, 0),
        (OrderStatus::Refunded, PaymentStatus::Refunded, CurrencyCode::USD, 500),
    ];
    for (i, (status, payment, currency, refunded)) in fixtures.into_iter().enumerate() {
        let mut fixture = Fixture::new(format!("{tag}-{i}"), status, payment);
        fixture.currency = currency;
        fixture.refunded = Decimal::new(refunded, 0);
        fixture.created_at = at;
        fixture.insert(&pool).await;
    }

    let range = StatisticsRange {
        from: Some(day),
        to: Some(day),
    };
    let stats = store.statistics(&range).await.unwrap();

    assert_eq!(stats.total_orders, 6);
    assert_eq!(stats.pending_orders, 1);
    assert_eq!(stats.shipped_orders, 1);
    assert_eq!(stats.refunded_orders, 2);
    assert_eq!(stats.total_revenue, Decimal::new(500, 0));
    assert_eq!(
        stats.revenue_by_currency,
        vec![
            CurrencyRevenue {
                currency: CurrencyCode::EUR,
                amount: Decimal::new(500, 0),
            },
            CurrencyRevenue {
                currency: CurrencyCode::GBP,
                amount: Decimal::new(400, 0),
            },
            CurrencyRevenue {
                currency: CurrencyCode::USD,
                amount: Decimal::new(500, 0),
            },
        ]
    );

    let next_day = StatisticsRange {
        from: day.succ_opt(),
        to: day.succ_opt(),
    };
    let empty = store.statistics(&next_day).await.unwrap();
    assert_eq!(empty.total_orders, 0);
    assert_eq!(empty.total_revenue, Decimal::ZERO);
    assert!(empty.revenue_by_currency.is_empty());
}
