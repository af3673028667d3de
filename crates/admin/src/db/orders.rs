//! `PostgreSQL` order store.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate builds
//! without a live database. Enum columns map to the `order_status`,
//! `payment_status`, and `fulfillment_status` Postgres types.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use dewdrop_core::{
    CurrencyCode, CustomerId, Email, FulfillmentStatus, LineItemId, OrderId, OrderStatus,
    PaymentStatus, ProductId, RefundId, VariantId,
};

use super::{OrderStore, RepositoryError};
use crate::models::{
    Address, CurrencyRevenue, Customer, LineItem, NewRefund, Order, OrderChanges, OrderFilter, OrderStatistics,
    PageRequest, RefundRecord, StatisticsRange,
};

// =============================================================================
// Internal Row Types
// =============================================================================

const ORDER_COLUMNS: &str = "id, order_number, status, payment_status, fulfillment_status, \
     subtotal, discount_amount, shipping_amount, tax_amount, total_amount, refunded_amount, \
     currency, payment_reference, tracking_number, tracking_company, internal_notes, \
     customer_id, customer_name, customer_email, customer_phone, \
     shipping_address, billing_address, version, created_at, updated_at";

const FILTER_CLAUSE: &str = "($1::order_status IS NULL OR status = $1) \
     AND ($2::payment_status IS NULL OR payment_status = $2) \
     AND ($3::text IS NULL OR order_number ILIKE $3 \
          OR customer_email ILIKE $3 OR customer_name ILIKE $3)";

/// Internal row type for `PostgreSQL` order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    fulfillment_status: FulfillmentStatus,
    subtotal: Decimal,
    discount_amount: Decimal,
    shipping_amount: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    refunded_amount: Decimal,
    currency: String,
    payment_reference: Option<String>,
    tracking_number: Option<String>,
    tracking_company: Option<String>,
    internal_notes: Option<String>,
    customer_id: Option<i64>,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    shipping_address: Option<Json<Address>>,
    billing_address: Option<Json<Address>>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email on order {}: {e}", row.id))
        })?;
        let currency = row.currency.parse::<CurrencyCode>().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            status: row.status,
            payment_status: row.payment_status,
            fulfillment_status: row.fulfillment_status,
            subtotal: row.subtotal,
            discount_amount: row.discount_amount,
            shipping_amount: row.shipping_amount,
            tax_amount: row.tax_amount,
            total_amount: row.total_amount,
            refunded_amount: row.refunded_amount,
            currency,
            payment_reference: row.payment_reference,
            tracking_number: row.tracking_number,
            tracking_company: row.tracking_company,
            internal_notes: row.internal_notes,
            customer: Customer {
                user_id: row.customer_id.map(CustomerId::new),
                name: row.customer_name,
                email,
                phone: row.customer_phone,
            },
            shipping_address: row.shipping_address.map(|Json(address)| address),
            billing_address: row.billing_address.map(|Json(address)| address),
            items: Vec::new(),
            refunds: Vec::new(),
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineItemRow {
    id: i64,
    order_id: i64,
    product_id: Option<i64>,
    variant_id: Option<i64>,
    title: String,
    sku: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    subtotal: Decimal,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        Self {
            id: LineItemId::new(row.id),
            product_id: row.product_id.map(ProductId::new),
            variant_id: row.variant_id.map(VariantId::new),
            title: row.title,
            sku: row.sku,
            quantity: row.quantity,
            unit_price: row.unit_price,
            subtotal: row.subtotal,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RefundRow {
    id: i64,
    order_id: i64,
    amount: Decimal,
    reason: Option<String>,
    refund_shipping: bool,
    provider_refund_id: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl From<RefundRow> for RefundRecord {
    fn from(row: RefundRow) -> Self {
        Self {
            id: RefundId::new(row.id),
            amount: row.amount,
            reason: row.reason,
            refund_shipping: row.refund_shipping,
            provider_refund_id: row.provider_refund_id,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatisticsRow {
    total_orders: i64,
    pending_orders: i64,
    shipped_orders: i64,
    refunded_orders: i64,
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

impl From<StatisticsRow> for OrderStatistics {
    fn from(row: StatisticsRow) -> Self {
        Self {
            total_orders: count(row.total_orders),
            pending_orders: count(row.pending_orders),
            shipped_orders: count(row.shipped_orders),
            refunded_orders: count(row.refunded_orders),
            ..Self::default()
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RevenueRow {
    currency: String,
    revenue: Decimal,
}

impl TryFrom<RevenueRow> for CurrencyRevenue {
    type Error = RepositoryError;

    fn try_from(row: RevenueRow) -> Result<Self, Self::Error> {
        let currency = row
            .currency
            .parse::<CurrencyCode>()
            .map_err(|e| RepositoryError::DataCorruption(format!("revenue row: {e}")))?;
        Ok(Self {
            currency,
            amount: row.revenue,
        })
    }
}

/// Escape `LIKE` metacharacters and wrap the term for a substring match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

// =============================================================================
// Store
// =============================================================================

/// Order store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Attach line items and refunds to freshly loaded order rows.
    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();

        let item_rows = sqlx::query_as::<_, LineItemRow>(
            r"
            SELECT id, order_id, product_id, variant_id, title, sku,
                   quantity, unit_price, subtotal
            FROM order_line_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position, id
            ",
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let refund_rows = sqlx::query_as::<_, RefundRow>(
            r"
            SELECT id, order_id, amount, reason, refund_shipping,
                   provider_refund_id, created_by, created_at
            FROM order_refunds
            WHERE order_id = ANY($1)
            ORDER BY order_id, created_at, id
            ",
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<i64, Vec<LineItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.order_id).or_default().push(row.into());
        }
        let mut refunds: HashMap<i64, Vec<RefundRecord>> = HashMap::new();
        for row in refund_rows {
            refunds.entry(row.order_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let id = row.id;
                let mut order = Order::try_from(row)?;
                order.items = items.remove(&id).unwrap_or_default();
                order.refunds = refunds.remove(&id).unwrap_or_default();
                Ok(order)
            })
            .collect()
    }

    /// Distinguish a missing order from a stale version after a write
    /// touched no rows.
    async fn write_conflict(&self, id: OrderId) -> RepositoryError {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await;

        match exists {
            Ok(true) => RepositoryError::Conflict(format!("order {id} was modified concurrently")),
            Ok(false) => RepositoryError::NotFound,
            Err(e) => e.into(),
        }
    }

    async fn get_required(&self, id: OrderId) -> Result<Order, RepositoryError> {
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<Order>, u64), RepositoryError> {
        let pattern = filter.search.as_deref().map(like_pattern);
        let limit = i64::from(page.limit);
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM orders WHERE {FILTER_CLAUSE}"
        ))
        .bind(filter.status)
        .bind(filter.payment_status)
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {FILTER_CLAUSE} \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.status)
        .bind(filter.payment_status)
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let orders = self.hydrate(rows).await?;
        Ok((orders, count(total)))
    }

    #[instrument(skip(self))]
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    #[instrument(skip(self, changes))]
    async fn update(
        &self,
        id: OrderId,
        expected_version: i32,
        changes: &OrderChanges,
    ) -> Result<Order, RepositoryError> {
        let updated = sqlx::query_scalar::<_, i64>(
            r"
            UPDATE orders
            SET status = $3,
                payment_status = $4,
                fulfillment_status = $5,
                tracking_number = $6,
                tracking_company = $7,
                internal_notes = $8,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING id
            ",
        )
        .bind(id)
        .bind(expected_version)
        .bind(changes.status)
        .bind(changes.payment_status)
        .bind(changes.fulfillment_status)
        .bind(changes.tracking_number.as_deref())
        .bind(changes.tracking_company.as_deref())
        .bind(changes.internal_notes.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_none() {
            return Err(self.write_conflict(id).await);
        }
        self.get_required(id).await
    }

    #[instrument(skip(self, refund), fields(amount = %refund.amount))]
    async fn record_refund(
        &self,
        id: OrderId,
        expected_version: i32,
        refund: &NewRefund,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r"
            UPDATE orders
            SET status = $3,
                payment_status = $4,
                refunded_amount = refunded_amount + $5,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            ",
        )
        .bind(id)
        .bind(expected_version)
        .bind(refund.status)
        .bind(refund.payment_status)
        .bind(refund.amount)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.write_conflict(id).await);
        }

        sqlx::query(
            r"
            INSERT INTO order_refunds
                (order_id, amount, reason, refund_shipping, provider_refund_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(id)
        .bind(refund.amount)
        .bind(refund.reason.as_deref())
        .bind(refund.refund_shipping)
        .bind(&refund.provider_refund_id)
        .bind(&refund.created_by)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Conflict(format!(
                    "provider refund {} already recorded",
                    refund.provider_refund_id
                ))
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        self.get_required(id).await
    }

    #[instrument(skip(self))]
    async fn statistics(
        &self,
        range: &StatisticsRange,
    ) -> Result<OrderStatistics, RepositoryError> {
        let row = sqlx::query_as::<_, StatisticsRow>(
            r"
            SELECT
                COUNT(*) AS total_orders,
                COUNT(*) FILTER (WHERE status = 'PENDING') AS pending_orders,
                COUNT(*) FILTER (WHERE status = 'SHIPPED') AS shipped_orders,
                COUNT(*) FILTER (
                    WHERE payment_status IN ('REFUNDED', 'PARTIALLY_REFUNDED')
                ) AS refunded_orders
            FROM orders
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at < $2)
            ",
        )
        .bind(range.start())
        .bind(range.end_exclusive())
        .fetch_one(&self.pool)
        .await?;

        let revenue_rows = sqlx::query_as::<_, RevenueRow>(
            r"
            SELECT currency, SUM(total_amount - refunded_amount) AS revenue
            FROM orders
            WHERE payment_status IN ('PAID', 'PARTIALLY_REFUNDED')
              AND status <> 'CANCELLED'
              AND ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at < $2)
            GROUP BY currency
            ",
        )
        .bind(range.start())
        .bind(range.end_exclusive())
        .fetch_all(&self.pool)
        .await?;

        let revenue = revenue_rows
            .into_iter()
            .map(CurrencyRevenue::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = OrderStatistics::from(row);
        stats.set_revenue(revenue);
        Ok(stats)
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

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("1001"), "%1001%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_statistics_row_conversion() {
        let mut stats = OrderStatistics::from(StatisticsRow {
            total_orders: 3,
            pending_orders: 1,
            shipped_orders: 0,
            refunded_orders: -1,
        });
        let revenue = [("EUR", Decimal::new(25_000, 2)), ("USD", Decimal::new(80_000, 2))]
            .into_iter()
            .map(|(currency, revenue)| {
                CurrencyRevenue::try_from(RevenueRow {
                    currency: currency.to_string(),
                    revenue,
                })
                .unwrap()
            })
            .collect();
        stats.set_revenue(revenue);

        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.total_revenue, Decimal::new(800, 0));
        assert_eq!(stats.revenue_by_currency.len(), 2);
        assert_eq!(stats.refunded_orders, 0);
    }

    #[test]
    fn test_revenue_row_rejects_unknown_currency() {
        let row = RevenueRow {
            currency: "XYZ".to_string(),
            revenue: Decimal::ONE,
        };
        assert!(matches!(
            CurrencyRevenue::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
