//! In-memory order store for tests and local demos.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use dewdrop_core::{OrderId, RefundId};

use super::{OrderStore, RepositoryError};
use crate::models::{
    NewRefund, Order, OrderChanges, OrderFilter, OrderStatistics, PageRequest, RefundRecord,
    StatisticsRange,
};

/// Order store holding everything in a `BTreeMap`.
///
/// Applies the same version checks as [`super::PgOrderStore`]. Writes can
/// be made to fail on demand to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: RwLock<BTreeMap<OrderId, Order>>,
    next_refund_id: AtomicI64,
    fail_writes: AtomicBool,
}

impl MemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with `orders`.
    #[must_use]
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let map = orders.into_iter().map(|order| (order.id, order)).collect();
        Self {
            orders: RwLock::new(map),
            ..Self::default()
        }
    }

    /// Insert or replace an order.
    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }

    /// Make every subsequent write fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

fn checked_mut(
    orders: &mut BTreeMap<OrderId, Order>,
    id: OrderId,
    expected_version: i32,
) -> Result<&mut Order, RepositoryError> {
    let order = orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
    if order.version != expected_version {
        return Err(RepositoryError::Conflict(format!(
            "order {id} was modified concurrently"
        )));
    }
    Ok(order)
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<Order>, u64), RepositoryError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<&Order> = orders.values().filter(|o| filter.matches(o)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
        let page_orders = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((page_orders, total))
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update(
        &self,
        id: OrderId,
        expected_version: i32,
        changes: &OrderChanges,
    ) -> Result<Order, RepositoryError> {
        self.check_writable()?;
        let mut orders = self.orders.write().await;
        let order = checked_mut(&mut orders, id, expected_version)?;

        order.status = changes.status;
        order.payment_status = changes.payment_status;
        order.fulfillment_status = changes.fulfillment_status;
        order.tracking_number.clone_from(&changes.tracking_number);
        order.tracking_company.clone_from(&changes.tracking_company);
        order.internal_notes.clone_from(&changes.internal_notes);
        order.version += 1;
        order.updated_at = Utc::now();

        Ok(order.clone())
    }

    async fn record_refund(
        &self,
        id: OrderId,
        expected_version: i32,
        refund: &NewRefund,
    ) -> Result<Order, RepositoryError> {
        self.check_writable()?;
        let mut orders = self.orders.write().await;

        let duplicate = orders.values().any(|o| {
            o.refunds
                .iter()
                .any(|r| r.provider_refund_id == refund.provider_refund_id)
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "provider refund {} already recorded",
                refund.provider_refund_id
            )));
        }

        let order = checked_mut(&mut orders, id, expected_version)?;
        let now = Utc::now();
        let refund_id = self.next_refund_id.fetch_add(1, Ordering::SeqCst) + 1;

        order.refunds.push(RefundRecord {
            id: RefundId::new(refund_id),
            amount: refund.amount,
            reason: refund.reason.clone(),
            refund_shipping: refund.refund_shipping,
            provider_refund_id: refund.provider_refund_id.clone(),
            created_by: refund.created_by.clone(),
            created_at: now,
        });
        order.refunded_amount += refund.amount;
        order.status = refund.status;
        order.payment_status = refund.payment_status;
        order.version += 1;
        order.updated_at = now;

        Ok(order.clone())
    }

    async fn statistics(
        &self,
        range: &StatisticsRange,
    ) -> Result<OrderStatistics, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(OrderStatistics::from_orders(
            orders.values().filter(|o| range.contains(o.created_at)),
        ))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dewdrop_core::{OrderStatus, PaymentStatus};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::order::tests::order;

    #[tokio::test]
    async fn test_list_orders_newest_first_and_pages() {
        let store = MemoryOrderStore::with_orders(
            (1..=5).map(|i| order(i, &format!("100{i}"), OrderStatus::Pending, PaymentStatus::Paid)),
        );

        let (first, total) = store
            .list(&OrderFilter::default(), PageRequest::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(
            first.iter().map(|o| o.id.as_i64()).collect::<Vec<_>>(),
            vec![5, 4]
        );

        let (last, _) = store
            .list(&OrderFilter::default(), PageRequest::new(Some(3), Some(2)))
            .await
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id, OrderId::new(1));
    }

    #[tokio::test]
    async fn test_update_rejects_stale_version() {
        let o = order(1, "1001", OrderStatus::Pending, PaymentStatus::Pending);
        let store = MemoryOrderStore::with_orders([o.clone()]);
        let changes = OrderChanges {
            status: OrderStatus::Confirmed,
            payment_status: o.payment_status,
            fulfillment_status: o.fulfillment_status,
            tracking_number: None,
            tracking_company: None,
            internal_notes: None,
        };

        let updated = store.update(o.id, 1, &changes).await.unwrap();
        assert_eq!(updated.version, 2);

        let stale = store.update(o.id, 1, &changes).await.unwrap_err();
        assert!(matches!(stale, RepositoryError::Conflict(_)));

        let missing = store.update(OrderId::new(99), 1, &changes).await.unwrap_err();
        assert!(matches!(missing, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_record_refund_appends_history() {
        let o = order(1, "1001", OrderStatus::Confirmed, PaymentStatus::Paid);
        let store = MemoryOrderStore::with_orders([o]);
        let refund = NewRefund {
            amount: Decimal::new(200, 0),
            reason: Some("damaged".to_string()),
            refund_shipping: true,
            provider_refund_id: "re_1".to_string(),
            created_by: "ops@dewdrop.skin".to_string(),
            status: OrderStatus::Confirmed,
            payment_status: PaymentStatus::PartiallyRefunded,
        };

        let updated = store.record_refund(OrderId::new(1), 1, &refund).await.unwrap();
        assert_eq!(updated.refunded_amount, Decimal::new(200, 0));
        assert_eq!(updated.refunds.len(), 1);
        assert_eq!(updated.payment_status, PaymentStatus::PartiallyRefunded);

        let replay = store.record_refund(OrderId::new(1), 2, &refund).await.unwrap_err();
        assert!(matches!(replay, RepositoryError::Conflict(_)));
    }
}
