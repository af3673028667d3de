//! Order management: listing, status transitions, refunds, statistics.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use dewdrop_core::{OrderId, OrderStatus, PaymentStatus, TransitionError, check_transition};

use super::locks::RefundLocks;
use super::payments::{PaymentError, PaymentGateway, RefundRequest, to_minor_units};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{
    CurrentAdmin, NewRefund, Order, OrderFilter, OrderPage, OrderStatistics, OrderUpdate,
    PageRequest, Pagination, RefundInput, StatisticsRange,
};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found")]
    NotFound,

    /// The requested status change breaks the order state machine.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The refund request failed validation; nothing was sent to the provider.
    #[error("{0}")]
    RefundRejected(String),

    #[error("A refund for this order is already in progress")]
    RefundInProgress,

    /// The order changed between read and write.
    #[error("Order was modified by someone else; reload and try again")]
    Conflict,

    /// The payment provider failed or declined; the order is unchanged.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The provider refunded but the result could not be saved.
    #[error("refund {provider_refund_id} executed but not recorded: {source}")]
    RefundNotRecorded {
        provider_refund_id: String,
        source: RepositoryError,
    },

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for OrderError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(_) => Self::Conflict,
            other => Self::Repository(other),
        }
    }
}

/// Result of a successful refund.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    pub order: Order,
    pub amount: Decimal,
    /// Whether the order is now fully refunded.
    pub full: bool,
    pub provider_refund_id: String,
}

impl RefundOutcome {
    /// Confirmation shown to the operator.
    #[must_use]
    pub fn message(&self) -> String {
        let amount = self.order.money(self.amount);
        if self.full {
            format!("Refund of {amount} processed")
        } else {
            format!("Partial refund of {amount} processed")
        }
    }
}

/// Work out how much to refund. Runs before any provider call.
///
/// # Errors
///
/// Returns `OrderError::RefundRejected` when the amount is not positive, has
/// sub-cent precision, or exceeds what is left to refund.
pub fn resolve_refund_amount(order: &Order, input: &RefundInput) -> Result<Decimal, OrderError> {
    let refundable = order.refundable_amount();

    let amount = match input.amount {
        Some(amount) => {
            if amount <= Decimal::ZERO {
                return Err(OrderError::RefundRejected(
                    "Refund amount must be greater than zero".to_string(),
                ));
            }
            if amount.normalize().scale() > 2 {
                return Err(OrderError::RefundRejected(
                    "Refund amount may have at most two decimal places".to_string(),
                ));
            }
            if amount > order.total_amount {
                return Err(OrderError::RefundRejected(format!(
                    "Refund amount cannot exceed the order total of {}",
                    order.money(order.total_amount)
                )));
            }
            amount
        }
        None if input.refund_shipping == Some(false) => refundable - order.shipping_amount,
        None => refundable,
    };

    if amount <= Decimal::ZERO {
        return Err(OrderError::RefundRejected(
            "Nothing left to refund on this order".to_string(),
        ));
    }
    if amount > refundable {
        return Err(OrderError::RefundRejected(format!(
            "Refund amount exceeds the remaining refundable balance of {}",
            order.money(refundable)
        )));
    }
    Ok(amount)
}

/// Key the provider uses to collapse replays of the same refund.
///
/// Every attempt gets a fresh key, so a resubmission after a decline is a
/// new request at the provider rather than a replay of the decline.
fn idempotency_key(order: &Order, amount: Decimal) -> Result<String, OrderError> {
    Ok(format!(
        "order-{}-v{}-{}-{}",
        order.id,
        order.version,
        to_minor_units(amount)?,
        Uuid::new_v4().simple()
    ))
}

/// A refund the provider executed that could not be saved.
///
/// Resubmitting the same amount against the same order version reuses its
/// key, so the provider returns the original refund instead of paying out
/// twice.
#[derive(Debug, Clone)]
struct UnrecordedRefund {
    version: i32,
    amount: Decimal,
    idempotency_key: String,
}

/// Order operations used by both the JSON API and the HTML pages.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentGateway>,
    locks: RefundLocks,
    unrecorded: Arc<DashMap<OrderId, UnrecordedRefund>>,
}

impl OrderService {
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, payments: Arc<dyn PaymentGateway>) -> Self {
        Self {
            store,
            payments,
            locks: RefundLocks::new(),
            unrecorded: Arc::new(DashMap::new()),
        }
    }

    /// The refund lock table.
    #[must_use]
    pub const fn locks(&self) -> &RefundLocks {
        &self.locks
    }

    /// One page of orders matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<OrderPage, OrderError> {
        let (orders, total) = self.store.list(filter, page).await?;
        Ok(OrderPage {
            orders,
            pagination: Pagination::new(page, total),
        })
    }

    /// Load one order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Order, OrderError> {
        self.store.get(id).await?.ok_or(OrderError::NotFound)
    }

    /// Apply an operator update after checking it against the state machine.
    ///
    /// An update that changes nothing is accepted without a write.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Transition` for illegal changes,
    /// `OrderError::Conflict` if the order changed concurrently, and
    /// `OrderError::NotFound` for unknown orders.
    #[instrument(skip(self, update, actor), fields(actor = %actor.email))]
    pub async fn update_status(
        &self,
        id: OrderId,
        update: &OrderUpdate,
        actor: &CurrentAdmin,
    ) -> Result<Order, OrderError> {
        let order = self.get(id).await?;
        let changes = update.apply_to(&order);

        check_transition(
            (order.status, order.payment_status),
            (changes.status, changes.payment_status),
        )?;

        if changes == OrderUpdate::default().apply_to(&order) {
            return Ok(order);
        }

        let updated = self.store.update(id, order.version, &changes).await?;

        tracing::info!(
            order_id = %id,
            from_status = %order.status,
            to_status = %updated.status,
            from_payment = %order.payment_status,
            to_payment = %updated.payment_status,
            fulfillment = %updated.fulfillment_status,
            "Order updated"
        );

        Ok(updated)
    }

    /// Refund an order through the payment provider.
    ///
    /// Validation happens before the provider is called. The order is only
    /// changed after the provider confirms the refund.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::RefundInProgress` if another refund for the same
    /// order is running, `OrderError::RefundRejected` if validation fails,
    /// `OrderError::Payment` if the provider fails, and
    /// `OrderError::RefundNotRecorded` if the provider succeeded but the
    /// result could not be saved.
    #[instrument(skip(self, input, actor), fields(actor = %actor.email))]
    pub async fn refund(
        &self,
        id: OrderId,
        input: &RefundInput,
        actor: &CurrentAdmin,
    ) -> Result<RefundOutcome, OrderError> {
        let _guard = self
            .locks
            .try_acquire(id)
            .ok_or(OrderError::RefundInProgress)?;

        let order = self.get(id).await?;

        if order.payment_status != PaymentStatus::Paid {
            return Err(OrderError::RefundRejected(format!(
                "Only paid orders can be refunded (payment status is {})",
                order.payment_status.label().to_lowercase()
            )));
        }

        let amount = resolve_refund_amount(&order, input)?;

        let payment_reference = order
            .payment_reference
            .clone()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                OrderError::RefundRejected(
                    "Order has no payment reference to refund against".to_string(),
                )
            })?;

        let replayed = self
            .unrecorded
            .get(&id)
            .filter(|pending| pending.version == order.version && pending.amount == amount)
            .map(|pending| pending.idempotency_key.clone());
        let key = match replayed {
            Some(key) => {
                tracing::info!(order_id = %id, amount = %amount, "Replaying unrecorded refund");
                key
            }
            None => idempotency_key(&order, amount)?,
        };

        let reason = input.reason();
        let request = RefundRequest {
            order_id: order.id,
            payment_reference,
            amount,
            currency: order.currency,
            reason: reason.clone(),
            idempotency_key: key,
        };

        let provider_refund = self.payments.refund(&request).await.map_err(|e| {
            tracing::warn!(order_id = %id, amount = %amount, error = %e, "Refund failed at provider");
            OrderError::Payment(e)
        })?;

        let full = order.refunded_amount + amount >= order.total_amount;
        let (status, payment_status) = if full {
            (OrderStatus::Refunded, PaymentStatus::Refunded)
        } else {
            (order.status, PaymentStatus::PartiallyRefunded)
        };

        let new_refund = NewRefund {
            amount,
            reason,
            refund_shipping: input.refund_shipping.unwrap_or(true),
            provider_refund_id: provider_refund.id.clone(),
            created_by: actor.email.to_string(),
            status,
            payment_status,
        };

        let updated = self
            .store
            .record_refund(id, order.version, &new_refund)
            .await
            .map_err(|source| {
                tracing::error!(
                    order_id = %id,
                    provider_refund_id = %provider_refund.id,
                    amount = %amount,
                    error = %source,
                    "Refund executed at provider but not recorded; reconcile manually"
                );
                self.unrecorded.insert(
                    id,
                    UnrecordedRefund {
                        version: order.version,
                        amount,
                        idempotency_key: request.idempotency_key.clone(),
                    },
                );
                OrderError::RefundNotRecorded {
                    provider_refund_id: provider_refund.id.clone(),
                    source,
                }
            })?;
        self.unrecorded.remove(&id);

        tracing::info!(
            order_id = %id,
            amount = %amount,
            full,
            provider_refund_id = %provider_refund.id,
            provider_status = %provider_refund.status,
            "Order refunded"
        );

        Ok(RefundOutcome {
            order: updated,
            amount,
            full,
            provider_refund_id: provider_refund.id,
        })
    }

    /// Aggregate figures, recomputed on every call.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn statistics(
        &self,
        range: &StatisticsRange,
    ) -> Result<OrderStatistics, OrderError> {
        Ok(self.store.statistics(range).await?)
    }

    /// Check the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns the store error if it is not.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.store.ping().await
    }
}
