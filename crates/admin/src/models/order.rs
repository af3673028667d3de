//! Order domain models for the back-office.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dewdrop_core::{
    CurrencyCode, CustomerId, Email, FulfillmentStatus, LineItemId, OrderId, OrderStatus,
    PaymentStatus, ProductId, RefundId, VariantId, format_money,
};

/// Default page size for order listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A postal address, stored as JSONB on the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub province: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Address {
    /// Address lines for display, skipping empty parts.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.name.clone(), self.line1.clone()];
        if let Some(line2) = self.line2.as_deref().filter(|l| !l.is_empty()) {
            lines.push(line2.to_string());
        }
        let locality = match self.province.as_deref().filter(|p| !p.is_empty()) {
            Some(province) => format!("{}, {} {}", self.city, province, self.postal_code),
            None => format!("{} {}", self.city, self.postal_code),
        };
        lines.push(locality);
        lines.push(self.country.clone());
        lines
    }
}

/// The purchaser: a registered customer or a guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Registered customer, `None` for guest checkout.
    pub user_id: Option<CustomerId>,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
}

/// A purchased product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: LineItemId,
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub title: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// A completed refund, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRecord {
    pub id: RefundId,
    pub amount: Decimal,
    pub reason: Option<String>,
    pub refund_shipping: bool,
    /// Identifier assigned by the payment provider.
    pub provider_refund_id: String,
    /// Email of the operator who issued the refund.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub shipping_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub refunded_amount: Decimal,
    pub currency: CurrencyCode,
    /// Provider charge or payment-intent id the order was paid with.
    pub payment_reference: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_company: Option<String>,
    pub internal_notes: Option<String>,
    pub customer: Customer,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub items: Vec<LineItem>,
    pub refunds: Vec<RefundRecord>,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Order number as shown to people, e.g. `#1001`.
    #[must_use]
    pub fn display_number(&self) -> String {
        format!("#{}", self.order_number)
    }

    /// Amount that can still be refunded.
    #[must_use]
    pub fn refundable_amount(&self) -> Decimal {
        (self.total_amount - self.refunded_amount).max(Decimal::ZERO)
    }

    /// Whether the refund form should be offered.
    #[must_use]
    pub fn is_refundable(&self) -> bool {
        self.payment_status == PaymentStatus::Paid && self.refundable_amount() > Decimal::ZERO
    }

    /// Format an amount in this order's currency.
    #[must_use]
    pub fn money(&self, amount: Decimal) -> String {
        format_money(amount, self.currency)
    }

    /// Total quantity across all line items.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }
}

/// Operator-submitted partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub tracking_number: Option<String>,
    pub tracking_company: Option<String>,
    pub internal_notes: Option<String>,
}

impl OrderUpdate {
    /// Resolve this update against the current order.
    ///
    /// Text fields are trimmed and an empty value clears the field.
    #[must_use]
    pub fn apply_to(&self, order: &Order) -> OrderChanges {
        OrderChanges {
            status: self.status.unwrap_or(order.status),
            payment_status: self.payment_status.unwrap_or(order.payment_status),
            fulfillment_status: self.fulfillment_status.unwrap_or(order.fulfillment_status),
            tracking_number: resolve_text(self.tracking_number.as_deref(), &order.tracking_number),
            tracking_company: resolve_text(
                self.tracking_company.as_deref(),
                &order.tracking_company,
            ),
            internal_notes: resolve_text(self.internal_notes.as_deref(), &order.internal_notes),
        }
    }
}

fn resolve_text(submitted: Option<&str>, current: &Option<String>) -> Option<String> {
    match submitted {
        None => current.clone(),
        Some(value) => {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
}

/// The full set of operator-editable fields after an update is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderChanges {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub tracking_number: Option<String>,
    pub tracking_company: Option<String>,
    pub internal_notes: Option<String>,
}

/// Operator refund request. With no amount, the whole order is refunded
/// (less shipping when `refund_shipping` is `false`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundInput {
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
    pub refund_shipping: Option<bool>,
}

impl RefundInput {
    /// Trimmed reason, `None` when blank.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}

/// A refund the provider has executed, ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewRefund {
    pub amount: Decimal,
    pub reason: Option<String>,
    pub refund_shipping: bool,
    pub provider_refund_id: String,
    pub created_by: String,
    /// Order status after the refund.
    pub status: OrderStatus,
    /// Payment status after the refund.
    pub payment_status: PaymentStatus,
}

/// Listing filters, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Lowercased search term with any leading `#` removed.
    pub search: Option<String>,
}

impl OrderFilter {
    /// Build a filter, normalizing the search term.
    #[must_use]
    pub fn new(
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
        search: Option<&str>,
    ) -> Self {
        let search = search
            .map(|s| s.trim().trim_start_matches('#').trim().to_lowercase())
            .filter(|s| !s.is_empty());
        Self {
            status,
            payment_status,
            search,
        }
    }

    /// Whether `order` satisfies every supplied filter.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        if self.status.is_some_and(|status| order.status != status) {
            return false;
        }
        if self
            .payment_status
            .is_some_and(|payment| order.payment_status != payment)
        {
            return false;
        }
        match &self.search {
            None => true,
            Some(term) => {
                order.order_number.to_lowercase().contains(term)
                    || order.customer.email.as_str().contains(term)
                    || order.customer.name.to_lowercase().contains(term)
            }
        }
    }
}

/// A requested page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Build a page request. Page is at least 1, limit is clamped to `1..=100`.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Pagination metadata returned with a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    #[must_use]
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(u64::from(request.limit)),
        }
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}

/// One page of orders.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

/// Inclusive calendar-date bounds on `createdAt` (UTC).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct StatisticsRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl StatisticsRange {
    /// First instant inside the range.
    #[must_use]
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.from
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// First instant after the range.
    #[must_use]
    pub fn end_exclusive(&self) -> Option<DateTime<Utc>> {
        self.to
            .and_then(|date| date.succ_opt())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start().is_none_or(|start| at >= start)
            && self.end_exclusive().is_none_or(|end| at < end)
    }

    /// Whether `from` falls after `to`.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }
}

/// Revenue in one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyRevenue {
    pub currency: CurrencyCode,
    pub amount: Decimal,
}

/// Aggregate order figures for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatistics {
    pub total_orders: u64,
    /// Captured money net of refunds, excluding cancelled orders, in the
    /// default store currency only.
    pub total_revenue: Decimal,
    /// The same figure for every currency with revenue, ordered by code.
    /// Amounts in different currencies are never added together.
    pub revenue_by_currency: Vec<CurrencyRevenue>,
    pub pending_orders: u64,
    pub shipped_orders: u64,
    /// Orders with any refund.
    pub refunded_orders: u64,
}

impl OrderStatistics {
    /// Compute statistics over an in-memory set of orders.
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut revenue: Vec<CurrencyRevenue> = Vec::new();
        let mut stats = orders.into_iter().fold(Self::default(), |mut stats, order| {
            stats.total_orders += 1;
            if counts_as_revenue(order.status, order.payment_status) {
                let net = order.total_amount - order.refunded_amount;
                match revenue.iter_mut().find(|r| r.currency == order.currency) {
                    Some(entry) => entry.amount += net,
                    None => revenue.push(CurrencyRevenue {
                        currency: order.currency,
                        amount: net,
                    }),
                }
            }
            if order.status == OrderStatus::Pending {
                stats.pending_orders += 1;
            }
            if order.status == OrderStatus::Shipped {
                stats.shipped_orders += 1;
            }
            if order.payment_status.is_refunded() {
                stats.refunded_orders += 1;
            }
            stats
        });
        stats.set_revenue(revenue);
        stats
    }

    /// Fill both revenue fields from per-currency totals.
    pub fn set_revenue(&mut self, mut revenue: Vec<CurrencyRevenue>) {
        revenue.sort_by_key(|r| r.currency.code());
        self.total_revenue = revenue
            .iter()
            .find(|r| r.currency == CurrencyCode::default())
            .map_or(Decimal::ZERO, |r| r.amount);
        self.revenue_by_currency = revenue;
    }
}

/// Revenue counts captured payments on orders that were not cancelled.
#[must_use]
pub fn counts_as_revenue(status: OrderStatus, payment: PaymentStatus) -> bool {
    payment.is_captured() && status != OrderStatus::Cancelled
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn order(id: i64, number: &str, status: OrderStatus, payment: PaymentStatus) -> Order {
        let created_at = DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + chrono::Duration::minutes(id);
        Order {
            id: OrderId::new(id),
            order_number: number.to_string(),
            status,
            payment_status: payment,
            fulfillment_status: FulfillmentStatus::Unfulfilled,
            subtotal: Decimal::new(480, 0),
            discount_amount: Decimal::ZERO,
            shipping_amount: Decimal::new(20, 0),
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::new(500, 0),
            refunded_amount: Decimal::ZERO,
            currency: CurrencyCode::USD,
            payment_reference: Some(format!("pi_{id}")),
            tracking_number: None,
            tracking_company: None,
            internal_notes: None,
            customer: Customer {
                user_id: None,
                name: "Mina Park".to_string(),
                email: Email::parse("mina@example.com").unwrap(),
                phone: None,
            },
            shipping_address: None,
            billing_address: None,
            items: Vec::new(),
            refunds: Vec::new(),
            version: 1,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(None, None), PageRequest::default());
        assert_eq!(PageRequest::new(Some(0), Some(0)).page, 1);
        assert_eq!(PageRequest::new(Some(0), Some(0)).limit, 1);
        assert_eq!(PageRequest::new(Some(3), Some(500)).limit, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_pagination_total_pages() {
        let request = PageRequest::new(Some(1), Some(20));
        assert_eq!(Pagination::new(request, 0).total_pages, 0);
        assert_eq!(Pagination::new(request, 20).total_pages, 1);
        assert_eq!(Pagination::new(request, 21).total_pages, 2);
        assert!(Pagination::new(request, 21).has_next());
        assert!(!Pagination::new(request, 21).has_previous());
    }

    #[test]
    fn test_filter_search_normalization() {
        let filter = OrderFilter::new(None, None, Some("  #1001 "));
        assert_eq!(filter.search.as_deref(), Some("1001"));
        assert!(OrderFilter::new(None, None, Some("   ")).search.is_none());
        assert!(OrderFilter::new(None, None, Some("#")).search.is_none());
    }

    #[test]
    fn test_filter_matches_all_fields() {
        let o = order(1, "1001", OrderStatus::Pending, PaymentStatus::Paid);

        assert!(OrderFilter::default().matches(&o));
        assert!(OrderFilter::new(Some(OrderStatus::Pending), None, None).matches(&o));
        assert!(!OrderFilter::new(Some(OrderStatus::Shipped), None, None).matches(&o));
        assert!(!OrderFilter::new(None, Some(PaymentStatus::Failed), None).matches(&o));
        assert!(OrderFilter::new(None, None, Some("MINA")).matches(&o));
        assert!(OrderFilter::new(None, None, Some("example.com")).matches(&o));
        assert!(OrderFilter::new(None, None, Some("#100")).matches(&o));
        assert!(!OrderFilter::new(None, None, Some("2002")).matches(&o));
        assert!(
            !OrderFilter::new(Some(OrderStatus::Pending), None, Some("nobody")).matches(&o)
        );
    }

    #[test]
    fn test_update_trims_and_clears_text() {
        let mut o = order(1, "1001", OrderStatus::Processing, PaymentStatus::Paid);
        o.internal_notes = Some("fragile".to_string());
        o.tracking_company = Some("UPS".to_string());

        let update = OrderUpdate {
            tracking_number: Some("  1Z999 ".to_string()),
            internal_notes: Some("   ".to_string()),
            ..OrderUpdate::default()
        };
        let changes = update.apply_to(&o);

        assert_eq!(changes.status, OrderStatus::Processing);
        assert_eq!(changes.tracking_number.as_deref(), Some("1Z999"));
        assert_eq!(changes.tracking_company.as_deref(), Some("UPS"));
        assert_eq!(changes.internal_notes, None);
    }

    #[test]
    fn test_statistics_from_orders() {
        let mut partially = order(3, "1003", OrderStatus::Shipped, PaymentStatus::PartiallyRefunded);
        partially.refunded_amount = Decimal::new(200, 0);
        let mut refunded = order(4, "1004", OrderStatus::Refunded, PaymentStatus::Refunded);
        refunded.refunded_amount = Decimal::new(500, 0);
        let orders = [
            order(1, "1001", OrderStatus::Pending, PaymentStatus::Pending),
            order(2, "1002", OrderStatus::Confirmed, PaymentStatus::Paid),
            partially,
            refunded,
            order(5, "1005", OrderStatus::Cancelled, PaymentStatus::Paid),
        ];

        let stats = OrderStatistics::from_orders(&orders);
        assert_eq!(stats.total_orders, 5);
        assert_eq!(stats.total_revenue, Decimal::new(800, 0));
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.shipped_orders, 1);
        assert_eq!(stats.refunded_orders, 2);
        assert_eq!(
            stats.revenue_by_currency,
            vec![CurrencyRevenue {
                currency: CurrencyCode::USD,
                amount: Decimal::new(800, 0),
            }]
        );
    }

    #[test]
    fn test_statistics_keep_currencies_apart() {
        let usd = order(1, "1001", OrderStatus::Confirmed, PaymentStatus::Paid);
        let mut eur = order(2, "1002", OrderStatus::Confirmed, PaymentStatus::Paid);
        eur.currency = CurrencyCode::EUR;
        let mut gbp = order(3, "1003", OrderStatus::Shipped, PaymentStatus::PartiallyRefunded);
        gbp.currency = CurrencyCode::GBP;
        gbp.refunded_amount = Decimal::new(100, 0);

        let stats = OrderStatistics::from_orders(&[usd, eur, gbp]);
        assert_eq!(stats.total_orders, 3);
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
    }

    #[test]
    fn test_statistics_without_default_currency_revenue() {
        let mut cad = order(1, "1001", OrderStatus::Confirmed, PaymentStatus::Paid);
        cad.currency = CurrencyCode::CAD;

        let stats = OrderStatistics::from_orders(&[cad]);
        assert_eq!(stats.total_revenue, Decimal::ZERO);
        assert_eq!(stats.revenue_by_currency.len(), 1);
        assert_eq!(stats.revenue_by_currency[0].currency, CurrencyCode::CAD);
    }

    #[test]
    fn test_statistics_range_is_inclusive() {
        let range = StatisticsRange {
            from: NaiveDate::from_ymd_opt(2026, 3, 1),
            to: NaiveDate::from_ymd_opt(2026, 3, 1),
        };
        let inside = DateTime::parse_from_rfc3339("2026-03-01T23:59:59Z")
            .unwrap()
            .with_timezone(&Utc);
        let after = DateTime::parse_from_rfc3339("2026-03-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(range.contains(inside));
        assert!(!range.contains(after));
        assert!(!range.is_inverted());
    }

    #[test]
    fn test_order_serializes_camel_case() {
        let o = order(7, "1007", OrderStatus::Pending, PaymentStatus::Pending);
        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json["orderNumber"], "1007");
        assert_eq!(json["paymentStatus"], "PENDING");
        assert_eq!(json["customer"]["email"], "mina@example.com");
        assert_eq!(o.display_number(), "#1007");
        assert_eq!(o.money(o.total_amount), "$500.00");
    }
}
