//! Query, form, and view types for the order pages and API.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use dewdrop_core::{AdminRole, FulfillmentStatus, OrderStatus, PaymentStatus};

use crate::error::AppError;
use crate::models::{
    CurrentAdmin, Order, OrderFilter, OrderStatistics, OrderUpdate, PageRequest, Pagination,
    RefundInput, StatisticsRange,
};

// =============================================================================
// Query Parameters
// =============================================================================

/// Treat empty query values as absent; HTML forms submit every field.
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_param<T>(name: &str, value: Option<&String>) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    non_empty(value)
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| AppError::BadRequest(format!("invalid {name}: {e}")))
        })
        .transpose()
}

/// Listing query shared by `GET /orders` and `GET /api/admin/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub search: Option<String>,
}

impl OrdersQuery {
    /// Build the listing filter.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming any unknown status value.
    pub fn filter(&self) -> Result<OrderFilter, AppError> {
        let status = parse_param::<OrderStatus>("status", self.status.as_ref())?;
        let payment_status =
            parse_param::<PaymentStatus>("paymentStatus", self.payment_status.as_ref())?;
        Ok(OrderFilter::new(
            status,
            payment_status,
            self.search.as_deref(),
        ))
    }

    /// Build the page request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if `page` or `limit` is not a number.
    pub fn page_request(&self) -> Result<PageRequest, AppError> {
        Ok(PageRequest::new(
            parse_param("page", self.page.as_ref())?,
            parse_param("limit", self.limit.as_ref())?,
        ))
    }

    /// Filter parameters to carry into pagination links, already encoded.
    #[must_use]
    pub fn preserve_params(&self) -> String {
        let mut params = Vec::new();
        if let Some(status) = non_empty(self.status.as_ref()) {
            params.push(format!("status={}", urlencoding::encode(status)));
        }
        if let Some(payment) = non_empty(self.payment_status.as_ref()) {
            params.push(format!("paymentStatus={}", urlencoding::encode(payment)));
        }
        if let Some(search) = non_empty(self.search.as_ref()) {
            params.push(format!("search={}", urlencoding::encode(search)));
        }
        if let Some(limit) = non_empty(self.limit.as_ref()) {
            params.push(format!("limit={}", urlencoding::encode(limit)));
        }
        params.join("&")
    }
}

/// Date range query for statistics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl StatisticsQuery {
    /// Parse `YYYY-MM-DD` bounds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for malformed dates or `from` after `to`.
    pub fn range(&self) -> Result<StatisticsRange, AppError> {
        let range = StatisticsRange {
            from: parse_param::<NaiveDate>("from", self.from.as_ref())?,
            to: parse_param::<NaiveDate>("to", self.to.as_ref())?,
        };
        if range.is_inverted() {
            return Err(AppError::BadRequest(
                "from must not be after to".to_string(),
            ));
        }
        Ok(range)
    }
}

// =============================================================================
// Form Inputs
// =============================================================================

/// Status form on the order detail page. Empty selects mean "leave as is".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusFormInput {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_company: Option<String>,
    pub internal_notes: Option<String>,
}

impl StatusFormInput {
    /// Convert to an update. Text fields pass through so that an emptied
    /// input clears the stored value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for unknown status values.
    pub fn into_update(self) -> Result<OrderUpdate, AppError> {
        Ok(OrderUpdate {
            status: parse_param("status", self.status.as_ref())?,
            payment_status: parse_param("payment status", self.payment_status.as_ref())?,
            fulfillment_status: parse_param(
                "fulfillment status",
                self.fulfillment_status.as_ref(),
            )?,
            tracking_number: self.tracking_number,
            tracking_company: self.tracking_company,
            internal_notes: self.internal_notes,
        })
    }
}

/// Refund form on the order detail page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundFormInput {
    pub amount: Option<String>,
    pub reason: Option<String>,
    /// Checkbox: present (`on`) when checked.
    pub refund_shipping: Option<String>,
}

impl RefundFormInput {
    /// Convert to a refund request. A blank amount refunds the whole order.
    ///
    /// The shipping checkbox only applies to a blank amount; a typed amount
    /// is refunded as entered.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the amount is not a number.
    pub fn into_input(self) -> Result<RefundInput, AppError> {
        let amount = non_empty(self.amount.as_ref())
            .map(|v| v.trim_start_matches('$'))
            .map(|v| {
                Decimal::from_str(v)
                    .map_err(|_| AppError::BadRequest(format!("invalid refund amount: {v}")))
            })
            .transpose()?;

        let refund_shipping = amount.is_none().then(|| self.refund_shipping.is_some());

        Ok(RefundInput {
            amount,
            reason: self.reason,
            refund_shipping,
        })
    }
}

// =============================================================================
// Views
// =============================================================================

/// Signed-in operator shown in the page header.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub name: String,
    pub email: String,
    pub is_super_admin: bool,
}

impl From<&CurrentAdmin> for AdminUserView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            name: admin.name.clone(),
            email: admin.email.to_string(),
            is_super_admin: admin.role == AdminRole::SuperAdmin,
        }
    }
}

/// An `<option>` in a select.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    fn new(value: &str, label: &str, selected: bool) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            selected,
        }
    }
}

/// Options for the list page's status filter.
#[must_use]
pub fn status_filter_options(selected: Option<OrderStatus>) -> Vec<SelectOption> {
    OrderStatus::ALL
        .iter()
        .map(|s| SelectOption::new(s.as_str(), s.label(), selected == Some(*s)))
        .collect()
}

/// Options for the list page's payment status filter.
#[must_use]
pub fn payment_filter_options(selected: Option<PaymentStatus>) -> Vec<SelectOption> {
    PaymentStatus::ALL
        .iter()
        .map(|s| SelectOption::new(s.as_str(), s.label(), selected == Some(*s)))
        .collect()
}

/// Statistics cards.
#[derive(Debug, Clone)]
pub struct StatsView {
    pub total_orders: u64,
    /// One formatted amount per currency.
    pub revenue: Vec<String>,
    pub pending_orders: u64,
    pub shipped_orders: u64,
    pub refunded_orders: u64,
}

impl From<&OrderStatistics> for StatsView {
    fn from(stats: &OrderStatistics) -> Self {
        Self {
            total_orders: stats.total_orders,
            revenue: if stats.revenue_by_currency.is_empty() {
                vec![dewdrop_core::format_money(
                    Decimal::ZERO,
                    dewdrop_core::CurrencyCode::default(),
                )]
            } else {
                stats
                    .revenue_by_currency
                    .iter()
                    .map(|r| {
                        format!("{} {}", dewdrop_core::format_money(r.amount, r.currency), r.currency)
                    })
                    .collect()
            },
            pending_orders: stats.pending_orders,
            shipped_orders: stats.shipped_orders,
            refunded_orders: stats.refunded_orders,
        }
    }
}

/// Order row in the list table.
#[derive(Debug, Clone)]
pub struct OrderTableView {
    pub id: i64,
    pub number: String,
    pub created_at: String,
    pub customer_name: String,
    pub customer_email: String,
    pub status: String,
    pub status_label: String,
    pub payment_status: String,
    pub payment_label: String,
    pub total: String,
    pub item_count: i64,
}

impl From<&Order> for OrderTableView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i64(),
            number: order.display_number(),
            created_at: order.created_at.format("%b %d, %Y").to_string(),
            customer_name: order.customer.name.clone(),
            customer_email: order.customer.email.to_string(),
            status: order.status.as_str().to_string(),
            status_label: order.status.label().to_string(),
            payment_status: order.payment_status.as_str().to_string(),
            payment_label: order.payment_status.label().to_string(),
            total: order.money(order.total_amount),
            item_count: order.item_count(),
        }
    }
}

/// Pagination links for the list page.
#[derive(Debug, Clone)]
pub struct PaginationView {
    pub page: u32,
    pub total_pages: u64,
    pub total: u64,
    pub previous_url: Option<String>,
    pub next_url: Option<String>,
}

impl PaginationView {
    #[must_use]
    pub fn new(pagination: &Pagination, preserve_params: &str) -> Self {
        let url = |page: u32| {
            if preserve_params.is_empty() {
                format!("/orders?page={page}")
            } else {
                format!("/orders?page={page}&{preserve_params}")
            }
        };
        Self {
            page: pagination.page,
            total_pages: pagination.total_pages,
            total: pagination.total,
            previous_url: pagination
                .has_previous()
                .then(|| url(pagination.page - 1)),
            next_url: pagination.has_next().then(|| url(pagination.page + 1)),
        }
    }
}

/// Line item on the detail page.
#[derive(Debug, Clone)]
pub struct LineItemView {
    pub title: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: String,
    pub subtotal: String,
}

/// Refund history entry on the detail page.
#[derive(Debug, Clone)]
pub struct RefundView {
    pub amount: String,
    pub reason: Option<String>,
    pub refund_shipping: bool,
    pub provider_refund_id: String,
    pub created_by: String,
    pub created_at: String,
}

/// Order detail page view.
#[derive(Debug, Clone)]
pub struct OrderDetailView {
    pub id: i64,
    pub number: String,
    pub created_at: String,
    pub updated_at: String,
    pub status: String,
    pub status_label: String,
    pub payment_status: String,
    pub payment_label: String,
    pub fulfillment_label: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub is_guest: bool,
    pub shipping_address: Vec<String>,
    pub billing_address: Vec<String>,
    pub line_items: Vec<LineItemView>,
    pub refunds: Vec<RefundView>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping: String,
    pub tax: String,
    pub total: String,
    pub refunded: Option<String>,
    pub refundable: String,
    pub tracking_number: String,
    pub tracking_company: String,
    pub internal_notes: String,
    pub payment_reference: Option<String>,
    /// Order statuses the operator may move to, current first.
    pub status_options: Vec<SelectOption>,
    pub payment_options: Vec<SelectOption>,
    pub fulfillment_options: Vec<SelectOption>,
    pub can_refund: bool,
    /// Why the refund form is disabled, when it is.
    pub refund_blocked_reason: Option<String>,
}

impl From<&Order> for OrderDetailView {
    fn from(order: &Order) -> Self {
        let status_options = std::iter::once(order.status)
            .chain(order.status.next_statuses().iter().copied())
            .map(|s| SelectOption::new(s.as_str(), s.label(), s == order.status))
            .collect();

        let payment_options = std::iter::once(order.payment_status)
            .chain(order.payment_status.next_statuses().iter().copied())
            .map(|s| SelectOption::new(s.as_str(), s.label(), s == order.payment_status))
            .collect();

        let fulfillment_options = FulfillmentStatus::ALL
            .iter()
            .map(|s| SelectOption::new(s.as_str(), s.label(), *s == order.fulfillment_status))
            .collect();

        let refund_blocked_reason = if order.payment_status != PaymentStatus::Paid {
            Some(format!(
                "Refunds are only available for paid orders (payment is {}).",
                order.payment_status.label().to_lowercase()
            ))
        } else if order.refundable_amount() <= Decimal::ZERO {
            Some("Nothing left to refund.".to_string())
        } else {
            None
        };

        Self {
            id: order.id.as_i64(),
            number: order.display_number(),
            created_at: order.created_at.format("%b %d, %Y %H:%M UTC").to_string(),
            updated_at: order.updated_at.format("%b %d, %Y %H:%M UTC").to_string(),
            status: order.status.as_str().to_string(),
            status_label: order.status.label().to_string(),
            payment_status: order.payment_status.as_str().to_string(),
            payment_label: order.payment_status.label().to_string(),
            fulfillment_label: order.fulfillment_status.label().to_string(),
            customer_name: order.customer.name.clone(),
            customer_email: order.customer.email.to_string(),
            customer_phone: order.customer.phone.clone(),
            is_guest: order.customer.user_id.is_none(),
            shipping_address: order
                .shipping_address
                .as_ref()
                .map(crate::models::Address::lines)
                .unwrap_or_default(),
            billing_address: order
                .billing_address
                .as_ref()
                .map(crate::models::Address::lines)
                .unwrap_or_default(),
            line_items: order
                .items
                .iter()
                .map(|item| LineItemView {
                    title: item.title.clone(),
                    sku: item.sku.clone(),
                    quantity: item.quantity,
                    unit_price: order.money(item.unit_price),
                    subtotal: order.money(item.subtotal),
                })
                .collect(),
            refunds: order
                .refunds
                .iter()
                .map(|refund| RefundView {
                    amount: order.money(refund.amount),
                    reason: refund.reason.clone(),
                    refund_shipping: refund.refund_shipping,
                    provider_refund_id: refund.provider_refund_id.clone(),
                    created_by: refund.created_by.clone(),
                    created_at: refund.created_at.format("%b %d, %Y %H:%M UTC").to_string(),
                })
                .collect(),
            subtotal: order.money(order.subtotal),
            discount: (order.discount_amount > Decimal::ZERO)
                .then(|| order.money(order.discount_amount)),
            shipping: order.money(order.shipping_amount),
            tax: order.money(order.tax_amount),
            total: order.money(order.total_amount),
            refunded: (order.refunded_amount > Decimal::ZERO)
                .then(|| order.money(order.refunded_amount)),
            refundable: order.money(order.refundable_amount()),
            tracking_number: order.tracking_number.clone().unwrap_or_default(),
            tracking_company: order.tracking_company.clone().unwrap_or_default(),
            internal_notes: order.internal_notes.clone().unwrap_or_default(),
            payment_reference: order.payment_reference.clone(),
            status_options,
            payment_options,
            fulfillment_options,
            can_refund: refund_blocked_reason.is_none(),
            refund_blocked_reason,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::order;

    fn query(status: Option<&str>, payment: Option<&str>, search: Option<&str>) -> OrdersQuery {
        OrdersQuery {
            status: status.map(String::from),
            payment_status: payment.map(String::from),
            search: search.map(String::from),
            ..OrdersQuery::default()
        }
    }

    #[test]
    fn test_filter_parses_known_statuses() {
        let filter = query(Some("shipped"), Some("PAID"), Some(" #1001 "))
            .filter()
            .unwrap();
        assert_eq!(filter.status, Some(OrderStatus::Shipped));
        assert_eq!(filter.payment_status, Some(PaymentStatus::Paid));
        assert_eq!(filter.search.as_deref(), Some("1001"));
    }

    #[test]
    fn test_filter_treats_empty_values_as_absent() {
        let filter = query(Some(""), Some("  "), Some("")).filter().unwrap();
        assert_eq!(filter, OrderFilter::default());
    }

    #[test]
    fn test_filter_rejects_unknown_status() {
        let err = query(Some("LOST"), None, None).filter().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("LOST")));
    }

    #[test]
    fn test_page_request_parsing() {
        let q = OrdersQuery {
            page: Some("3".to_string()),
            limit: Some("500".to_string()),
            ..OrdersQuery::default()
        };
        let page = q.page_request().unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, 100);

        let bad = OrdersQuery {
            page: Some("two".to_string()),
            ..OrdersQuery::default()
        };
        assert!(bad.page_request().is_err());
    }

    #[test]
    fn test_preserve_params_encodes_search() {
        let q = query(Some("PENDING"), None, Some("mina park"));
        assert_eq!(q.preserve_params(), "status=PENDING&search=mina%20park");
    }

    #[test]
    fn test_statistics_range() {
        let q = StatisticsQuery {
            from: Some("2026-03-01".to_string()),
            to: Some("2026-03-31".to_string()),
        };
        let range = q.range().unwrap();
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2026, 3, 1));

        let inverted = StatisticsQuery {
            from: Some("2026-04-01".to_string()),
            to: Some("2026-03-01".to_string()),
        };
        assert!(inverted.range().is_err());

        let malformed = StatisticsQuery {
            from: Some("March".to_string()),
            to: None,
        };
        assert!(malformed.range().is_err());
    }

    #[test]
    fn test_refund_form_conversion() {
        let input = RefundFormInput {
            amount: Some("$200.00".to_string()),
            reason: Some("Damaged".to_string()),
            refund_shipping: None,
        }
        .into_input()
        .unwrap();
        assert_eq!(input.amount, Some(Decimal::new(200, 0)));
        assert_eq!(input.refund_shipping, None);

        let without_shipping = RefundFormInput {
            amount: Some("  ".to_string()),
            reason: None,
            refund_shipping: None,
        }
        .into_input()
        .unwrap();
        assert_eq!(without_shipping.amount, None);
        assert_eq!(without_shipping.refund_shipping, Some(false));

        let full = RefundFormInput {
            amount: Some(String::new()),
            reason: None,
            refund_shipping: Some("on".to_string()),
        }
        .into_input()
        .unwrap();
        assert_eq!(full.amount, None);
        assert_eq!(full.refund_shipping, Some(true));

        let bad = RefundFormInput {
            amount: Some("lots".to_string()),
            ..RefundFormInput::default()
        };
        assert!(bad.into_input().is_err());
    }

    #[test]
    fn test_status_form_conversion() {
        let update = StatusFormInput {
            status: Some("CONFIRMED".to_string()),
            payment_status: Some(String::new()),
            fulfillment_status: None,
            tracking_number: Some(String::new()),
            tracking_company: None,
            internal_notes: Some("call first".to_string()),
        }
        .into_update()
        .unwrap();
        assert_eq!(update.status, Some(OrderStatus::Confirmed));
        assert_eq!(update.payment_status, None);
        assert_eq!(update.tracking_number.as_deref(), Some(""));
    }

    #[test]
    fn test_detail_view_limits_status_options() {
        let order = order(1, "1001", OrderStatus::Shipped, PaymentStatus::Paid);
        let view = OrderDetailView::from(&order);
        let values: Vec<_> = view.status_options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["SHIPPED", "DELIVERED"]);
        assert!(view.status_options[0].selected);
        assert!(view.can_refund);
    }

    #[test]
    fn test_detail_view_blocks_refund_unless_paid() {
        let order = order(2, "1002", OrderStatus::Pending, PaymentStatus::Pending);
        let view = OrderDetailView::from(&order);
        assert!(!view.can_refund);
        assert!(view.refund_blocked_reason.unwrap().contains("pending"));
    }

    #[test]
    fn test_stats_view_shows_each_currency() {
        let usd = order(1, "1001", OrderStatus::Confirmed, PaymentStatus::Paid);
        let mut eur = order(2, "1002", OrderStatus::Confirmed, PaymentStatus::Paid);
        eur.currency = dewdrop_core::CurrencyCode::EUR;

        let view = StatsView::from(&OrderStatistics::from_orders(&[usd, eur]));
        assert_eq!(view.revenue, vec!["€500.00 EUR", "$500.00 USD"]);

        let empty = StatsView::from(&OrderStatistics::default());
        assert_eq!(empty.revenue, vec!["$0.00"]);
    }

    #[test]
    fn test_pagination_view_links() {
        let pagination = Pagination::new(PageRequest::new(Some(2), Some(10)), 35);
        let view = PaginationView::new(&pagination, "status=PAID");
        assert_eq!(view.previous_url.as_deref(), Some("/orders?page=1&status=PAID"));
        assert_eq!(view.next_url.as_deref(), Some("/orders?page=3&status=PAID"));

        let last = Pagination::new(PageRequest::new(Some(4), Some(10)), 35);
        assert!(PaginationView::new(&last, "").next_url.is_none());
    }
}
