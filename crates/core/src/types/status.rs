//! Order lifecycle, payment, and fulfillment statuses.
//!
//! Order status and payment status are separate axes, but not independent:
//! the operator-facing transitions and the legal `(status, payment)`
//! combinations are encoded here as an explicit state machine. Refund
//! states are never reachable through [`check_transition`]; only the refund
//! handler moves an order into them.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a status string does not name a known value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownStatus {
    /// Which status axis was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_uppercase().replace(['-', ' '], "_")
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// Wire representation (`PENDING`, `SHIPPED`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
        }
    }

    /// Statuses an operator may move an order to from this one.
    #[must_use]
    pub const fn next_statuses(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Processing, Self::Cancelled],
            Self::Confirmed => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered | Self::Cancelled | Self::Refunded => &[],
        }
    }

    /// Whether an operator may set `next` on an order currently in `self`.
    ///
    /// Keeping the same status is always allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self == next || self.next_statuses().contains(&next)
    }

    /// Whether this status requires a captured payment.
    #[must_use]
    pub const fn requires_payment(self) -> bool {
        matches!(self, Self::Processing | Self::Shipped | Self::Delivered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == key)
            .ok_or_else(|| UnknownStatus {
                kind: "order status",
                value: s.to_string(),
            })
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    /// Every payment status.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Paid,
        Self::Failed,
        Self::Refunded,
        Self::PartiallyRefunded,
    ];

    /// Wire representation (`PAID`, `PARTIALLY_REFUNDED`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
            Self::PartiallyRefunded => "PARTIALLY_REFUNDED",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
            Self::PartiallyRefunded => "Partially refunded",
        }
    }

    /// Payment statuses an operator may set from this one.
    #[must_use]
    pub const fn next_statuses(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Paid, Self::Failed],
            Self::Failed => &[Self::Pending, Self::Paid],
            Self::Paid | Self::Refunded | Self::PartiallyRefunded => &[],
        }
    }

    /// Whether an operator may set `next` on an order currently in `self`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self == next || self.next_statuses().contains(&next)
    }

    /// Money has been captured and not fully returned.
    #[must_use]
    pub const fn is_captured(self) -> bool {
        matches!(self, Self::Paid | Self::PartiallyRefunded)
    }

    /// Some or all of the payment has been refunded.
    #[must_use]
    pub const fn is_refunded(self) -> bool {
        matches!(self, Self::Refunded | Self::PartiallyRefunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == key)
            .ok_or_else(|| UnknownStatus {
                kind: "payment status",
                value: s.to_string(),
            })
    }
}

/// Shipping progress of an order, tracked independently of payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "fulfillment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    #[default]
    Unfulfilled,
    PartiallyFulfilled,
    Fulfilled,
    Restocked,
}

impl FulfillmentStatus {
    /// Every fulfillment status.
    pub const ALL: [Self; 4] = [
        Self::Unfulfilled,
        Self::PartiallyFulfilled,
        Self::Fulfilled,
        Self::Restocked,
    ];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unfulfilled => "UNFULFILLED",
            Self::PartiallyFulfilled => "PARTIALLY_FULFILLED",
            Self::Fulfilled => "FULFILLED",
            Self::Restocked => "RESTOCKED",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unfulfilled => "Unfulfilled",
            Self::PartiallyFulfilled => "Partially fulfilled",
            Self::Fulfilled => "Fulfilled",
            Self::Restocked => "Restocked",
        }
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FulfillmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == key)
            .ok_or_else(|| UnknownStatus {
                kind: "fulfillment status",
                value: s.to_string(),
            })
    }
}

/// A rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The order status cannot move from `from` to `to`.
    #[error("order status cannot change from {from} to {to}")]
    Status { from: OrderStatus, to: OrderStatus },

    /// The payment status cannot move from `from` to `to`.
    #[error("payment status cannot change from {from} to {to}")]
    Payment {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// The resulting pair of statuses is not a legal state.
    #[error("order status {status} is not allowed with payment status {payment}: {reason}")]
    Combination {
        status: OrderStatus,
        payment: PaymentStatus,
        reason: &'static str,
    },
}

/// Check that `(status, payment)` is a legal resting state for an order.
///
/// # Errors
///
/// Returns [`TransitionError::Combination`] describing the violated rule.
pub const fn check_combination(
    status: OrderStatus,
    payment: PaymentStatus,
) -> Result<(), TransitionError> {
    let reason = if status.requires_payment() && !payment.is_captured() {
        Some("payment must be captured first")
    } else if matches!(status, OrderStatus::Refunded)
        && !matches!(payment, PaymentStatus::Refunded)
    {
        Some("a refunded order must have a refunded payment")
    } else if matches!(payment, PaymentStatus::Refunded)
        && !matches!(status, OrderStatus::Refunded)
    {
        Some("a fully refunded payment must mark the order refunded")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(TransitionError::Combination {
            status,
            payment,
            reason,
        }),
        None => Ok(()),
    }
}

/// Check an operator-initiated change from `current` to `next`, where each
/// is a `(status, payment)` pair.
///
/// # Errors
///
/// Returns the first violated rule: status edge, payment edge, then the
/// combination of the resulting pair.
pub fn check_transition(
    current: (OrderStatus, PaymentStatus),
    next: (OrderStatus, PaymentStatus),
) -> Result<(), TransitionError> {
    let (from_status, from_payment) = current;
    let (to_status, to_payment) = next;

    if !from_status.can_transition_to(to_status) {
        return Err(TransitionError::Status {
            from: from_status,
            to: to_status,
        });
    }
    if !from_payment.can_transition_to(to_payment) {
        return Err(TransitionError::Payment {
            from: from_payment,
            to: to_payment,
        });
    }
    check_combination(to_status, to_payment)
}

/// Role carried in an operator's access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminRole {
    /// Full access, including operator management.
    SuperAdmin,
    /// Full access to order management.
    Admin,
    /// A storefront customer; never allowed into the back-office.
    Customer,
}

impl AdminRole {
    /// Whether this role may use the back-office.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "SUPER_ADMIN"),
            Self::Admin => write!(f, "ADMIN"),
            Self::Customer => write!(f, "CUSTOMER"),
        }
    }
}

impl FromStr for AdminRole {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            "ADMIN" => Ok(Self::Admin),
            "CUSTOMER" => Ok(Self::Customer),
            _ => Err(UnknownStatus {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}
