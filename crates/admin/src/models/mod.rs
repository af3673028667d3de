//! Domain models for the back-office.

pub mod order;
pub mod session;

pub use order::{
    Address, CurrencyRevenue, Customer, LineItem, NewRefund, Order, OrderChanges, OrderFilter, OrderPage,
    OrderStatistics, OrderUpdate, PageRequest, Pagination, RefundInput, RefundRecord,
    StatisticsRange,
};
pub use session::{CurrentAdmin, Flash, FlashKind, keys as session_keys};
