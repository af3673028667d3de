//! Per-order refund locks.
//!
//! At most one refund per order may be in flight inside this process. A
//! second submission for the same order is turned away immediately rather
//! than queued; the optimistic version check in the store covers writers in
//! other processes.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use dewdrop_core::OrderId;

/// Table of orders with a refund in progress.
#[derive(Debug, Clone, Default)]
pub struct RefundLocks {
    held: Arc<DashMap<OrderId, ()>>,
}

impl RefundLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `order_id`, or `None` if it is already held.
    ///
    /// The lock is released when the returned guard is dropped.
    #[must_use]
    pub fn try_acquire(&self, order_id: OrderId) -> Option<RefundGuard> {
        match self.held.entry(order_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(RefundGuard {
                    held: Arc::clone(&self.held),
                    order_id,
                })
            }
        }
    }

    /// Whether a refund for `order_id` is in progress.
    #[must_use]
    pub fn is_held(&self, order_id: OrderId) -> bool {
        self.held.contains_key(&order_id)
    }
}

/// Releases its order's refund lock on drop.
#[derive(Debug)]
pub struct RefundGuard {
    held: Arc<DashMap<OrderId, ()>>,
    order_id: OrderId,
}

impl Drop for RefundGuard {
    fn drop(&mut self) {
        self.held.remove(&self.order_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let locks = RefundLocks::new();
        let id = OrderId::new(1001);

        let guard = locks.try_acquire(id);
        assert!(guard.is_some());
        assert!(locks.is_held(id));
        assert!(locks.try_acquire(id).is_none());

        // Other orders are independent.
        assert!(locks.try_acquire(OrderId::new(1002)).is_some());

        drop(guard);
        assert!(!locks.is_held(id));
        assert!(locks.try_acquire(id).is_some());
    }
}
