//! In-process test harness for the Dewdrop back-office.
//!
//! Builds the real admin router over a [`MemoryOrderStore`], an in-memory
//! session store, and a [`FakeGateway`] that records every refund it is
//! asked to execute. Requests go through `tower::ServiceExt::oneshot`, so no
//! database or network is needed.
//!
//! ```rust,ignore
//! let app = TestApp::new(demo_orders());
//! let (status, body) = app.get("/api/admin/orders", Some(&app.admin_token())).await;
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc, clippy::must_use_candidate)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::Notify;
use tower::ServiceExt;

use dewdrop_admin::AppState;
use dewdrop_admin::db::MemoryOrderStore;
use dewdrop_admin::middleware::create_session_layer;
use dewdrop_admin::models::{Customer, LineItem, Order};
use dewdrop_admin::services::{
    OrderService, PaymentError, PaymentGateway, ProviderRefund, RefundRequest, TokenKeys,
};
use dewdrop_core::{
    AdminRole, CurrencyCode, Email, FulfillmentStatus, LineItemId, OrderId, OrderStatus,
    PaymentStatus,
};

/// Signing secret shared by the app under test and [`TestApp::token`].
pub const TEST_SECRET: &str = "t9#Kd2!vQm5@Xr8$Lw3^Pz6&Hb1*Ny4%";

// =============================================================================
// Payment gateway double
// =============================================================================

/// Holds a refund inside the provider call until the test releases it.
#[derive(Debug, Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

/// Payment gateway that records requests instead of moving money.
#[derive(Debug, Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<RefundRequest>>,
    decline_with: Mutex<Option<String>>,
    gate: Option<Gate>,
}

impl FakeGateway {
    /// A gateway that parks every refund until [`Self::release`] is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Gate::default()),
            ..Self::default()
        }
    }

    /// Decline every subsequent refund with `message`.
    pub fn decline_with(&self, message: &str) {
        *self.decline_with.lock().unwrap() = Some(message.to_string());
    }

    /// Accept refunds again after [`Self::decline_with`].
    pub fn accept(&self) {
        *self.decline_with.lock().unwrap() = None;
    }

    /// Refund requests received so far, in order.
    pub fn calls(&self) -> Vec<RefundRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until a refund has reached the provider.
    pub async fn entered(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notified().await;
        }
    }

    /// Let a parked refund continue.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.release.notify_one();
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn refund(&self, request: &RefundRequest) -> Result<ProviderRefund, PaymentError> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let decline = self.decline_with.lock().unwrap().clone();
        match decline {
            Some(message) => Err(PaymentError::Declined(message)),
            None => Ok(ProviderRefund {
                id: format!("re_test_{call_number}"),
                status: "succeeded".to_string(),
            }),
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// A 500.00 order: four units at 120.00 plus 20.00 shipping.
///
/// Orders with higher ids are created later.
pub fn order(id: i64, number: &str, status: OrderStatus, payment: PaymentStatus) -> Order {
    let created_at = base_time() + Duration::hours(id);
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
        payment_reference: payment.is_captured().then(|| format!("pi_{number}")),
        tracking_number: None,
        tracking_company: None,
        internal_notes: None,
        customer: Customer {
            user_id: None,
            name: format!("Customer {number}"),
            email: Email::parse(&format!("buyer{number}@example.com")).unwrap(),
            phone: None,
        },
        shipping_address: None,
        billing_address: None,
        items: vec![LineItem {
            id: LineItemId::new(id * 10),
            product_id: None,
            variant_id: None,
            title: "Radiance Ritual Set".to_string(),
            sku: Some("SET-RADIANCE".to_string()),
            quantity: 4,
            unit_price: Decimal::new(120, 0),
            subtotal: Decimal::new(480, 0),
        }],
        refunds: Vec::new(),
        version: 1,
        created_at,
        updated_at: created_at,
    }
}

/// The three documented demo orders.
pub fn demo_orders() -> Vec<Order> {
    vec![
        order(1, "1001", OrderStatus::Confirmed, PaymentStatus::Paid),
        order(2, "1002", OrderStatus::Pending, PaymentStatus::Pending),
        order(3, "1003", OrderStatus::Processing, PaymentStatus::Paid),
    ]
}

/// Parse a decimal from a JSON string or number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

// =============================================================================
// App under test
// =============================================================================

/// The admin router wired to in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryOrderStore>,
    pub gateway: Arc<FakeGateway>,
    keys: TokenKeys,
}

impl TestApp {
    pub fn new(orders: Vec<Order>) -> Self {
        Self::with_gateway(orders, FakeGateway::default())
    }

    pub fn with_gateway(orders: Vec<Order>, gateway: FakeGateway) -> Self {
        let store = Arc::new(MemoryOrderStore::with_orders(orders));
        let gateway = Arc::new(gateway);
        let secret = SecretString::from(TEST_SECRET);

        let state = AppState::new(
            "http://admin.test",
            TokenKeys::from_secret(&secret),
            OrderService::new(store.clone(), gateway.clone()),
        );
        let session_layer = create_session_layer(tower_sessions::MemoryStore::default(), false);

        Self {
            router: dewdrop_admin::app(state, session_layer),
            store,
            gateway,
            keys: TokenKeys::from_secret(&secret),
        }
    }

    /// Token for `role`, valid for `ttl`.
    pub fn token(&self, role: AdminRole, ttl: Duration) -> String {
        self.keys
            .issue("op_test", "ops@dewdrop.test", "Test Operator", role, ttl)
            .unwrap()
    }

    /// A valid staff token.
    pub fn admin_token(&self) -> String {
        self.token(AdminRole::Admin, Duration::hours(1))
    }

    /// Send a request and decode the JSON body (`Value::Null` if not JSON).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn put_json(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn post_json(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Current stored state of an order.
    pub async fn stored(&self, id: i64) -> Order {
        use dewdrop_admin::db::OrderStore;
        self.store.get(OrderId::new(id)).await.unwrap().unwrap()
    }
}
