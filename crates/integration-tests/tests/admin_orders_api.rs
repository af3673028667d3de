//! Back-office order API: listing, filtering, status updates, statistics,
//! and authentication.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use axum::http::StatusCode;
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::json;

use dewdrop_core::{AdminRole, CurrencyCode, OrderStatus, PaymentStatus};
use dewdrop_integration_tests::{TestApp, decimal, demo_orders, order};

fn many_orders() -> Vec<dewdrop_admin::models::Order> {
    let statuses = [
        (OrderStatus::Pending, PaymentStatus::Pending),
        (OrderStatus::Confirmed, PaymentStatus::Paid),
        (OrderStatus::Shipped, PaymentStatus::Paid),
        (OrderStatus::Cancelled, PaymentStatus::Failed),
    ];
    (1..=23)
        .map(|i| {
            let (status, payment) = statuses[usize::try_from(i).unwrap() % statuses.len()];
            order(i, &(2000 + i).to_string(), status, payment)
        })
        .collect()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new(demo_orders());
    let (status, body) = app.get("/api/admin/orders", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_bad_and_expired_tokens_are_unauthorized() {
    let app = TestApp::new(demo_orders());

    let (status, _) = app.get("/api/admin/orders", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = app.token(AdminRole::Admin, Duration::hours(-2));
    let (status, body) = app.get("/api/admin/orders", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token has expired");

    let other = dewdrop_admin::services::TokenKeys::from_secret(&secrecy::SecretString::from(
        "another-Secret-entirely-7x!Qp2#Lm9",
    ))
    .issue("op", "ops@dewdrop.test", "Ops", AdminRole::Admin, Duration::hours(1))
    .unwrap();
    let (status, _) = app.get("/api/admin/orders", Some(&other)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_customer_token_is_forbidden() {
    let app = TestApp::new(demo_orders());
    let customer = app.token(AdminRole::Customer, Duration::hours(1));

    let (status, body) = app.get("/api/admin/orders", Some(&customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .post_json("/api/admin/orders/1/refund", &customer, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new(demo_orders());
    let (status, _) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_is_newest_first_with_pagination() {
    let app = TestApp::new(demo_orders());
    let token = app.admin_token();

    let (status, body) = app.get("/api/admin/orders", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let numbers: Vec<_> = body["data"]["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["orderNumber"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(numbers, ["1003", "1002", "1001"]);

    let pagination = &body["data"]["pagination"];
    assert_eq!(pagination["page"], 1);
    assert_eq!(pagination["limit"], 20);
    assert_eq!(pagination["total"], 3);
    assert_eq!(pagination["totalPages"], 1);
}

#[tokio::test]
async fn test_filters_are_sound() {
    let app = TestApp::new(many_orders());
    let token = app.admin_token();

    let (status, body) = app
        .get(
            "/api/admin/orders?status=SHIPPED&paymentStatus=PAID&limit=100",
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let orders = body["data"]["orders"].as_array().unwrap();
    assert!(!orders.is_empty());
    for o in orders {
        assert_eq!(o["status"], "SHIPPED");
        assert_eq!(o["paymentStatus"], "PAID");
    }
    assert_eq!(body["data"]["pagination"]["total"], orders.len());
}

#[tokio::test]
async fn test_search_matches_number_email_and_name() {
    let app = TestApp::new(demo_orders());
    let token = app.admin_token();

    for query in ["%231002", "1002", "BUYER1002%40example.com", "customer%201002"] {
        let (status, body) = app
            .get(&format!("/api/admin/orders?search={query}"), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK, "query {query}");
        let orders = body["data"]["orders"].as_array().unwrap();
        assert_eq!(orders.len(), 1, "query {query}");
        assert_eq!(orders[0]["orderNumber"], "1002");
    }
}

#[tokio::test]
async fn test_pages_cover_every_order_exactly_once() {
    let app = TestApp::new(many_orders());
    let token = app.admin_token();

    let mut seen = HashSet::new();
    let mut page = 1;
    loop {
        let (status, body) = app
            .get(&format!("/api/admin/orders?page={page}&limit=5"), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pagination"]["total"], 23);
        assert_eq!(body["data"]["pagination"]["totalPages"], 5);

        let orders = body["data"]["orders"].as_array().unwrap();
        if orders.is_empty() {
            break;
        }
        assert!(orders.len() <= 5);
        for o in orders {
            assert!(seen.insert(o["id"].as_i64().unwrap()), "duplicate {}", o["id"]);
        }
        page += 1;
    }

    assert_eq!(seen.len(), 23);
    assert_eq!(page, 6);
}

#[tokio::test]
async fn test_limit_is_clamped_and_empty_result_has_zero_pages() {
    let app = TestApp::new(many_orders());
    let token = app.admin_token();

    let (_, body) = app
        .get("/api/admin/orders?limit=1000", Some(&token))
        .await;
    assert_eq!(body["data"]["pagination"]["limit"], 100);

    let (status, body) = app
        .get("/api/admin/orders?search=nobody-matches", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 0);
    assert_eq!(body["data"]["pagination"]["totalPages"], 0);
}

#[tokio::test]
async fn test_invalid_filter_values_are_rejected() {
    let app = TestApp::new(demo_orders());
    let token = app.admin_token();

    for query in ["status=LOST", "paymentStatus=maybe", "page=abc"] {
        let (status, body) = app
            .get(&format!("/api/admin/orders?{query}"), Some(&token))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "query {query}");
        assert_eq!(body["success"], false);
    }
}

// ============================================================================
// Detail
// ============================================================================

#[tokio::test]
async fn test_detail_and_unknown_order() {
    let app = TestApp::new(demo_orders());
    let token = app.admin_token();

    let (status, body) = app.get("/api/admin/orders/1", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orderNumber"], "1001");
    assert_eq!(body["data"]["items"][0]["quantity"], 4);
    assert_eq!(decimal(&body["data"]["totalAmount"]), Decimal::new(500, 0));

    for id in ["999", "abc"] {
        let (status, body) = app
            .get(&format!("/api/admin/orders/{id}"), Some(&token))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Order not found");
    }
}

// ============================================================================
// Status updates
// ============================================================================

#[tokio::test]
async fn test_status_update_follows_state_machine() {
    let app = TestApp::new(demo_orders());
    let token = app.admin_token();

    let (status, body) = app
        .put_json(
            "/api/admin/orders/1/status",
            &token,
            json!({
                "status": "PROCESSING",
                "trackingNumber": "  1Z999  ",
                "internalNotes": "gift wrap",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PROCESSING");
    assert_eq!(body["data"]["trackingNumber"], "1Z999");
    assert_eq!(body["data"]["version"], 2);

    let (status, body) = app
        .put_json(
            "/api/admin/orders/1/status",
            &token,
            json!({ "status": "SHIPPED", "fulfillmentStatus": "FULFILLED" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "SHIPPED");
    assert_eq!(body["data"]["fulfillmentStatus"], "FULFILLED");

    let stored = app.stored(1).await;
    assert_eq!(stored.status, OrderStatus::Shipped);
    assert_eq!(stored.internal_notes.as_deref(), Some("gift wrap"));
}

#[tokio::test]
async fn test_illegal_transitions_are_unprocessable() {
    let app = TestApp::new(demo_orders());
    let token = app.admin_token();

    // Skipping ahead from PENDING.
    let (status, body) = app
        .put_json(
            "/api/admin/orders/2/status",
            &token,
            json!({ "status": "DELIVERED" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    // Processing an unpaid order.
    let (status, _) = app
        .put_json(
            "/api/admin/orders/2/status",
            &token,
            json!({ "status": "PROCESSING" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Refunded is reached only through the refund endpoint.
    let (status, _) = app
        .put_json(
            "/api/admin/orders/1/status",
            &token,
            json!({ "status": "REFUNDED", "paymentStatus": "REFUNDED" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let untouched = app.stored(2).await;
    assert_eq!(untouched.status, OrderStatus::Pending);
    assert_eq!(untouched.version, 1);
}

#[tokio::test]
async fn test_status_update_rejects_malformed_body() {
    let app = TestApp::new(demo_orders());
    let token = app.admin_token();

    let (status, _) = app
        .put_json(
            "/api/admin/orders/1/status",
            &token,
            json!({ "status": "TELEPORTED" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stored(1).await.version, 1);
}

// ============================================================================
// Statistics
// ============================================================================

#[tokio::test]
async fn test_statistics_reflect_refunds() {
    let app = TestApp::new(demo_orders());
    let token = app.admin_token();

    let (status, body) = app
        .get("/api/admin/orders/statistics", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"]["statistics"];
    assert_eq!(stats["totalOrders"], 3);
    assert_eq!(stats["pendingOrders"], 1);
    assert_eq!(stats["refundedOrders"], 0);
    assert_eq!(decimal(&stats["totalRevenue"]), Decimal::new(1000, 0));

    let (status, _) = app
        .post_json(
            "/api/admin/orders/3/refund",
            &token,
            json!({ "amount": "200" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .get("/api/admin/orders/statistics", Some(&token))
        .await;
    let stats = &body["data"]["statistics"];
    assert_eq!(stats["refundedOrders"], 1);
    assert_eq!(decimal(&stats["totalRevenue"]), Decimal::new(800, 0));
}

#[tokio::test]
async fn test_statistics_never_add_currencies_together() {
    let mut eur = order(2, "1002", OrderStatus::Confirmed, PaymentStatus::Paid);
    eur.currency = CurrencyCode::EUR;
    let app = TestApp::new(vec![
        order(1, "1001", OrderStatus::Confirmed, PaymentStatus::Paid),
        eur,
    ]);

    let (status, body) = app
        .get("/api/admin/orders/statistics", Some(&app.admin_token()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"]["statistics"];
    assert_eq!(stats["totalOrders"], 2);
    assert_eq!(decimal(&stats["totalRevenue"]), Decimal::new(500, 0));

    let by_currency = stats["revenueByCurrency"].as_array().unwrap();
    assert_eq!(by_currency.len(), 2);
    assert_eq!(by_currency[0]["currency"], "EUR");
    assert_eq!(decimal(&by_currency[0]["amount"]), Decimal::new(500, 0));
    assert_eq!(by_currency[1]["currency"], "USD");
    assert_eq!(decimal(&by_currency[1]["amount"]), Decimal::new(500, 0));
}

#[tokio::test]
async fn test_statistics_date_range() {
    let app = TestApp::new(demo_orders());
    let token = app.admin_token();

    // Fixture orders are created on 2026-03-01.
    let (status, body) = app
        .get(
            "/api/admin/orders/statistics?from=2026-03-02&to=2026-03-31",
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["statistics"]["totalOrders"], 0);

    let (_, body) = app
        .get(
            "/api/admin/orders/statistics?from=2026-03-01&to=2026-03-01",
            Some(&token),
        )
        .await;
    assert_eq!(body["data"]["statistics"]["totalOrders"], 3);

    let (status, _) = app
        .get(
            "/api/admin/orders/statistics?from=2026-03-31&to=2026-03-01",
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
