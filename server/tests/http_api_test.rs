//! End-to-end tests of the `/api` router against in-memory doubles.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use ticketbooth_core::gateway::CaptureStatus;
use ticketbooth_core::types::{Role, User};
use ticketbooth_server::{AppState, build_router};
use ticketbooth_testing::{Harness, RESERVED_ADMIN_EMAIL, test_signer};
use tower::ServiceExt;

struct TestApp {
    h: Harness,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let h = Harness::new();
        let router = build_router(AppState::new(h.services.clone(), h.store.clone()), &[]);
        Self { h, router }
    }

    fn token_for(&self, user: &User) -> String {
        test_signer()
            .issue(&user.id.to_string(), user.role.as_str(), self.h.now())
            .expect("token")
    }

    async fn customer(&self, email: &str) -> (User, String) {
        let user = self.h.user(email, Role::User).await;
        let token = self.token_for(&user);
        (user, token)
    }

    async fn admin(&self) -> (User, String) {
        let user = self.h.user("boss@example.com", Role::Admin).await;
        let token = self.token_for(&user);
        (user, token)
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }
}

#[tokio::test]
async fn health_answers_and_echoes_correlation_id() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .expect("request");
    let response = app.router.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-correlation-id"));

    let (status, body) = app.send("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "OK", "message": "Server is running"}));
}

#[tokio::test]
async fn readiness_reflects_store_availability() {
    let app = TestApp::new();
    let (status, _) = app.send("GET", "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);

    app.h.store.set_unavailable(true);
    let (status, body) = app.send("GET", "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "UNAVAILABLE");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"name": "Alice", "email": "Alice@Example.com", "password": "secret123"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["role"], "user");

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "alice@example.com", "password": "secret123"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().expect("token").to_string();

    let (status, body) = app.send("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Alice");

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "alice@example.com", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn registration_cannot_claim_admin() {
    let app = TestApp::new();
    let (status, _) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"name": "Mallory", "email": "mallory@example.com", "password": "secret123", "role": "admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"name": "Mallory", "email": RESERVED_ADMIN_EMAIL, "password": "secret123"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_registration_lists_field_errors() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"name": "", "email": "nope", "password": "123"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/api/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, no token");

    let (status, _) = app.send("GET", "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn events_are_public_and_paginated() {
    let app = TestApp::new();
    for _ in 0..3 {
        app.h.event(100, 100).await;
    }

    let (status, body) = app.send("GET", "/api/events?page=1&limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["pages"], 2);
    assert_eq!(body["data"][0]["price"], 25.0);

    let (status, _) = app.send("GET", "/api/events?category=opera", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let event = app.h.event(10, 4).await;
    let (status, body) = app.send("GET", &format!("/api/events/{}", event.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["availableTickets"], 4);
    assert!(body["data"]["createdBy"]["email"].is_string());
}

#[tokio::test]
async fn event_writes_are_admin_only() {
    let app = TestApp::new();
    let (_, customer) = app.customer("carol@example.com").await;
    let (_, admin) = app.admin().await;
    let payload = json!({
        "title": "Jazz Night",
        "description": "Smooth sounds",
        "category": "concert",
        "date": "2026-05-01",
        "time": "20:00",
        "venue": "Blue Room",
        "location": "Lisbon",
        "price": 30,
        "totalTickets": 120
    });

    let (status, _) = app.send("POST", "/api/events", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.send("POST", "/api/events", Some(&customer), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("POST", "/api/events", Some(&admin), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["availableTickets"], 120);
    let id = body["data"]["id"].as_str().expect("id").to_string();

    let (status, body) = app
        .send(
            "PUT",
            &format!("/api/events/{id}"),
            Some(&admin),
            Some(json!({"availableTickets": 5000})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send("PUT", &format!("/api/events/{id}"), Some(&admin), Some(json!({"price": 1e17})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "price");

    let (status, body) = app
        .send("PUT", &format!("/api/events/{id}"), Some(&admin), Some(json!({"price": 35.5})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], 35.5);
    assert_eq!(body["data"]["availableTickets"], 120);

    let (status, body) = app.send("DELETE", &format!("/api/events/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event deleted");
}

#[tokio::test]
async fn booking_payment_flow_commits_inventory_once() {
    let app = TestApp::new();
    let (_, token) = app.customer("dave@example.com").await;
    let event = app.h.event(10, 10).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/bookings",
            Some(&token),
            Some(json!({"eventId": event.id.to_string(), "tickets": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["paymentStatus"], "pending");
    assert_eq!(body["data"]["totalAmount"], 75.0);
    let booking_id = body["data"]["id"].as_str().expect("id").to_string();
    assert_eq!(app.h.store.available(event.id), Some(10));

    let (status, body) = app
        .send(
            "POST",
            "/api/payments/create-intent",
            Some(&token),
            Some(json!({"bookingId": booking_id})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["orderId"].as_str().expect("order id").to_string();
    assert!(body["approvalUrl"].as_str().expect("url").contains(&order_id));

    let confirm = json!({"bookingId": booking_id, "paymentIntentId": order_id});
    let (status, body) = app
        .send("POST", "/api/payments/confirm", Some(&token), Some(confirm.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment confirmed");
    assert_eq!(body["data"]["paymentStatus"], "completed");
    assert_eq!(body["oversold"], 0);
    assert_eq!(app.h.store.available(event.id), Some(7));

    // A repeated confirm is answered without moving inventory again
    let (status, _) = app.send("POST", "/api/payments/confirm", Some(&token), Some(confirm)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.h.store.available(event.id), Some(7));

    let (status, body) = app
        .send("DELETE", &format!("/api/bookings/{booking_id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["refunded"], 3);
    assert_eq!(app.h.store.available(event.id), Some(10));
}

#[tokio::test]
async fn failed_capture_leaves_booking_pending() {
    let app = TestApp::new();
    let (_, token) = app.customer("erin@example.com").await;
    let event = app.h.event(5, 5).await;
    let (_, body) = app
        .send(
            "POST",
            "/api/bookings",
            Some(&token),
            Some(json!({"eventId": event.id.to_string(), "tickets": 2})),
        )
        .await;
    let booking_id = body["data"]["id"].as_str().expect("id").to_string();
    let (_, body) = app
        .send(
            "POST",
            "/api/payments/create-intent",
            Some(&token),
            Some(json!({"bookingId": booking_id})),
        )
        .await;
    let order_id = body["orderId"].as_str().expect("order id").to_string();

    app.h.gateway.push_capture(Ok(CaptureStatus::Other("PAYER_ACTION_REQUIRED".to_string())));
    let (status, body) = app
        .send(
            "POST",
            "/api/payments/confirm",
            Some(&token),
            Some(json!({"bookingId": booking_id, "orderId": order_id})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PAYMENT_NOT_COMPLETED");
    assert_eq!(app.h.store.available(event.id), Some(5));
}

#[tokio::test]
async fn oversized_booking_reports_availability() {
    let app = TestApp::new();
    let (_, token) = app.customer("frank@example.com").await;
    let event = app.h.event(10, 2).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/bookings",
            Some(&token),
            Some(json!({"eventId": event.id.to_string(), "tickets": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_INVENTORY");
    assert_eq!(body["available"], 2);
    assert_eq!(app.h.store.booking_count(), 0);
}

#[tokio::test]
async fn bookings_are_private_to_their_owner() {
    let app = TestApp::new();
    let (_, owner) = app.customer("grace@example.com").await;
    let (_, other) = app.customer("heidi@example.com").await;
    let (_, admin) = app.admin().await;
    let event = app.h.event(10, 10).await;

    let (_, body) = app
        .send(
            "POST",
            "/api/bookings",
            Some(&owner),
            Some(json!({"eventId": event.id.to_string(), "tickets": 1})),
        )
        .await;
    let booking_id = body["data"]["id"].as_str().expect("id").to_string();
    let uri = format!("/api/bookings/{booking_id}");

    let (status, _) = app.send("GET", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = app.send("GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], "grace@example.com");

    let (_, body) = app.send("GET", "/api/bookings", Some(&other), None).await;
    assert_eq!(body["count"], 0);
    let (_, body) = app.send("GET", "/api/bookings", Some(&admin), None).await;
    assert_eq!(body["count"], 1);

    let (status, body) = app
        .send("PUT", &uri, Some(&owner), Some(json!({"paymentStatus": "completed"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app.send("PUT", &uri, Some(&owner), Some(json!({"tickets": 4}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tickets"], 4);
    assert_eq!(body["data"]["totalAmount"], 100.0);
}

#[tokio::test]
async fn complimentary_bookings_are_admin_only() {
    let app = TestApp::new();
    let (_, guest) = app.customer("ivan@example.com").await;
    let (_, admin) = app.admin().await;
    let event = app.h.event(10, 10).await;
    let payload = json!({"eventId": event.id.to_string(), "tickets": 2, "userEmail": "ivan@example.com"});

    let (status, _) = app
        .send("POST", "/api/bookings/admin/complimentary", Some(&guest), Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send("POST", "/api/bookings/admin/complimentary", Some(&admin), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Complimentary booking created successfully");
    assert_eq!(body["data"]["paymentStatus"], "completed");
    assert_eq!(body["data"]["bookingType"], "complimentary");
    assert_eq!(app.h.store.available(event.id), Some(8));

    let (status, body) = app
        .send(
            "POST",
            "/api/bookings/admin/complimentary",
            Some(&admin),
            Some(json!({"eventId": event.id.to_string(), "tickets": 1, "userEmail": "nobody@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "USER_NOT_FOUND");

    // Reminders go to paid bookings, once
    let booking_id = app
        .send("GET", "/api/bookings", Some(&guest), None)
        .await
        .1["data"][0]["id"]
        .as_str()
        .expect("id")
        .to_string();
    let reminder = json!({"bookingId": booking_id});
    let (status, body) = app
        .send("POST", "/api/payments/send-reminder", Some(&admin), Some(reminder.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Reminder sent");
    let (status, body) = app
        .send("POST", "/api/payments/send-reminder", Some(&admin), Some(reminder))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ALREADY_SENT");
}
