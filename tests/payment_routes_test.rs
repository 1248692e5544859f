mod common;

use actix_web::test;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{crypto, Algorithm, EncodingKey};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use serial_test::serial;

use cabo_concierge_api::models::bookings::{BookingStatus, PaymentStatus};
use cabo_concierge_api::services::booking_service::{BookingService, PaymentOutcome};

use common::{bearer, draft_json, intent_json, TestApp, RESORT_ID, TEST_WEBHOOK_SECRET};

const KEY: &str = "6f1c7e8a-3b4d-4c5e-8f9a-0b1c2d3e4f5a";

/// Stripe-Signature header for `payload`: HMAC-SHA256 over `"{t}.{payload}"`, hex encoded.
fn signature_header(payload: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let key = EncodingKey::from_secret(TEST_WEBHOOK_SECRET.as_bytes());
    let signed = format!("{}.{}", timestamp, payload);
    let mac = crypto::sign(signed.as_bytes(), &key, Algorithm::HS256).unwrap();
    let hex: String = URL_SAFE_NO_PAD
        .decode(mac)
        .unwrap()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("t={},v1={}", timestamp, hex)
}

fn payment_intent_event(event_type: &str, intent_id: &str, status: &str) -> String {
    json!({
        "id": "evt_test_1",
        "object": "event",
        "created": 1700000000,
        "livemode": false,
        "pending_webhooks": 0,
        "request": null,
        "type": event_type,
        "data": {
            "object": {
                "id": intent_id,
                "object": "payment_intent",
                "amount": 42000,
                "amount_capturable": 0,
                "amount_received": 42000,
                "capture_method": "automatic",
                "confirmation_method": "automatic",
                "created": 1700000000,
                "currency": "usd",
                "livemode": false,
                "metadata": {},
                "payment_method_types": ["card"],
                "status": status
            }
        }
    })
    .to_string()
}

fn webhook_request(payload: String) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/stripe-webhook")
        .insert_header(("stripe-signature", signature_header(&payload)))
        .insert_header(("content-type", "application/json"))
        .set_payload(payload)
}

#[actix_rt::test]
#[serial]
async fn test_create_payment_intent_without_auth() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .set_json(&intent_json(420.0, KEY, None))
        .to_request();

    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), 401);
    assert_eq!(test_app.gateway.intent_count(), 0);
}

#[actix_rt::test]
#[serial]
async fn test_create_payment_intent_stores_pending_booking() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(420.0, KEY, Some(draft_json("deposit"))))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    let intent_id = body["paymentIntentId"].as_str().unwrap().to_string();
    assert!(body["clientSecret"].as_str().unwrap().starts_with(&intent_id));
    assert_eq!(body["amountDue"].as_f64(), Some(420.0));

    let confirmation = body["confirmationNumber"].as_str().unwrap();
    assert!(confirmation.starts_with("CB"));
    assert_eq!(confirmation.len(), 8);

    let booking = test_app
        .state
        .bookings
        .find_by_idempotency_key(KEY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_status, PaymentStatus::Unpaid);
    assert_eq!(booking.payment_intent_id.as_deref(), Some(intent_id.as_str()));
    assert_eq!(booking.amount_due, Decimal::from(420));
    assert_eq!(booking.total_amount, Decimal::from(1680));

    let intent = test_app.gateway.intent(&intent_id).unwrap();
    assert_eq!(intent.amount_cents, 42_000);
    assert_eq!(intent.metadata.get("idempotency_key").map(String::as_str), Some(KEY));
    assert_eq!(intent.metadata.get("confirmation_number").map(String::as_str), Some(confirmation));
    assert_eq!(intent.metadata.get("source").map(String::as_str), Some("test"));
}

#[actix_rt::test]
#[serial]
async fn test_retried_intent_request_is_idempotent() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let mut responses = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/create-payment-intent")
            .insert_header(bearer("user-1"))
            .set_json(&intent_json(1680.0, KEY, Some(draft_json("full"))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        responses.push(body);
    }

    assert_eq!(responses[0]["paymentIntentId"], responses[1]["paymentIntentId"]);
    assert_eq!(responses[0]["confirmationNumber"], responses[1]["confirmationNumber"]);
    assert_eq!(test_app.store.booking_count().await, 1);
    assert_eq!(test_app.gateway.intent_count(), 1);
}

#[actix_rt::test]
#[serial]
async fn test_intent_amount_must_match_quote() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(100.0, KEY, Some(draft_json("deposit"))))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(test_app.store.booking_count().await, 0);
    assert_eq!(test_app.gateway.intent_count(), 0);
}

#[actix_rt::test]
#[serial]
async fn test_intent_rejects_zero_amount() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(0.0, KEY, None))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Valid amount is required");
}

#[actix_rt::test]
#[serial]
async fn test_intent_without_draft_has_no_booking() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(420.0, KEY, None))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert!(body.get("confirmationNumber").is_none());
    assert_eq!(test_app.store.booking_count().await, 0);
}

#[actix_rt::test]
#[serial]
async fn test_deposit_not_offered_for_resort() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let mut draft = draft_json("deposit");
    draft["listingId"] = json!(RESORT_ID);
    draft["endDate"] = json!("2025-06-03");
    draft["guests"] = json!(2);

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(140.0, KEY, Some(draft)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 422);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["fields"][0]["field"], "paymentOption");
}

#[actix_rt::test]
#[serial]
async fn test_processor_rejection_is_reported() {
    let test_app = TestApp::new();
    test_app.gateway.set_failing(true);
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(420.0, KEY, Some(draft_json("deposit"))))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 402);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().contains("card_declined"));
}

#[actix_rt::test]
#[serial]
async fn test_webhook_requires_signature() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/stripe-webhook")
        .set_payload(r#"{"type":"payment_intent.succeeded"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
#[serial]
async fn test_webhook_rejects_bad_signature() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/stripe-webhook")
        .insert_header(("stripe-signature", "t=1700000000,v1=deadbeef"))
        .set_payload(r#"{"type":"payment_intent.succeeded"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Webhook signature validation failed");
}

#[actix_rt::test]
#[serial]
async fn test_payment_events_settle_pending_booking() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(420.0, KEY, Some(draft_json("deposit"))))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let intent_id = body["paymentIntentId"].as_str().unwrap();

    let booking =
        BookingService::apply_payment_event(&test_app.state, intent_id, PaymentOutcome::Succeeded)
            .await
            .unwrap()
            .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::DepositPaid);
    assert_eq!(booking.amount_paid, Decimal::from(420));

    // A late failure notice must not undo a confirmed booking.
    let booking =
        BookingService::apply_payment_event(&test_app.state, intent_id, PaymentOutcome::Failed)
            .await
            .unwrap()
            .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
}

#[actix_rt::test]
#[serial]
async fn test_failed_payment_event_marks_booking_failed() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(1680.0, KEY, Some(draft_json("full"))))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let intent_id = body["paymentIntentId"].as_str().unwrap();

    let booking =
        BookingService::apply_payment_event(&test_app.state, intent_id, PaymentOutcome::Failed)
            .await
            .unwrap()
            .unwrap();
    assert_eq!(booking.status, BookingStatus::Failed);
    assert_eq!(booking.payment_status, PaymentStatus::Unpaid);

    let missing =
        BookingService::apply_payment_event(&test_app.state, "pi_unknown", PaymentOutcome::Succeeded)
            .await
            .unwrap();
    assert!(missing.is_none());
}

#[actix_rt::test]
#[serial]
async fn test_signed_success_webhook_confirms_booking() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(420.0, KEY, Some(draft_json("deposit"))))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let intent_id = body["paymentIntentId"].as_str().unwrap().to_string();

    let payload = payment_intent_event("payment_intent.succeeded", &intent_id, "succeeded");
    let resp = test::call_service(&app, webhook_request(payload).to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["received"], true);

    let booking = test_app
        .state
        .bookings
        .find_by_idempotency_key(KEY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::DepositPaid);
    assert_eq!(booking.amount_paid, Decimal::from(420));
}

#[actix_rt::test]
#[serial]
async fn test_signed_failure_webhook_marks_booking_failed() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(420.0, KEY, Some(draft_json("deposit"))))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let intent_id = body["paymentIntentId"].as_str().unwrap().to_string();

    let payload = payment_intent_event(
        "payment_intent.payment_failed",
        &intent_id,
        "requires_payment_method",
    );
    let resp = test::call_service(&app, webhook_request(payload).to_request()).await;
    assert_eq!(resp.status(), 200);

    let booking = test_app
        .state
        .bookings
        .find_by_idempotency_key(KEY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Failed);
    assert_eq!(booking.payment_status, PaymentStatus::Unpaid);
}

#[actix_rt::test]
#[serial]
async fn test_signed_unhandled_webhook_is_acknowledged() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/create-payment-intent")
        .insert_header(bearer("user-1"))
        .set_json(&intent_json(420.0, KEY, Some(draft_json("deposit"))))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let intent_id = body["paymentIntentId"].as_str().unwrap().to_string();

    let payload = payment_intent_event(
        "payment_intent.created",
        &intent_id,
        "requires_payment_method",
    );
    let resp = test::call_service(&app, webhook_request(payload).to_request()).await;
    assert_eq!(resp.status(), 200);

    let booking = test_app
        .state
        .bookings
        .find_by_idempotency_key(KEY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
}

#[actix_rt::test]
#[serial]
async fn test_webhook_with_tampered_payload_is_rejected() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let payload = payment_intent_event("payment_intent.succeeded", "pi_test_1", "succeeded");
    let header = signature_header(&payload);
    // Same payload and timestamp, tampered amount.
    let tampered = payload.replace("42000", "1");

    let req = test::TestRequest::post()
        .uri("/api/stripe-webhook")
        .insert_header(("stripe-signature", header))
        .set_payload(tampered)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}
