#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use actix_web::{web, App, HttpServer};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use cabo_concierge_api::db::InMemoryStore;
use cabo_concierge_api::middleware::auth::{issue_token, JwtConfig};
use cabo_concierge_api::models::listing::{Listing, ListingKind};
use cabo_concierge_api::routes;
use cabo_concierge_api::services::payment::{
    IntentStatus, NewPaymentIntent, PaymentError, PaymentGateway, PaymentIntentHandle,
};
use cabo_concierge_api::services::stripe::StripeConfig;
use cabo_concierge_api::state::AppState;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";
pub const VILLA_ID: i64 = 1;
pub const RESORT_ID: i64 = 2;

/// Payment processor stand-in. Intents are keyed by idempotency key like Stripe's.
#[derive(Default)]
pub struct FakeGateway {
    intents: Mutex<HashMap<String, PaymentIntentHandle>>,
    by_key: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl FakeGateway {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_status(&self, intent_id: &str, status: IntentStatus) {
        if let Some(intent) = self.intents.lock().unwrap().get_mut(intent_id) {
            intent.status = status;
        }
    }

    pub fn mark_succeeded(&self, intent_id: &str) {
        self.set_status(intent_id, IntentStatus::Succeeded);
    }

    pub fn intent(&self, intent_id: &str) -> Option<PaymentIntentHandle> {
        self.intents.lock().unwrap().get(intent_id).cloned()
    }

    pub fn intent_count(&self) -> usize {
        self.intents.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(
        &self,
        intent: NewPaymentIntent,
    ) -> Result<PaymentIntentHandle, PaymentError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PaymentError::Rejected("card_declined".to_string()));
        }

        let mut by_key = self.by_key.lock().unwrap();
        let mut intents = self.intents.lock().unwrap();
        if let Some(id) = by_key.get(&intent.idempotency_key) {
            if let Some(existing) = intents.get(id) {
                return Ok(existing.clone());
            }
        }

        let id = format!("pi_test_{}", intents.len() + 1);
        let handle = PaymentIntentHandle {
            id: id.clone(),
            client_secret: Some(format!("{}_secret_abc", id)),
            amount_cents: intent.amount_cents,
            status: IntentStatus::RequiresPaymentMethod,
            metadata: intent.metadata,
        };
        by_key.insert(intent.idempotency_key, id.clone());
        intents.insert(id, handle.clone());
        Ok(handle)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntentHandle, PaymentError> {
        self.intent(intent_id)
            .ok_or_else(|| PaymentError::NotFound(intent_id.to_string()))
    }

    async fn ping(&self) -> Result<(), PaymentError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PaymentError::Unavailable("fake gateway down".to_string()))
        } else {
            Ok(())
        }
    }
}

pub fn villa() -> Listing {
    Listing {
        id: VILLA_ID,
        title: "Villa Pacifica".to_string(),
        kind: ListingKind::Villa,
        nightly_rate: Decimal::from(300),
        maximum_guests: 8,
        location: "Cabo San Lucas".to_string(),
    }
}

pub fn resort() -> Listing {
    Listing {
        id: RESORT_ID,
        title: "Marina Resort".to_string(),
        kind: ListingKind::Resort,
        nightly_rate: Decimal::from(250),
        maximum_guests: 4,
        location: "San José del Cabo".to_string(),
    }
}

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::with_listings(vec![villa(), resort()]));
        let gateway = Arc::new(FakeGateway::default());
        let state = AppState::new(store.clone(), store.clone(), gateway.clone());
        Self {
            store,
            gateway,
            state,
        }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        build_app(self.state.clone())
    }

    /// Runs the API on an ephemeral port for tests that go over real HTTP.
    pub fn spawn_server(&self) -> std::io::Result<SocketAddr> {
        let state = self.state.clone();
        let server = HttpServer::new(move || build_app(state.clone()))
            .workers(1)
            .bind(("127.0.0.1", 0))?;
        let addr = server.addrs()[0];
        actix_rt::spawn(server.run());
        Ok(addr)
    }
}

pub fn build_app(
    state: AppState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(web::Data::new(JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
        }))
        .app_data(web::Data::new(StripeConfig {
            webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
        }))
        .configure(routes::configure)
}

pub fn token_for(user_id: &str) -> String {
    issue_token(
        TEST_JWT_SECRET,
        &format!("{}@example.com", user_id),
        user_id,
        chrono::Duration::hours(1),
    )
    .unwrap()
}

pub fn bearer(user_id: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token_for(user_id)))
}

pub fn contact_json() -> Value {
    json!({
        "firstName": "Ana",
        "lastName": "Lopez",
        "email": "ana@example.com",
        "phone": "6241234567"
    })
}

/// Draft for the villa: 2025-06-01 to 2025-06-06, 4 guests.
pub fn draft_json(payment_option: &str) -> Value {
    json!({
        "listingId": VILLA_ID,
        "startDate": "2025-06-01",
        "endDate": "2025-06-06",
        "guests": 4,
        "contact": contact_json(),
        "specialRequests": "Late check-in",
        "paymentOption": payment_option
    })
}

pub fn intent_json(amount: f64, key: &str, booking: Option<Value>) -> Value {
    let mut body = json!({
        "amount": amount,
        "description": "Villa Pacifica (5 nights)",
        "metadata": { "source": "test" },
        "idempotencyKey": key
    });
    if let Some(booking) = booking {
        body["booking"] = booking;
    }
    body
}

pub fn booking_json(key: &str, intent_id: &str, payment_status: &str, option: &str) -> Value {
    json!({
        "villaId": VILLA_ID,
        "firstName": "Ana",
        "lastName": "Lopez",
        "email": "ana@example.com",
        "phone": "6241234567",
        "startDate": "2025-06-01",
        "endDate": "2025-06-06",
        "guests": 4,
        "totalAmount": 1680,
        "specialRequests": "Late check-in",
        "paymentMethod": "card",
        "paymentStatus": payment_status,
        "paymentOption": option,
        "idempotencyKey": key,
        "paymentIntentId": intent_id
    })
}
