use std::collections::HashMap;
use std::env;

use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

impl ServiceStatus {
    fn from_result<E: std::fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => ServiceStatus {
                status: "ok".to_string(),
                details: None,
            },
            Err(e) => ServiceStatus {
                status: "error".to_string(),
                details: Some(e.to_string()),
            },
        }
    }
}

pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let store = ServiceStatus::from_result(state.bookings.ping().await);
    let stripe = ServiceStatus::from_result(state.payments.ping().await);

    // Any failing dependency degrades the service but the endpoint itself still answers 200.
    if store.status != "ok" || stripe.status != "ok" {
        health.status = "degraded".to_string();
    }

    health.services.insert("database".to_string(), store);
    health.services.insert("stripe".to_string(), stripe);

    HttpResponse::Ok().json(health)
}
