use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment intent not found: {0}")]
    NotFound(String),
    #[error("Payment processor rejected the request: {0}")]
    Rejected(String),
    #[error("Payment processor unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    RequiresCapture,
    Processing,
    Succeeded,
    Canceled,
}

impl IntentStatus {
    /// Money is secured: captured, or authorized and awaiting capture.
    pub fn is_paid(self) -> bool {
        matches!(self, IntentStatus::Succeeded | IntentStatus::RequiresCapture)
    }
}

#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    /// Smallest currency unit (cents).
    pub amount_cents: i64,
    pub description: String,
    pub metadata: HashMap<String, String>,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentHandle {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount_cents: i64,
    pub status: IntentStatus,
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, intent: NewPaymentIntent)
        -> Result<PaymentIntentHandle, PaymentError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntentHandle, PaymentError>;

    /// Cheap reachability check for the health endpoint.
    async fn ping(&self) -> Result<(), PaymentError>;
}
