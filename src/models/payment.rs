use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bookings::BookingRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentInput {
    /// Amount due now, in dollars.
    pub amount: Decimal,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub idempotency_key: Uuid,
    /// Draft booking; when present a pending booking is stored before charging.
    pub booking: Option<BookingRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount_due: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_number: Option<String>,
}
