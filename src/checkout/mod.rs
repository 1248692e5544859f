//! Client-side checkout: the form, payment and confirmation steps a guest walks
//! through, driven against any [`BookingBackend`].

pub mod client;
pub mod flow;
pub mod selector;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::bookings::{BookingInput, BookingResponse};
use crate::models::payment::{PaymentIntentInput, PaymentIntentResponse};
use crate::services::validation_service::FieldError;

pub use client::BookingApiClient;
pub use flow::{CheckoutFlow, CheckoutStep, PendingPayment};
pub use selector::PaymentOptionSelector;

/// The signed-in guest. Passed explicitly to every backend call.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub auth_token: String,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("Action not available in the {0:?} step")]
    WrongStep(CheckoutStep),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Could not read server response: {0}")]
    Decode(String),
    #[error("Payment intent mismatch: {0}")]
    IntentMismatch(String),
}

impl CheckoutError {
    /// Text safe to show the guest. Processor and transport details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Validation(_) => "Please correct the highlighted fields.".to_string(),
            CheckoutError::WrongStep(_) => "Please complete the current step first.".to_string(),
            CheckoutError::Network(_) => {
                "We couldn't reach the booking service. Please check your connection and try again."
                    .to_string()
            }
            CheckoutError::Rejected { status, .. } if *status == 401 => {
                "Your session has expired. Please sign in again.".to_string()
            }
            CheckoutError::Rejected { .. }
            | CheckoutError::Decode(_)
            | CheckoutError::IntentMismatch(_) => {
                "We couldn't process your request. Please try again.".to_string()
            }
        }
    }
}

#[async_trait]
pub trait BookingBackend: Send + Sync {
    async fn create_payment_intent(
        &self,
        session: &Session,
        input: &PaymentIntentInput,
    ) -> Result<PaymentIntentResponse, CheckoutError>;

    async fn submit_booking(
        &self,
        session: &Session,
        input: &BookingInput,
    ) -> Result<BookingResponse, CheckoutError>;
}
