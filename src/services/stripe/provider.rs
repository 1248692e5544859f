use std::str::FromStr;

use async_trait::async_trait;
use stripe::{PaymentIntentId, PaymentIntentStatus, RequestStrategy, StripeError};

use crate::services::payment::{
    IntentStatus, NewPaymentIntent, PaymentError, PaymentGateway, PaymentIntentHandle,
};

#[derive(Clone)]
pub struct StripeConfig {
    pub webhook_secret: String,
}

pub struct StripeProvider {
    pub client: stripe::Client,
    has_key: bool,
}

impl StripeProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            has_key: !api_key.trim().is_empty(),
            client: stripe::Client::new(api_key),
        }
    }
}

impl From<stripe::PaymentIntent> for PaymentIntentHandle {
    fn from(intent: stripe::PaymentIntent) -> Self {
        Self {
            id: intent.id.to_string(),
            client_secret: intent.client_secret,
            amount_cents: intent.amount,
            status: intent.status.into(),
            metadata: intent.metadata,
        }
    }
}

impl From<PaymentIntentStatus> for IntentStatus {
    fn from(status: PaymentIntentStatus) -> Self {
        match status {
            PaymentIntentStatus::Canceled => IntentStatus::Canceled,
            PaymentIntentStatus::Processing => IntentStatus::Processing,
            PaymentIntentStatus::RequiresAction => IntentStatus::RequiresAction,
            PaymentIntentStatus::RequiresCapture => IntentStatus::RequiresCapture,
            PaymentIntentStatus::RequiresConfirmation => IntentStatus::RequiresConfirmation,
            PaymentIntentStatus::RequiresPaymentMethod => IntentStatus::RequiresPaymentMethod,
            PaymentIntentStatus::Succeeded => IntentStatus::Succeeded,
        }
    }
}

fn map_stripe_error(intent_id: Option<&str>, err: StripeError) -> PaymentError {
    match err {
        StripeError::Stripe(request) if request.http_status == 404 => {
            PaymentError::NotFound(intent_id.unwrap_or_default().to_string())
        }
        StripeError::Stripe(request) if (400..500).contains(&request.http_status) => {
            PaymentError::Rejected(
                request
                    .message
                    .unwrap_or_else(|| format!("status {}", request.http_status)),
            )
        }
        other => PaymentError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl PaymentGateway for StripeProvider {
    async fn create_intent(
        &self,
        intent: NewPaymentIntent,
    ) -> Result<PaymentIntentHandle, PaymentError> {
        let mut params = stripe::CreatePaymentIntent::new(intent.amount_cents, stripe::Currency::USD);
        params.description = Some(&intent.description);
        params.metadata = Some(intent.metadata.clone());

        // Replays of the same attempt return the original intent instead of charging twice.
        let client = self
            .client
            .clone()
            .with_strategy(RequestStrategy::Idempotent(intent.idempotency_key.clone()));

        log::info!(
            "Creating payment intent for {} cents (attempt {})",
            intent.amount_cents,
            intent.idempotency_key
        );

        stripe::PaymentIntent::create(&client, params)
            .await
            .map(PaymentIntentHandle::from)
            .map_err(|e| {
                log::error!("Error creating payment intent: {:?}", e);
                map_stripe_error(None, e)
            })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntentHandle, PaymentError> {
        let id = PaymentIntentId::from_str(intent_id)
            .map_err(|_| PaymentError::NotFound(intent_id.to_string()))?;

        stripe::PaymentIntent::retrieve(&self.client, &id, &[])
            .await
            .map(PaymentIntentHandle::from)
            .map_err(|e| {
                log::error!("Error retrieving payment intent {}: {:?}", intent_id, e);
                map_stripe_error(Some(intent_id), e)
            })
    }

    async fn ping(&self) -> Result<(), PaymentError> {
        if self.has_key {
            Ok(())
        } else {
            Err(PaymentError::Unavailable("STRIPE_SECRET_KEY is empty".to_string()))
        }
    }
}
