use actix_web::{web, HttpRequest, HttpResponse};
use stripe::{EventObject, EventType, Webhook};

use crate::error::ApiError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::payment::PaymentIntentInput;
use crate::services::booking_service::{BookingService, PaymentOutcome};
use crate::services::stripe::StripeConfig;
use crate::state::AppState;

pub async fn create_payment_intent(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    input: web::Json<PaymentIntentInput>,
) -> Result<HttpResponse, ApiError> {
    let response = BookingService::create_payment_intent(&state, &user, input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn handle_stripe_webhook(
    req: HttpRequest,
    payload: web::Bytes,
    state: web::Data<AppState>,
    stripe_config: web::Data<StripeConfig>,
) -> Result<HttpResponse, ApiError> {
    let signature = req
        .headers()
        .get("stripe-signature")
        .and_then(|sig| sig.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing stripe-signature header".to_string()))?;

    let payload_str = std::str::from_utf8(&payload)
        .map_err(|_| ApiError::BadRequest("Invalid payload encoding".to_string()))?;

    let event = Webhook::construct_event(payload_str, signature, &stripe_config.webhook_secret)
        .map_err(|e| {
            log::warn!("Webhook error: {:?}", e);
            ApiError::BadRequest("Webhook signature validation failed".to_string())
        })?;

    let outcome = match event.type_ {
        EventType::PaymentIntentSucceeded => Some(PaymentOutcome::Succeeded),
        EventType::PaymentIntentPaymentFailed => Some(PaymentOutcome::Failed),
        _ => None,
    };

    match (outcome, event.data.object) {
        (Some(outcome), EventObject::PaymentIntent(payment_intent)) => {
            let intent_id = payment_intent.id.to_string();
            log::info!("Payment intent {} reported {:?}", intent_id, outcome);
            BookingService::apply_payment_event(&state, &intent_id, outcome).await?;
        }
        (Some(_), _) => {
            return Err(ApiError::BadRequest(
                "Invalid payment intent object".to_string(),
            ));
        }
        (None, _) => log::debug!("Unhandled event type: {:?}", event.type_),
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}
