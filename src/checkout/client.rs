use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};

use super::{BookingBackend, CheckoutError, Session};
use crate::models::bookings::{BookingInput, BookingResponse};
use crate::models::listing::{Listing, ListingSummary};
use crate::models::payment::{PaymentIntentInput, PaymentIntentResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

impl From<reqwest::Error> for CheckoutError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CheckoutError::Decode(err.to_string())
        } else {
            CheckoutError::Network(err.to_string())
        }
    }
}

/// HTTP backend for [`CheckoutFlow`](super::CheckoutFlow), talking to the booking API.
#[derive(Clone)]
pub struct BookingApiClient {
    http: Client,
    base_url: String,
}

impl BookingApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CheckoutError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_listing(&self, listing_id: i64) -> Result<Listing, CheckoutError> {
        let response = self
            .http
            .get(self.url(&format!("/api/listings/{}", listing_id)))
            .send()
            .await?;
        let summary: ListingSummary = Self::read(response).await?;
        Ok(summary.into())
    }

    async fn post<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        body: &T,
    ) -> Result<R, CheckoutError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&session.auth_token)
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn read<R: DeserializeOwned>(response: Response) -> Result<R, CheckoutError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<R>().await?);
        }

        // Error bodies are `{ "success": false, "error": "..." }`; fall back to the reason phrase.
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
        log::warn!("Booking API returned {}: {}", status, message);

        Err(CheckoutError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl BookingBackend for BookingApiClient {
    async fn create_payment_intent(
        &self,
        session: &Session,
        input: &PaymentIntentInput,
    ) -> Result<PaymentIntentResponse, CheckoutError> {
        self.post(session, "/api/create-payment-intent", input).await
    }

    async fn submit_booking(
        &self,
        session: &Session,
        input: &BookingInput,
    ) -> Result<BookingResponse, CheckoutError> {
        self.post(session, "/api/bookings", input).await
    }
}
