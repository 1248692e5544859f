use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::payment::PaymentError;
use crate::services::pricing_service::PricingError;
use crate::services::validation_service::FieldError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Please correct the highlighted fields")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [FieldError]>,
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl ApiError {
    /// Message shown to the caller. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Payment(PaymentError::NotFound(_)) => "Unknown payment intent".to_string(),
            ApiError::Payment(PaymentError::Rejected(_)) => {
                "The payment was declined by the payment processor".to_string()
            }
            ApiError::Payment(PaymentError::Unavailable(_)) => {
                "Payment processor unavailable".to_string()
            }
            ApiError::Store(StoreError::InvalidId(_)) => "Invalid booking ID format".to_string(),
            ApiError::Store(_) | ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Payment(PaymentError::NotFound(_)) => StatusCode::BAD_REQUEST,
            ApiError::Payment(PaymentError::Rejected(_)) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Payment(PaymentError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Store(StoreError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("Request failed: {}", self);
        }

        let fields = match self {
            ApiError::Validation(errors) => Some(errors.as_slice()),
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            success: false,
            error: self.public_message(),
            fields,
        })
    }
}
