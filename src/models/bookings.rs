use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::quote::PriceBreakdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOption {
    Deposit,
    Full,
}

impl PaymentOption {
    pub fn payment_status(self) -> PaymentStatus {
        match self {
            PaymentOption::Deposit => PaymentStatus::DepositPaid,
            PaymentOption::Full => PaymentStatus::Paid,
        }
    }

    /// Amount charged now. `None` if the quote has no deposit to pay.
    pub fn amount_due(self, quote: &PriceBreakdown) -> Option<Decimal> {
        match self {
            PaymentOption::Deposit => quote.deposit_amount,
            PaymentOption::Full => Some(quote.total_price),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    DepositPaid,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub listing_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: u32,
    pub contact: Contact,
    pub special_requests: Option<String>,
    pub payment_option: PaymentOption,
}

/// Body of `POST /api/bookings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingInput {
    #[serde(alias = "villaId")]
    pub listing_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: u32,
    pub total_amount: Decimal,
    pub special_requests: Option<String>,
    pub payment_method: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_option: Option<PaymentOption>,
    pub idempotency_key: Uuid,
    pub payment_intent_id: Option<String>,
}

impl BookingInput {
    pub fn contact(&self) -> Contact {
        Contact {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    /// The option is explicit when sent, otherwise inferred from the claimed status.
    pub fn resolved_payment_option(&self) -> PaymentOption {
        match (self.payment_option, self.payment_status) {
            (Some(option), _) => option,
            (None, Some(PaymentStatus::DepositPaid)) => PaymentOption::Deposit,
            _ => PaymentOption::Full,
        }
    }

    pub fn to_request(&self) -> BookingRequest {
        BookingRequest {
            listing_id: self.listing_id,
            start_date: self.start_date,
            end_date: self.end_date,
            guests: self.guests,
            contact: self.contact(),
            special_requests: self.special_requests.clone(),
            payment_option: self.resolved_payment_option(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub listing_id: i64,
    pub confirmation_number: String,
    pub idempotency_key: String,
    pub payment_intent_id: Option<String>,
    pub contact: Contact,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: u32,
    pub special_requests: Option<String>,
    pub payment_option: PaymentOption,
    pub total_amount: Decimal,
    /// Charged at checkout: the deposit or the full total.
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_settled(&self) -> bool {
        self.status == BookingStatus::Confirmed && self.payment_status != PaymentStatus::Unpaid
    }
}

/// What the API hands back for a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub id: String,
    pub confirmation_number: String,
    pub listing_id: i64,
    pub booking_date: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: u32,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
}

impl From<&Booking> for BookingSummary {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id.map(|id| id.to_hex()).unwrap_or_default(),
            confirmation_number: booking.confirmation_number.clone(),
            listing_id: booking.listing_id,
            booking_date: booking.created_at,
            start_date: booking.start_date,
            end_date: booking.end_date,
            guests: booking.guests,
            status: booking.status,
            payment_status: booking.payment_status,
            total_amount: booking.total_amount,
            amount_due: booking.amount_due,
            amount_paid: booking.amount_paid,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub success: bool,
    pub booking: BookingSummary,
}
