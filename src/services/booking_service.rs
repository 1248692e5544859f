use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::db::StoreError;
use crate::error::ApiError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::{
    bookings::{
        Booking, BookingInput, BookingRequest, BookingStatus, PaymentOption, PaymentStatus,
    },
    listing::Listing,
    payment::{PaymentIntentInput, PaymentIntentResponse},
    quote::PriceBreakdown,
};
use crate::services::{
    confirmation::generate_confirmation_number,
    payment::{NewPaymentIntent, PaymentError},
    pricing_service::PricingService,
    validation_service::{validate_contact, validate_stay, BookingField, FieldError},
};
use crate::state::AppState;

const CONFIRMATION_ATTEMPTS: usize = 5;
const DEFAULT_DESCRIPTION: &str = "Cabo Concierge Booking";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

/// Outcome of `create_booking`: whether this call created or completed the booking,
/// or replayed one that was already settled.
pub struct BookingOutcome {
    pub booking: Booking,
    pub created: bool,
}

pub struct BookingService;

impl BookingService {
    async fn load_listing(state: &AppState, listing_id: i64) -> Result<Listing, ApiError> {
        state
            .listings
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Listing not found".to_string()))
    }

    pub async fn quote(
        state: &AppState,
        listing_id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        guests: u32,
    ) -> Result<(Listing, PriceBreakdown), ApiError> {
        let listing = Self::load_listing(state, listing_id).await?;

        let errors = validate_stay(start_date, end_date, guests, listing.maximum_guests);
        match (start_date, end_date) {
            (Some(start), Some(end)) if errors.is_empty() => {
                let quote = PricingService::quote(&listing, start, end)?;
                Ok((listing, quote))
            }
            _ => Err(ApiError::Validation(errors)),
        }
    }

    /// Full server-side check of a booking draft. All field errors are reported together.
    pub async fn validate_request(
        state: &AppState,
        request: &BookingRequest,
    ) -> Result<(Listing, PriceBreakdown), ApiError> {
        let listing = Self::load_listing(state, request.listing_id).await?;

        let mut errors = validate_stay(
            Some(request.start_date),
            Some(request.end_date),
            request.guests,
            listing.maximum_guests,
        );
        errors.extend(validate_contact(&request.contact));
        if request.payment_option == PaymentOption::Deposit
            && !listing.kind.offers_deposit()
        {
            errors.push(FieldError::new(
                BookingField::PaymentOption,
                "A deposit is not available for this listing",
            ));
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let quote = PricingService::quote(&listing, request.start_date, request.end_date)?;
        Ok((listing, quote))
    }

    fn amount_due(request: &BookingRequest, quote: &PriceBreakdown) -> Result<Decimal, ApiError> {
        request.payment_option.amount_due(quote).ok_or_else(|| {
            ApiError::Validation(vec![FieldError::new(
                BookingField::PaymentOption,
                "A deposit is not available for this listing",
            )])
        })
    }

    fn new_booking(
        user: &AuthenticatedUser,
        request: &BookingRequest,
        quote: &PriceBreakdown,
        amount_due: Decimal,
        idempotency_key: String,
    ) -> Booking {
        let now = Utc::now();
        Booking {
            id: None,
            user_id: user.user_id.clone(),
            listing_id: request.listing_id,
            confirmation_number: String::new(),
            idempotency_key,
            payment_intent_id: None,
            contact: request.contact.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            guests: request.guests,
            special_requests: request.special_requests.clone(),
            payment_option: request.payment_option,
            total_amount: quote.total_price,
            amount_due,
            amount_paid: Decimal::ZERO,
            payment_method: None,
            payment_status: PaymentStatus::Unpaid,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stores a booking under a freshly issued confirmation number, retrying on collisions.
    async fn insert_with_confirmation(
        state: &AppState,
        mut booking: Booking,
    ) -> Result<Booking, ApiError> {
        for _ in 0..CONFIRMATION_ATTEMPTS {
            booking.confirmation_number = generate_confirmation_number();
            match state.bookings.insert_or_get(booking.clone()).await {
                Err(StoreError::DuplicateConfirmation) => {
                    log::warn!("Confirmation number collision, retrying");
                }
                other => return other.map_err(ApiError::from),
            }
        }
        Err(ApiError::Internal(
            "Could not issue a unique confirmation number".to_string(),
        ))
    }

    fn ensure_owner(booking: &Booking, user: &AuthenticatedUser) -> Result<(), ApiError> {
        if booking.user_id == user.user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// An idempotency key names one stay. Reusing it for different terms is a client bug.
    fn ensure_same_booking(
        existing: &Booking,
        request: &BookingRequest,
        amount_due: Decimal,
    ) -> Result<(), ApiError> {
        let same = existing.listing_id == request.listing_id
            && existing.start_date == request.start_date
            && existing.end_date == request.end_date
            && existing.guests == request.guests
            && existing.payment_option == request.payment_option
            && existing.amount_due == amount_due;
        if same {
            Ok(())
        } else {
            log::warn!(
                "Idempotency key {} reused with different booking terms",
                existing.idempotency_key
            );
            Err(ApiError::Conflict(
                "Idempotency key was already used for a different booking".to_string(),
            ))
        }
    }

    /// Creates the processor-side payment intent. When a draft booking is attached, its
    /// price is recomputed and a pending booking is stored first, so a captured payment
    /// always has a row to reconcile against.
    pub async fn create_payment_intent(
        state: &AppState,
        user: &AuthenticatedUser,
        input: PaymentIntentInput,
    ) -> Result<PaymentIntentResponse, ApiError> {
        if input.amount <= Decimal::ZERO {
            return Err(ApiError::BadRequest("Valid amount is required".to_string()));
        }
        let amount_cents = PricingService::to_cents(input.amount)
            .ok_or_else(|| ApiError::BadRequest("Valid amount is required".to_string()))?;
        let idempotency_key = input.idempotency_key.to_string();

        let mut pending = None;
        if let Some(request) = &input.booking {
            let (_, quote) = Self::validate_request(state, request).await?;
            let due = Self::amount_due(request, &quote)?;
            if due != input.amount {
                return Err(ApiError::BadRequest(
                    "Amount does not match the quoted price".to_string(),
                ));
            }

            let booking = match state
                .bookings
                .find_by_idempotency_key(&idempotency_key)
                .await?
            {
                Some(existing) => {
                    Self::ensure_owner(&existing, user)?;
                    Self::ensure_same_booking(&existing, request, due)?;
                    if existing.is_settled() {
                        return Err(ApiError::Conflict(
                            "This booking has already been paid".to_string(),
                        ));
                    }
                    existing
                }
                None => {
                    let draft =
                        Self::new_booking(user, request, &quote, due, idempotency_key.clone());
                    Self::insert_with_confirmation(state, draft).await?
                }
            };
            pending = Some(booking);
        }

        let mut metadata: HashMap<String, String> = input.metadata;
        metadata.insert("idempotency_key".to_string(), idempotency_key.clone());
        metadata.insert("user_id".to_string(), user.user_id.clone());
        if let Some(booking) = &pending {
            metadata.insert("listing_id".to_string(), booking.listing_id.to_string());
            metadata.insert(
                "confirmation_number".to_string(),
                booking.confirmation_number.clone(),
            );
            metadata.insert(
                "customer_email".to_string(),
                booking.contact.email.clone(),
            );
        }

        let intent = state
            .payments
            .create_intent(NewPaymentIntent {
                amount_cents,
                description: input
                    .description
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
                metadata,
                idempotency_key,
            })
            .await?;

        let client_secret = intent.client_secret.clone().ok_or_else(|| {
            ApiError::Payment(PaymentError::Unavailable(
                "payment intent has no client secret".to_string(),
            ))
        })?;

        if let Some(booking) = pending.as_mut() {
            if booking.payment_intent_id.as_deref() != Some(intent.id.as_str()) {
                booking.payment_intent_id = Some(intent.id.clone());
                booking.updated_at = Utc::now();
                state.bookings.replace(booking).await?;
            }
            log::info!(
                "Pending booking {} linked to payment intent {}",
                booking.confirmation_number,
                intent.id
            );
        }

        Ok(PaymentIntentResponse {
            client_secret,
            payment_intent_id: intent.id,
            amount_due: input.amount,
            booking_id: pending
                .as_ref()
                .and_then(|b| b.id.map(|id| id.to_hex())),
            confirmation_number: pending.map(|b| b.confirmation_number),
        })
    }

    /// Records a paid booking. Replays with the same idempotency key return the stored
    /// booking; a pending row from `create_payment_intent` is completed in place.
    pub async fn create_booking(
        state: &AppState,
        user: &AuthenticatedUser,
        input: BookingInput,
    ) -> Result<BookingOutcome, ApiError> {
        let request = input.to_request();
        let (_, quote) = Self::validate_request(state, &request).await?;
        let due = Self::amount_due(&request, &quote)?;
        let option = request.payment_option;

        let mut errors = Vec::new();
        if input.total_amount != quote.total_price {
            errors.push(FieldError::new(
                BookingField::TotalAmount,
                "Total amount does not match the quoted price",
            ));
        }
        if let Some(status) = input.payment_status {
            if status != option.payment_status() {
                errors.push(FieldError::new(
                    BookingField::PaymentOption,
                    "Payment status does not match the payment option",
                ));
            }
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let intent_id = input
            .payment_intent_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("paymentIntentId is required".to_string()))?;
        let idempotency_key = input.idempotency_key.to_string();

        let existing = state
            .bookings
            .find_by_idempotency_key(&idempotency_key)
            .await?;
        if let Some(booking) = &existing {
            Self::ensure_owner(booking, user)?;
            Self::ensure_same_booking(booking, &request, due)?;
            if let Some(linked) = booking.payment_intent_id.as_deref() {
                if linked != intent_id {
                    return Err(ApiError::Conflict(
                        "Booking is linked to a different payment".to_string(),
                    ));
                }
            }
            if booking.is_settled() {
                log::info!("Replayed booking {}", booking.confirmation_number);
                return Ok(BookingOutcome {
                    booking: booking.clone(),
                    created: false,
                });
            }
        }

        if let Some(other) = state.bookings.find_by_payment_intent(&intent_id).await? {
            if other.idempotency_key != idempotency_key {
                return Err(ApiError::Conflict(
                    "Payment is already attached to another booking".to_string(),
                ));
            }
        }

        let intent = state.payments.retrieve_intent(&intent_id).await?;
        if !intent.status.is_paid() {
            return Err(ApiError::BadRequest(format!(
                "Payment has not completed. Current status: {:?}",
                intent.status
            )));
        }
        if Some(intent.amount_cents) != PricingService::to_cents(due) {
            return Err(ApiError::BadRequest(
                "Payment amount does not match the amount due".to_string(),
            ));
        }

        let now = Utc::now();
        let settle = |booking: &mut Booking| {
            booking.contact = request.contact.clone();
            booking.special_requests = request.special_requests.clone();
            booking.payment_intent_id = Some(intent_id.clone());
            booking.payment_method = input.payment_method.clone().or(Some("card".to_string()));
            booking.payment_status = option.payment_status();
            booking.amount_paid = due;
            booking.status = BookingStatus::Confirmed;
            booking.updated_at = now;
        };

        let booking = match existing {
            Some(mut booking) => {
                settle(&mut booking);
                state.bookings.replace(&booking).await?;
                booking
            }
            None => {
                let mut draft = Self::new_booking(user, &request, &quote, due, idempotency_key);
                settle(&mut draft);
                Self::insert_with_confirmation(state, draft).await?
            }
        };

        log::info!(
            "Booking {} confirmed for listing {} ({:?})",
            booking.confirmation_number,
            booking.listing_id,
            booking.payment_status
        );

        Ok(BookingOutcome {
            booking,
            created: true,
        })
    }

    pub async fn get_booking(
        state: &AppState,
        user: &AuthenticatedUser,
        booking_id: &str,
    ) -> Result<Booking, ApiError> {
        let booking = state
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;
        Self::ensure_owner(&booking, user)?;
        Ok(booking)
    }

    pub async fn list_bookings(
        state: &AppState,
        user: &AuthenticatedUser,
    ) -> Result<Vec<Booking>, ApiError> {
        Ok(state.bookings.list_for_user(&user.user_id).await?)
    }

    /// Applies a processor notification to the booking that owns the intent. This is
    /// what settles a booking whose `POST /api/bookings` never arrived.
    pub async fn apply_payment_event(
        state: &AppState,
        intent_id: &str,
        outcome: PaymentOutcome,
    ) -> Result<Option<Booking>, ApiError> {
        let mut booking = match state.bookings.find_by_payment_intent(intent_id).await? {
            Some(booking) => booking,
            None => {
                log::warn!("No booking found for payment intent {}", intent_id);
                return Ok(None);
            }
        };

        match outcome {
            PaymentOutcome::Succeeded if !booking.is_settled() => {
                booking.status = BookingStatus::Confirmed;
                booking.payment_status = booking.payment_option.payment_status();
                booking.amount_paid = booking.amount_due;
                if booking.payment_method.is_none() {
                    booking.payment_method = Some("card".to_string());
                }
                log::info!(
                    "Booking {} confirmed by payment notification",
                    booking.confirmation_number
                );
            }
            PaymentOutcome::Failed if booking.status == BookingStatus::Pending => {
                booking.status = BookingStatus::Failed;
                log::warn!(
                    "Payment failed for booking {}",
                    booking.confirmation_number
                );
            }
            _ => return Ok(Some(booking)),
        }

        booking.updated_at = Utc::now();
        state.bookings.replace(&booking).await?;
        Ok(Some(booking))
    }
}
