use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{BookingBackend, CheckoutError, PaymentOptionSelector, Session};
use crate::models::bookings::{
    BookingInput, BookingRequest, BookingSummary, Contact, PaymentOption,
};
use crate::models::listing::Listing;
use crate::models::payment::PaymentIntentInput;
use crate::models::quote::PriceBreakdown;
use crate::services::pricing_service::PricingService;
use crate::services::validation_service::{
    validate_contact, validate_stay, BookingField, FieldError,
};

const PAYMENT_METHOD: &str = "card";
const BOOKING_NOT_RECORDED: &str =
    "Your payment was received but we couldn't finalize your booking. Please contact us before trying to pay again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    Form,
    Payment,
    Confirmation,
}

/// A payment intent waiting for the payment UI. Used once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayment {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount_due: Decimal,
}

pub struct CheckoutFlow<B: BookingBackend> {
    backend: B,
    session: Session,
    listing: Listing,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    guests: u32,
    contact: Contact,
    special_requests: Option<String>,
    selector: PaymentOptionSelector,
    quote: Option<PriceBreakdown>,
    quote_revision: u64,
    errors: Vec<FieldError>,
    step: CheckoutStep,
    idempotency_key: Uuid,
    pending: Option<PendingPayment>,
    notice: Option<String>,
    confirmation: Option<BookingSummary>,
}

impl<B: BookingBackend> CheckoutFlow<B> {
    pub fn new(backend: B, session: Session, listing: Listing) -> Self {
        let selector = PaymentOptionSelector::new(listing.kind.offers_deposit());
        let contact = Contact {
            email: session.email.clone(),
            ..Contact::default()
        };
        Self {
            backend,
            session,
            listing,
            start_date: None,
            end_date: None,
            guests: 1,
            contact,
            special_requests: None,
            selector,
            quote: None,
            quote_revision: 0,
            errors: Vec::new(),
            step: CheckoutStep::Form,
            idempotency_key: Uuid::new_v4(),
            pending: None,
            notice: None,
            confirmation: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn quote(&self) -> Option<&PriceBreakdown> {
        self.quote.as_ref()
    }

    /// Bumped each time the breakdown is recomputed.
    pub fn quote_revision(&self) -> u64 {
        self.quote_revision
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn idempotency_key(&self) -> Uuid {
        self.idempotency_key
    }

    pub fn payment_option(&self) -> PaymentOption {
        self.selector.selected()
    }

    pub fn amount_due(&self) -> Option<Decimal> {
        self.quote.as_ref().and_then(|q| self.selector.amount_due(q))
    }

    pub fn pending_payment(&self) -> Option<&PendingPayment> {
        self.pending.as_ref()
    }

    pub fn confirmation(&self) -> Option<&BookingSummary> {
        self.confirmation.as_ref()
    }

    pub fn confirmation_number(&self) -> Option<&str> {
        self.confirmation
            .as_ref()
            .map(|b| b.confirmation_number.as_str())
    }

    fn ensure_step(&self, expected: CheckoutStep) -> Result<(), CheckoutError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(CheckoutError::WrongStep(self.step))
        }
    }

    /// Draft changed: the next payment attempt is a new booking attempt.
    fn rotate_key(&mut self) {
        self.idempotency_key = Uuid::new_v4();
        self.pending = None;
    }

    fn recompute_quote(&mut self) {
        self.errors = validate_stay(
            self.start_date,
            self.end_date,
            self.guests,
            self.listing.maximum_guests,
        );
        self.quote = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if self.errors.is_empty() => {
                match PricingService::quote(&self.listing, start, end) {
                    Ok(quote) => Some(quote),
                    Err(e) => {
                        log::warn!("Could not price listing {}: {}", self.listing.id, e);
                        None
                    }
                }
            }
            _ => None,
        };
        self.quote_revision += 1;
    }

    pub fn set_dates(
        &mut self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Form)?;
        if (start_date, end_date) != (self.start_date, self.end_date) {
            self.start_date = start_date;
            self.end_date = end_date;
            self.rotate_key();
            self.recompute_quote();
        }
        Ok(())
    }

    pub fn set_guests(&mut self, guests: u32) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Form)?;
        if guests != self.guests {
            self.guests = guests;
            self.rotate_key();
            self.recompute_quote();
        }
        Ok(())
    }

    pub fn set_contact(&mut self, contact: Contact) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Form)?;
        if contact != self.contact {
            self.contact = contact;
            self.rotate_key();
        }
        Ok(())
    }

    pub fn set_special_requests(&mut self, requests: Option<String>) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Form)?;
        let requests = requests.filter(|r| !r.trim().is_empty());
        if requests != self.special_requests {
            self.special_requests = requests;
            self.rotate_key();
        }
        Ok(())
    }

    /// Switching options re-reads the cached quote; nothing is recomputed.
    pub fn select_payment_option(&mut self, option: PaymentOption) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Form)?;
        if option == self.selector.selected() {
            return Ok(());
        }
        self.selector
            .select(option)
            .map_err(|e| CheckoutError::Validation(vec![e]))?;
        self.rotate_key();
        Ok(())
    }

    fn validate_draft(&self) -> Vec<FieldError> {
        let mut errors = validate_stay(
            self.start_date,
            self.end_date,
            self.guests,
            self.listing.maximum_guests,
        );
        errors.extend(validate_contact(&self.contact));
        errors
    }

    fn draft_request(&self) -> Option<BookingRequest> {
        Some(BookingRequest {
            listing_id: self.listing.id,
            start_date: self.start_date?,
            end_date: self.end_date?,
            guests: self.guests,
            contact: self.contact.clone(),
            special_requests: self.special_requests.clone(),
            payment_option: self.selector.selected(),
        })
    }

    fn fail(&mut self, error: CheckoutError) -> CheckoutError {
        log::warn!("Checkout for listing {} failed: {}", self.listing.id, error);
        self.notice = Some(error.user_message());
        error
    }

    /// Requests a payment intent for the amount due. Invalid drafts never reach the
    /// network, and the flow only moves to `Payment` once the intent exists.
    pub async fn proceed_to_payment(&mut self) -> Result<PendingPayment, CheckoutError> {
        self.ensure_step(CheckoutStep::Form)?;

        let errors = self.validate_draft();
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(CheckoutError::Validation(errors));
        }
        self.errors.clear();

        let (request, quote) = match (self.draft_request(), self.quote.clone()) {
            (Some(request), Some(quote)) => (request, quote),
            _ => {
                self.recompute_quote();
                return Err(CheckoutError::Validation(self.errors.clone()));
            }
        };
        let amount_due = self.selector.amount_due(&quote).ok_or_else(|| {
            CheckoutError::Validation(vec![FieldError::new(
                BookingField::PaymentOption,
                "A deposit is not available for this listing",
            )])
        })?;

        let mut metadata = HashMap::new();
        metadata.insert("listing_id".to_string(), request.listing_id.to_string());
        metadata.insert("start_date".to_string(), request.start_date.to_string());
        metadata.insert("end_date".to_string(), request.end_date.to_string());
        metadata.insert("guests".to_string(), request.guests.to_string());
        metadata.insert(
            "payment_option".to_string(),
            format!("{:?}", request.payment_option).to_lowercase(),
        );

        let input = PaymentIntentInput {
            amount: amount_due,
            description: Some(format!(
                "{} ({} nights)",
                self.listing.title, quote.nights
            )),
            metadata,
            idempotency_key: self.idempotency_key,
            booking: Some(request),
        };

        let response = match self
            .backend
            .create_payment_intent(&self.session, &input)
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.fail(e)),
        };

        if response.amount_due != amount_due {
            return Err(self.fail(CheckoutError::IntentMismatch(format!(
                "expected {}, server charged {}",
                amount_due, response.amount_due
            ))));
        }

        let pending = PendingPayment {
            client_secret: response.client_secret,
            payment_intent_id: response.payment_intent_id,
            amount_due,
        };
        self.pending = Some(pending.clone());
        self.notice = None;
        self.step = CheckoutStep::Payment;
        Ok(pending)
    }

    /// Called by the payment UI once the card was charged. Records the booking and
    /// moves to `Confirmation` only if the server accepted it.
    pub async fn payment_succeeded(
        &mut self,
        payment_intent_id: &str,
    ) -> Result<BookingSummary, CheckoutError> {
        self.ensure_step(CheckoutStep::Payment)?;
        let known_intent = self
            .pending
            .as_ref()
            .is_some_and(|p| p.payment_intent_id == payment_intent_id);
        if !known_intent {
            return Err(self.fail(CheckoutError::IntentMismatch(
                payment_intent_id.to_string(),
            )));
        }

        let (request, quote) = match (self.draft_request(), self.quote.clone()) {
            (Some(request), Some(quote)) => (request, quote),
            _ => return Err(CheckoutError::Validation(self.errors.clone())),
        };

        let input = BookingInput {
            listing_id: request.listing_id,
            first_name: request.contact.first_name.clone(),
            last_name: request.contact.last_name.clone(),
            email: request.contact.email.clone(),
            phone: request.contact.phone.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            guests: request.guests,
            total_amount: quote.total_price,
            special_requests: request.special_requests.clone(),
            payment_method: Some(PAYMENT_METHOD.to_string()),
            payment_status: Some(request.payment_option.payment_status()),
            payment_option: Some(request.payment_option),
            idempotency_key: self.idempotency_key,
            payment_intent_id: Some(payment_intent_id.to_string()),
        };

        let response = match self.backend.submit_booking(&self.session, &input).await {
            Ok(response) if response.success => response,
            Ok(_) => {
                let err = self.fail(CheckoutError::Rejected {
                    status: 200,
                    message: "booking not accepted".to_string(),
                });
                self.notice = Some(BOOKING_NOT_RECORDED.to_string());
                return Err(err);
            }
            Err(e) => {
                let err = self.fail(e);
                self.notice = Some(BOOKING_NOT_RECORDED.to_string());
                return Err(err);
            }
        };

        log::info!(
            "Booking {} confirmed for listing {}",
            response.booking.confirmation_number,
            self.listing.id
        );
        self.pending = None;
        self.notice = None;
        self.step = CheckoutStep::Confirmation;
        self.confirmation = Some(response.booking.clone());
        Ok(response.booking)
    }

    /// The payment UI reported a declined or abandoned charge.
    pub fn payment_failed(&mut self, reason: &str) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Payment)?;
        log::warn!("Payment failed for listing {}: {}", self.listing.id, reason);
        self.pending = None;
        self.step = CheckoutStep::Form;
        self.notice = Some("Your payment could not be completed. Please try again.".to_string());
        Ok(())
    }

    /// Leaves the payment step and drops the unused intent.
    pub fn back(&mut self) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Payment)?;
        self.pending = None;
        self.step = CheckoutStep::Form;
        Ok(())
    }
}
