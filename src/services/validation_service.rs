use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::bookings::Contact;

const MIN_NAME_LEN: usize = 2;
const MIN_PHONE_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookingField {
    ListingId,
    StartDate,
    EndDate,
    Guests,
    FirstName,
    LastName,
    Email,
    Phone,
    PaymentOption,
    TotalAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: BookingField,
    pub message: String,
}

impl FieldError {
    pub fn new(field: BookingField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Checks stay dates and party size. Missing dates are reported, not assumed.
pub fn validate_stay(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    guests: u32,
    maximum_guests: u32,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match (start_date, end_date) {
        (None, _) => errors.push(FieldError::new(
            BookingField::StartDate,
            "Check-in date is required",
        )),
        (Some(_), None) => errors.push(FieldError::new(
            BookingField::EndDate,
            "Check-out date is required",
        )),
        (Some(start), Some(end)) if end <= start => errors.push(FieldError::new(
            BookingField::EndDate,
            "Check-out date must be after check-in date",
        )),
        _ => {}
    }

    if guests < 1 {
        errors.push(FieldError::new(
            BookingField::Guests,
            "At least one guest is required",
        ));
    } else if guests > maximum_guests {
        errors.push(FieldError::new(
            BookingField::Guests,
            format!("Maximum {} guests allowed", maximum_guests),
        ));
    }

    errors
}

pub fn validate_contact(contact: &Contact) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if contact.first_name.trim().chars().count() < MIN_NAME_LEN {
        errors.push(FieldError::new(
            BookingField::FirstName,
            "First name must be at least 2 characters",
        ));
    }
    if contact.last_name.trim().chars().count() < MIN_NAME_LEN {
        errors.push(FieldError::new(
            BookingField::LastName,
            "Last name must be at least 2 characters",
        ));
    }
    if !is_valid_email(contact.email.trim()) {
        errors.push(FieldError::new(
            BookingField::Email,
            "Please enter a valid email address",
        ));
    }
    if contact.phone.trim().chars().count() < MIN_PHONE_LEN {
        errors.push(FieldError::new(
            BookingField::Phone,
            "Phone number must be at least 10 digits",
        ));
    }

    errors
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(
                r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)*$",
            )
            .ok()
        })
        .as_ref()
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}
