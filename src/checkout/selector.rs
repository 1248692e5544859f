use rust_decimal::Decimal;

use crate::models::bookings::PaymentOption;
use crate::models::quote::PriceBreakdown;
use crate::services::validation_service::{BookingField, FieldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentOptionSelector {
    offers_deposit: bool,
    selected: PaymentOption,
}

impl PaymentOptionSelector {
    pub fn new(offers_deposit: bool) -> Self {
        let selected = if offers_deposit {
            PaymentOption::Deposit
        } else {
            PaymentOption::Full
        };
        Self {
            offers_deposit,
            selected,
        }
    }

    pub fn offers_deposit(&self) -> bool {
        self.offers_deposit
    }

    pub fn selected(&self) -> PaymentOption {
        self.selected
    }

    pub fn select(&mut self, option: PaymentOption) -> Result<(), FieldError> {
        if option == PaymentOption::Deposit && !self.offers_deposit {
            return Err(FieldError::new(
                BookingField::PaymentOption,
                "A deposit is not available for this listing",
            ));
        }
        self.selected = option;
        Ok(())
    }

    /// Reads the cached breakdown; never recomputes it.
    pub fn amount_due(&self, quote: &PriceBreakdown) -> Option<Decimal> {
        self.selected.amount_due(quote)
    }
}
