use chrono::NaiveDate;
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use thiserror::Error;

use crate::models::{listing::Listing, quote::PriceBreakdown};

/// 12% surcharge on the nightly total.
pub const SERVICE_FEE_RATE: Decimal = Decimal::from_parts(12, 0, 0, false, 2);
/// Share of the total taken as a deposit, before the cap.
pub const DEPOSIT_RATE: Decimal = Decimal::from_parts(25, 0, 0, false, 2);
pub const DEPOSIT_CAP: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Nightly rate must not be negative")]
    NegativeRate,
}

pub struct PricingService;

impl PricingService {
    /// Whole nights between two calendar dates, zero when the range is empty or reversed.
    pub fn calculate_nights(start: NaiveDate, end: NaiveDate) -> u32 {
        let days = (end - start).num_days();
        u32::try_from(days.max(0)).unwrap_or(u32::MAX)
    }

    /// Service fee rounded half-up to whole currency units.
    pub fn calculate_service_fee(base_price: Decimal) -> Decimal {
        (base_price * SERVICE_FEE_RATE)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Lesser of the cap and a quarter of the total, in cents.
    pub fn calculate_deposit(total_price: Decimal) -> Decimal {
        let share = (total_price * DEPOSIT_RATE)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        share.min(DEPOSIT_CAP)
    }

    /// Converts dollars to the cents the payment processor expects.
    pub fn to_cents(amount: Decimal) -> Option<i64> {
        (amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }

    pub fn calculate(
        nights: u32,
        nightly_rate: Decimal,
        offers_deposit: bool,
    ) -> Result<PriceBreakdown, PricingError> {
        if nightly_rate < Decimal::ZERO {
            return Err(PricingError::NegativeRate);
        }

        let base_price = Decimal::from(nights) * nightly_rate;
        let service_fee = Self::calculate_service_fee(base_price);
        let total_price = base_price + service_fee;
        let deposit_amount = offers_deposit.then(|| Self::calculate_deposit(total_price));

        Ok(PriceBreakdown {
            nights,
            nightly_rate,
            base_price,
            service_fee_rate: SERVICE_FEE_RATE,
            service_fee,
            total_price,
            deposit_amount,
        })
    }

    pub fn quote(
        listing: &Listing,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceBreakdown, PricingError> {
        Self::calculate(
            Self::calculate_nights(start, end),
            listing.nightly_rate,
            listing.kind.offers_deposit(),
        )
    }
}
