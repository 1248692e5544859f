use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInput {
    pub listing_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub guests: u32,
}

/// Cost of a stay, derived from the nightly rate and date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub nights: u32,
    pub nightly_rate: Decimal,
    pub base_price: Decimal,
    pub service_fee_rate: Decimal,
    pub service_fee: Decimal,
    pub total_price: Decimal,
    /// `None` when the listing does not take deposits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub listing_id: i64,
    pub listing_title: String,
    pub guests: u32,
    pub quote: PriceBreakdown,
}
