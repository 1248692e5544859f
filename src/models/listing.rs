use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Villa,
    Resort,
    Hotel,
    Adventure,
    Restaurant,
    Transportation,
}

impl ListingKind {
    /// Only villas can be secured with a partial deposit.
    pub fn offers_deposit(self) -> bool {
        matches!(self, ListingKind::Villa)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: i64,
    pub title: String,
    pub kind: ListingKind,
    pub nightly_rate: Decimal,
    pub maximum_guests: u32,
    pub location: String,
}

/// Public shape of a listing. The storage key stays out of the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: i64,
    pub title: String,
    pub kind: ListingKind,
    pub nightly_rate: Decimal,
    pub maximum_guests: u32,
    pub location: String,
    pub offers_deposit: bool,
}

impl From<Listing> for ListingSummary {
    fn from(listing: Listing) -> Self {
        Self {
            offers_deposit: listing.kind.offers_deposit(),
            id: listing.id,
            title: listing.title,
            kind: listing.kind,
            nightly_rate: listing.nightly_rate,
            maximum_guests: listing.maximum_guests,
            location: listing.location,
        }
    }
}

impl From<ListingSummary> for Listing {
    fn from(summary: ListingSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            kind: summary.kind,
            nightly_rate: summary.nightly_rate,
            maximum_guests: summary.maximum_guests,
            location: summary.location,
        }
    }
}
