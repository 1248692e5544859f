use async_trait::async_trait;
use thiserror::Error;

use crate::models::{bookings::Booking, listing::Listing};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Confirmation number already issued")]
    DuplicateConfirmation,
    #[error("Database error: {0}")]
    Database(String),
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Stores a new booking unless one with the same idempotency key exists,
    /// in which case the existing row is returned untouched.
    async fn insert_or_get(&self, booking: Booking) -> Result<Booking, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, StoreError>;

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Booking>, StoreError>;

    async fn find_by_payment_intent(&self, intent_id: &str)
        -> Result<Option<Booking>, StoreError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StoreError>;

    async fn replace(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn get_listing(&self, id: i64) -> Result<Option<Listing>, StoreError>;

    async fn upsert_listing(&self, listing: &Listing) -> Result<(), StoreError>;
}
