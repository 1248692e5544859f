use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::store::{BookingStore, ListingStore, StoreError};
use crate::models::{bookings::Booking, listing::Listing};

/// Process-local store for tests and offline runs. Same semantics as the Mongo store,
/// including the unique idempotency key and confirmation number.
#[derive(Default)]
pub struct InMemoryStore {
    bookings: RwLock<Vec<Booking>>,
    listings: RwLock<HashMap<i64, Listing>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(listings: impl IntoIterator<Item = Listing>) -> Self {
        let map = listings.into_iter().map(|l| (l.id, l)).collect();
        Self {
            bookings: RwLock::default(),
            listings: RwLock::new(map),
        }
    }

    pub async fn booking_count(&self) -> usize {
        self.bookings.read().await.len()
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_or_get(&self, booking: Booking) -> Result<Booking, StoreError> {
        let mut bookings = self.bookings.write().await;

        if let Some(existing) = bookings
            .iter()
            .find(|b| b.idempotency_key == booking.idempotency_key)
        {
            return Ok(existing.clone());
        }
        if bookings
            .iter()
            .any(|b| b.confirmation_number == booking.confirmation_number)
        {
            return Err(StoreError::DuplicateConfirmation);
        }

        let mut booking = booking;
        booking.id = Some(ObjectId::new());
        bookings.push(booking.clone());
        Ok(booking)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, StoreError> {
        let object_id =
            ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))?;
        let bookings = self.bookings.read().await;
        Ok(bookings.iter().find(|b| b.id == Some(object_id)).cloned())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.iter().find(|b| b.idempotency_key == key).cloned())
    }

    async fn find_by_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .iter()
            .find(|b| b.payment_intent_id.as_deref() == Some(intent_id))
            .cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn replace(&self, booking: &Booking) -> Result<(), StoreError> {
        let id = booking
            .id
            .ok_or_else(|| StoreError::InvalidId("booking has no id".to_string()))?;
        let mut bookings = self.bookings.write().await;
        match bookings.iter_mut().find(|b| b.id == Some(id)) {
            Some(slot) => {
                *slot = booking.clone();
                Ok(())
            }
            None => Err(StoreError::InvalidId(id.to_hex())),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ListingStore for InMemoryStore {
    async fn get_listing(&self, id: i64) -> Result<Option<Listing>, StoreError> {
        Ok(self.listings.read().await.get(&id).cloned())
    }

    async fn upsert_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        self.listings
            .write()
            .await
            .insert(listing.id, listing.clone());
        Ok(())
    }
}
