use std::sync::Arc;

use crate::db::{BookingStore, ListingStore};
use crate::services::payment::PaymentGateway;

/// Shared handles every request needs. Cloned into each actix worker.
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<dyn BookingStore>,
    pub listings: Arc<dyn ListingStore>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        listings: Arc<dyn ListingStore>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            bookings,
            listings,
            payments,
        }
    }
}
