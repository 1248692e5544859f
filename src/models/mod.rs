pub mod bookings;
pub mod listing;
pub mod payment;
pub mod quote;
