pub mod booking_service;
pub mod confirmation;
pub mod payment;
pub mod pricing_service;
pub mod stripe;
pub mod validation_service;
