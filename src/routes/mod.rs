use actix_web::web;

use crate::middleware::auth::AuthMiddleware;

pub mod bookings;
pub mod health;
pub mod listing;
pub mod payment;
pub mod quote;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                // Public routes
                .route("/listings/{id}", web::get().to(listing::get_listing))
                .route("/quote", web::post().to(quote::get_quote))
                .route(
                    "/stripe-webhook",
                    web::post().to(payment::handle_stripe_webhook),
                )
                // Protected routes
                .service(
                    web::scope("")
                        .wrap(AuthMiddleware)
                        .route(
                            "/create-payment-intent",
                            web::post().to(payment::create_payment_intent),
                        )
                        .route("/bookings", web::post().to(bookings::create_booking))
                        .route("/bookings/{id}", web::get().to(bookings::get_booking))
                        .route(
                            "/account/bookings",
                            web::get().to(bookings::get_all_bookings),
                        ),
                ),
        );
}
