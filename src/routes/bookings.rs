use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::bookings::{BookingInput, BookingResponse, BookingSummary};
use crate::services::booking_service::BookingService;
use crate::state::AppState;

pub async fn create_booking(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    input: web::Json<BookingInput>,
) -> Result<HttpResponse, ApiError> {
    let outcome = BookingService::create_booking(&state, &user, input.into_inner()).await?;

    let body = BookingResponse {
        success: true,
        booking: BookingSummary::from(&outcome.booking),
    };

    if outcome.created {
        Ok(HttpResponse::Created().json(body))
    } else {
        Ok(HttpResponse::Ok().json(body))
    }
}

pub async fn get_booking(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let booking = BookingService::get_booking(&state, &user, &path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(BookingResponse {
        success: true,
        booking: BookingSummary::from(&booking),
    }))
}

pub async fn get_all_bookings(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let bookings = BookingService::list_bookings(&state, &user).await?;
    let summaries: Vec<BookingSummary> = bookings.iter().map(BookingSummary::from).collect();

    Ok(HttpResponse::Ok().json(summaries))
}
