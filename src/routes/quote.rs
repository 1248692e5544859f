use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::models::quote::{QuoteInput, QuoteResponse};
use crate::services::booking_service::BookingService;
use crate::state::AppState;

pub async fn get_quote(
    state: web::Data<AppState>,
    input: web::Json<QuoteInput>,
) -> Result<HttpResponse, ApiError> {
    let input = input.into_inner();

    let (listing, quote) = BookingService::quote(
        &state,
        input.listing_id,
        input.start_date,
        input.end_date,
        input.guests,
    )
    .await?;

    Ok(HttpResponse::Ok().json(QuoteResponse {
        listing_id: listing.id,
        listing_title: listing.title,
        guests: input.guests,
        quote,
    }))
}
