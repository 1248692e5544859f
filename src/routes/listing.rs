use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::models::listing::ListingSummary;
use crate::state::AppState;

pub async fn get_listing(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let listing_id = path.into_inner();

    match state.listings.get_listing(listing_id).await? {
        Some(listing) => Ok(HttpResponse::Ok().json(ListingSummary::from(listing))),
        None => Err(ApiError::NotFound("Listing not found".to_string())),
    }
}
