//! Delivery fee quote

use axum::{
    Json,
    extract::Query,
};
use serde::Deserialize;
use shared::models::{DeliveryQuote, GeoPoint};

use super::ApiResult;

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub lat: f64,
    pub lng: f64,
}

/// GET /api/delivery/quote?lat=&lng=
pub async fn get_quote(Query(query): Query<QuoteQuery>) -> ApiResult<DeliveryQuote> {
    let quote = crate::delivery::quote(GeoPoint::new(query.lat, query.lng))?;
    Ok(Json(quote))
}
