//! Delivery zone detection around the restaurant (Middelburg, Mpumalanga)

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{DeliveryQuote, DeliveryZone, GeoPoint};

/// Centre of Roberts Estate, used as the origin for both zones
pub const STORE_CENTRE: GeoPoint = GeoPoint::new(-25.775, 29.464);

const EARTH_RADIUS_KM: f64 = 6371.0;
const ROBERTS_ESTATE_RADIUS_KM: f64 = 2.5;
const MIDDLEBURG_RADIUS_KM: f64 = 15.0;

/// Great-circle distance in kilometres
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Zone for a validated point
pub fn zone_for_distance(distance_km: f64) -> DeliveryZone {
    if distance_km <= ROBERTS_ESTATE_RADIUS_KM {
        DeliveryZone::RobertsEstate
    } else if distance_km <= MIDDLEBURG_RADIUS_KM {
        DeliveryZone::Middleburg
    } else {
        DeliveryZone::Outside
    }
}

/// Delivery fee in rand, `None` outside the delivery area
pub fn zone_fee(zone: DeliveryZone) -> Option<Decimal> {
    match zone {
        DeliveryZone::RobertsEstate => Some(Decimal::new(1000, 2)),
        DeliveryZone::Middleburg => Some(Decimal::new(3000, 2)),
        DeliveryZone::Outside => None,
    }
}

/// Quote delivery to `point`
pub fn quote(point: GeoPoint) -> Result<DeliveryQuote, AppError> {
    if !point.is_valid() {
        return Err(AppError::new(ErrorCode::InvalidLocation)
            .with_detail("lat", point.lat.to_string())
            .with_detail("lng", point.lng.to_string()));
    }

    let distance_km = haversine_km(STORE_CENTRE, point);
    let zone = zone_for_distance(distance_km);
    let fee = zone_fee(zone);

    Ok(DeliveryQuote {
        zone,
        zone_name: zone.display_name().to_string(),
        fee: fee.unwrap_or(Decimal::ZERO),
        available: fee.is_some(),
        distance_km: (distance_km * 100.0).round() / 100.0,
    })
}
