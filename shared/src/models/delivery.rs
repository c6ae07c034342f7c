//! Delivery Model

use super::text_enum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// WGS84 coordinate in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside [-90, 90] x [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Delivery zone around the restaurant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryZone {
    RobertsEstate,
    Middleburg,
    Outside,
}

text_enum!(DeliveryZone, "delivery zone", {
    RobertsEstate => "roberts_estate",
    Middleburg => "middleburg",
    Outside => "outside",
});

impl DeliveryZone {
    pub fn display_name(&self) -> &'static str {
        match self {
            DeliveryZone::RobertsEstate => "Roberts Estate",
            DeliveryZone::Middleburg => "Middleburg",
            DeliveryZone::Outside => "Outside delivery area",
        }
    }
}

/// Response of the delivery quote endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryQuote {
    pub zone: DeliveryZone,
    pub zone_name: String,
    pub fee: Decimal,
    pub available: bool,
    pub distance_km: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(-25.775, 29.464).is_valid());
        assert!(GeoPoint::new(90.0, -180.0).is_valid());
        assert!(!GeoPoint::new(90.1, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 180.5).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
    }
}
