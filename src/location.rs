use crate::units::Units;
use serde::{Deserialize, Serialize};
use std::f64;
use std::string::String;

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64, name: String) -> Location {
        Location {
            name,
            latitude: lat,
            longitude: lon,
        }
    }

    pub fn unnamed(lat: f64, lon: f64) -> Location {
        Location::new(lat, lon, String::new())
    }

    /// True when both coordinates are finite and inside the usual decimal degree ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }

    /// Great circle distance to `other` in the distance unit of `unit`
    pub fn distance(&self, other: &Location, unit: &Units) -> f64 {
        let source_lat = self.latitude.to_radians();
        let dest_lat = other.latitude.to_radians();

        // Compute using the haversine formula
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + source_lat.cos() * dest_lat.cos() * (d_lon * 0.5).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        let r = unit.earths_radius();

        c * r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_small_offset() {
        let origin = Location::unnamed(0.0, 0.0);
        let other = Location::unnamed(0.01, 0.01);
        let distance = origin.distance(&other, &Units::Metric);
        assert!((distance - 1.5725).abs() < 0.001);
    }

    #[test]
    fn test_distance_tokyo_osaka() {
        let tokyo = Location::new(35.6895, 139.6917, "東京".into());
        let osaka = Location::new(34.6937, 135.5023, "大阪".into());
        let distance = tokyo.distance(&osaka, &Units::Metric);
        assert!(distance > 390.0 && distance < 400.0);

        // Symmetric
        let reverse = osaka.distance(&tokyo, &Units::Metric);
        assert!((distance - reverse).abs() < 1e-9);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let naha = Location::new(26.2072, 127.6792, "那覇".into());
        assert_eq!(naha.distance(&naha, &Units::Metric), 0.0);
    }

    #[test]
    fn test_validity() {
        assert!(Location::unnamed(35.0, 139.0).is_valid());
        assert!(!Location::unnamed(91.0, 139.0).is_valid());
        assert!(!Location::unnamed(f64::NAN, 139.0).is_valid());
        assert!(!Location::unnamed(35.0, f64::INFINITY).is_valid());
    }
}
