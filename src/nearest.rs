use serde::{Deserialize, Serialize};

use crate::{location::Location, station::Station, units::Units};

/// Search radius used when the caller does not pick one
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 50.0;

/// A catalog station paired with its distance in km from the query point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedStation<S> {
    #[serde(flatten)]
    pub station: S,
    pub distance: f64,
}

/// Linear scan for the closest station within `max_distance_km`.
///
/// Ties keep the first station in slice order. An invalid query point or a
/// negative or NaN radius never matches anything.
pub fn find_nearest<S>(
    stations: &[S],
    location: &Location,
    max_distance_km: f64,
) -> Option<ResolvedStation<S>>
where
    S: Station + Clone,
{
    if !is_valid_radius(max_distance_km) || !location.is_valid() {
        return None;
    }

    let mut nearest: Option<(&S, f64)> = None;

    for station in stations {
        let distance = location.distance(&station.location(), &Units::Metric);
        if distance > max_distance_km {
            continue;
        }

        let closer = match nearest {
            Some((_, min_distance)) => distance < min_distance,
            None => !distance.is_nan(),
        };
        if closer {
            nearest = Some((station, distance));
        }
    }

    nearest.map(|(station, distance)| ResolvedStation {
        station: station.clone(),
        distance,
    })
}

/// Radii are zero or more kilometers. Infinity means no limit.
pub fn is_valid_radius(max_distance_km: f64) -> bool {
    max_distance_km >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amedas_station::AmedasStation;

    fn station(id: &str, lat: f64, lng: f64) -> AmedasStation {
        AmedasStation::new(id, id, (lat, lng), "", "")
    }

    #[test]
    fn resolves_single_station() {
        let stations = vec![station("A", 0.0, 0.0)];
        let resolved = find_nearest(&stations, &Location::unnamed(0.01, 0.01), 50.0).unwrap();
        assert_eq!(resolved.station.station_id, "A");
        assert!((resolved.distance - 1.57).abs() < 0.01);
    }

    #[test]
    fn picks_closest() {
        let stations = vec![
            station("far", 1.0, 1.0),
            station("near", 0.1, 0.1),
            station("middle", 0.3, 0.3),
        ];
        let resolved = find_nearest(&stations, &Location::unnamed(0.0, 0.0), 500.0).unwrap();
        assert_eq!(resolved.station.station_id, "near");
    }

    #[test]
    fn ties_keep_first_in_order() {
        let stations = vec![
            station("east", 0.0, 0.1),
            station("west", 0.0, -0.1),
        ];
        let resolved = find_nearest(&stations, &Location::unnamed(0.0, 0.0), 50.0).unwrap();
        assert_eq!(resolved.station.station_id, "east");
    }

    #[test]
    fn nothing_in_range() {
        let stations = vec![station("A", 1.0, 1.0)];
        assert!(find_nearest(&stations, &Location::unnamed(0.0, 0.0), 50.0).is_none());
        assert!(find_nearest(&stations, &Location::unnamed(0.0, 0.0), 0.0).is_none());
    }

    #[test]
    fn zero_radius_matches_colocated_station() {
        let stations = vec![station("A", 35.0, 139.0)];
        let resolved = find_nearest(&stations, &Location::unnamed(35.0, 139.0), 0.0).unwrap();
        assert_eq!(resolved.distance, 0.0);
    }

    #[test]
    fn radius_is_inclusive() {
        let stations = vec![station("A", 0.01, 0.01)];
        let origin = Location::unnamed(0.0, 0.0);
        let exact = origin.distance(&stations[0].location(), &Units::Metric);
        assert!(find_nearest(&stations, &origin, exact).is_some());
    }

    #[test]
    fn empty_catalog_and_invalid_query() {
        let empty: Vec<AmedasStation> = vec![];
        assert!(find_nearest(&empty, &Location::unnamed(0.0, 0.0), 50.0).is_none());

        let stations = vec![station("A", 0.0, 0.0)];
        assert!(find_nearest(&stations, &Location::unnamed(f64::NAN, 0.0), 50.0).is_none());
    }

    #[test]
    fn invalid_radius_never_matches() {
        let stations = vec![station("A", 0.0, 0.0)];
        let origin = Location::unnamed(0.0, 0.0);
        assert!(find_nearest(&stations, &origin, f64::NAN).is_none());
        assert!(find_nearest(&stations, &origin, -1.0).is_none());
        assert!(find_nearest(&stations, &origin, f64::INFINITY).is_some());
    }

    #[test]
    fn out_of_range_coordinates_never_match() {
        let stations = vec![station("A", 89.9, 0.0)];
        assert!(find_nearest(&stations, &Location::unnamed(91.0, 0.0), 500.0).is_none());
        assert!(find_nearest(&stations, &Location::unnamed(0.0, 181.0), f64::INFINITY).is_none());
    }
}
