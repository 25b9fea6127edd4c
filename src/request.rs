use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    amedas_station::AmedasStation, geolocation::UserLocation, photo::ImageSelection,
    risk::AgeGroup,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where the assessment is for
#[derive(Debug, Clone, PartialEq)]
pub enum RequestTarget {
    Station {
        id: String,
        name: String,
        location: Coordinates,
    },
    Coordinates(Coordinates),
}

impl RequestTarget {
    /// A selected station always wins over the last raw position fix
    pub fn resolve(
        station: Option<&AmedasStation>,
        location: Option<&UserLocation>,
    ) -> Option<RequestTarget> {
        match (station, location) {
            (Some(station), _) => Some(RequestTarget::from(station)),
            (None, Some(location)) => Some(RequestTarget::Coordinates(Coordinates {
                latitude: location.latitude,
                longitude: location.longitude,
            })),
            (None, None) => None,
        }
    }
}

impl From<&AmedasStation> for RequestTarget {
    fn from(station: &AmedasStation) -> Self {
        RequestTarget::Station {
            id: station.station_id.clone(),
            name: station.name.clone(),
            location: Coordinates {
                latitude: station.latitude,
                longitude: station.longitude,
            },
        }
    }
}

/// Body posted to the analysis endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatRiskRequest {
    pub age_group: AgeGroup,
    pub detailed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_image_analysis: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_difference_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_comparison_analysis: Option<bool>,
}

impl HeatRiskRequest {
    pub fn new(age_group: AgeGroup) -> Self {
        Self {
            age_group,
            detailed: true,
            station_id: None,
            station_name: None,
            location: None,
            image_data: None,
            include_image_analysis: None,
            before_image: None,
            after_image: None,
            before_timestamp: None,
            after_timestamp: None,
            time_difference_minutes: None,
            include_comparison_analysis: None,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.include_comparison_analysis == Some(true)
    }

    pub fn is_single_image(&self) -> bool {
        self.include_image_analysis == Some(true)
    }

    /// Parameters for GET transports. Images and raw coordinates do not fit in a query string.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("age_group", self.age_group.to_string()),
            ("detailed", self.detailed.to_string()),
        ];
        if let (Some(id), Some(name)) = (&self.station_id, &self.station_name) {
            params.push(("station_id", id.clone()));
            params.push(("station_name", name.clone()));
        }
        params
    }
}

/// Assembles the request body.
///
/// Zero images adds no image fields, one image sets the single image flag,
/// two images attach both with their capture times and set the comparison flag.
pub fn build_payload(
    age_group: AgeGroup,
    target: Option<&RequestTarget>,
    images: &ImageSelection,
) -> HeatRiskRequest {
    let mut request = HeatRiskRequest::new(age_group);

    match target {
        Some(RequestTarget::Station { id, name, location }) => {
            request.station_id = Some(id.clone());
            request.station_name = Some(name.clone());
            request.location = Some(*location);
        }
        Some(RequestTarget::Coordinates(coordinates)) => {
            request.location = Some(*coordinates);
        }
        None => {}
    }

    if let Some((before, after)) = images.comparison() {
        request.before_image = Some(before.data.clone());
        request.after_image = Some(after.data.clone());
        request.before_timestamp = Some(before.captured_at);
        request.after_timestamp = Some(after.captured_at);
        request.time_difference_minutes = images.time_difference_minutes();
        request.include_comparison_analysis = Some(true);
    } else if let Some(image) = images.single() {
        request.image_data = Some(image.data.clone());
        request.include_image_analysis = Some(true);
    }

    request
}
