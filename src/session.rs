use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::{
    amedas_station::{AmedasStation, AmedasStations},
    client::HeatRiskClient,
    error::{Error, Result},
    geolocation::{GeolocationError, LocationStatus, UserLocation},
    nearest::DEFAULT_MAX_DISTANCE_KM,
    photo::{CapturedImage, ImageSelection, ImageSlot},
    request::{build_payload, HeatRiskRequest, RequestTarget},
    response::Outcome,
    risk::AgeGroup,
};

/// Per session selections. Whichever event writes a slot last wins.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub age_group: AgeGroup,
    current_location: Option<UserLocation>,
    selected_station: Option<AmedasStation>,
    images: ImageSelection,
    max_distance_km: f64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(AgeGroup::default(), DEFAULT_MAX_DISTANCE_KM)
    }
}

impl SessionState {
    pub fn new(age_group: AgeGroup, max_distance_km: f64) -> Self {
        Self {
            age_group,
            current_location: None,
            selected_station: None,
            images: ImageSelection::new(),
            max_distance_km,
        }
    }

    pub fn current_location(&self) -> Option<&UserLocation> {
        self.current_location.as_ref()
    }

    pub fn selected_station(&self) -> Option<&AmedasStation> {
        self.selected_station.as_ref()
    }

    pub fn images(&self) -> &ImageSelection {
        &self.images
    }

    /// Records a new position fix and picks the nearest station for it.
    /// An out of range fix keeps whatever station was selected before.
    /// A fix with unusable coordinates is dropped without touching the session.
    pub fn on_position(&mut self, fix: UserLocation, catalog: &AmedasStations) -> LocationStatus {
        if !fix.location().is_valid() {
            warn!(
                "Ignoring invalid position fix ({}, {})",
                fix.latitude, fix.longitude
            );
            return LocationStatus::Failed(GeolocationError::PositionUnavailable);
        }

        info!(
            "Position fix ({}, {}) accuracy {}m",
            fix.latitude, fix.longitude, fix.accuracy
        );
        self.current_location = Some(fix);

        match catalog.find_nearest(&fix.location(), self.max_distance_km) {
            Some(resolved) => {
                info!(
                    "Nearest station {} ({:.1} km)",
                    resolved.station.name, resolved.distance
                );
                self.selected_station = Some(resolved.station.clone());
                LocationStatus::Resolved {
                    station: resolved,
                    accuracy: fix.accuracy,
                }
            }
            None => {
                warn!("No station within {} km", self.max_distance_km);
                LocationStatus::NoStationInRange {
                    max_distance_km: self.max_distance_km,
                }
            }
        }
    }

    /// A failed fix leaves the session untouched
    pub fn on_position_error(&self, err: GeolocationError) -> LocationStatus {
        warn!("Position unavailable: {err}");
        LocationStatus::Failed(err)
    }

    pub fn select_station(&mut self, station_id: &str, catalog: &AmedasStations) -> Result<&AmedasStation> {
        let station = catalog
            .find_station_by_id(station_id)
            .ok_or_else(|| Error::StationNotFound(station_id.to_string()))?;
        info!("Station {} ({}) selected manually", station.name, station.station_id);
        Ok(self.selected_station.insert(station.clone()))
    }

    pub fn clear_station(&mut self) {
        self.selected_station = None;
    }

    pub fn set_image(&mut self, slot: ImageSlot, image: CapturedImage) {
        self.images.set(slot, image);
    }

    pub fn select_image(&mut self, slot: ImageSlot, bytes: &[u8], captured_at: DateTime<Utc>) -> Result<()> {
        self.images.select(slot, bytes, captured_at)
    }

    pub fn remove_image(&mut self, slot: ImageSlot) -> Option<CapturedImage> {
        self.images.remove(slot)
    }

    pub fn target(&self) -> Option<RequestTarget> {
        RequestTarget::resolve(self.selected_station.as_ref(), self.current_location.as_ref())
    }

    pub fn build_request(&self) -> HeatRiskRequest {
        build_payload(self.age_group, self.target().as_ref(), &self.images)
    }

    /// Builds the request and submits it. Always resolves to one outcome.
    pub async fn fetch(&self, client: &HeatRiskClient) -> Outcome {
        let request = self.build_request();
        client.submit(&request).await
    }
}
