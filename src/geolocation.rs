use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{amedas_station::AmedasStation, location::Location, nearest::ResolvedStation};

/// A position fix from the device. Only the latest fix is kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius of the fix in meters
    pub accuracy: f64,
}

impl UserLocation {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
        }
    }

    pub fn location(&self) -> Location {
        Location::unnamed(self.latitude, self.longitude)
    }
}

/// Options handed to the position provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeolocationOptions {
    pub enable_high_accuracy: bool,
    /// Give up after this many milliseconds
    pub timeout_ms: u64,
    /// Accept a cached position up to this old, in milliseconds
    pub maximum_age_ms: u64,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: 10_000,
            maximum_age_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeolocationError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown,
}

impl GeolocationError {
    /// Maps the W3C geolocation error codes
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            2 => GeolocationError::PositionUnavailable,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::Unknown,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => "位置情報の利用が拒否されました",
            GeolocationError::PositionUnavailable => "位置情報が取得できませんでした",
            GeolocationError::Timeout => "位置情報の取得がタイムアウトしました",
            GeolocationError::Unknown => "位置情報の取得に失敗しました",
        }
    }

    /// Suggested next step shown under the message
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => "手動で観測所を選択できます",
            GeolocationError::Timeout => "再試行または手動選択が可能です",
            GeolocationError::PositionUnavailable | GeolocationError::Unknown => {
                "手動で観測所を選択してください"
            }
        }
    }
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for GeolocationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Warning,
    Error,
}

/// The location status banner
#[derive(Debug, Clone, PartialEq)]
pub enum LocationStatus {
    Acquiring,
    Unsupported,
    Resolved {
        station: ResolvedStation<AmedasStation>,
        accuracy: f64,
    },
    NoStationInRange {
        max_distance_km: f64,
    },
    Failed(GeolocationError),
}

impl LocationStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            LocationStatus::Resolved { .. } => StatusKind::Success,
            LocationStatus::Acquiring | LocationStatus::NoStationInRange { .. } => {
                StatusKind::Warning
            }
            LocationStatus::Unsupported | LocationStatus::Failed(_) => StatusKind::Error,
        }
    }

    pub fn message(&self) -> String {
        match self {
            LocationStatus::Acquiring => "位置情報を取得中...".to_string(),
            LocationStatus::Unsupported => {
                "このブラウザでは位置情報がサポートされていません".to_string()
            }
            LocationStatus::Resolved { station, .. } => format!(
                "現在地: {}観測所 ({:.1}km)",
                station.station.name, station.distance
            ),
            LocationStatus::NoStationInRange { max_distance_km } => format!(
                "近くに観測所が見つかりませんでした（{max_distance_km}km圏内）"
            ),
            LocationStatus::Failed(err) => err.message().to_string(),
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            LocationStatus::Failed(err) => Some(err.recovery_hint()),
            LocationStatus::NoStationInRange { .. } => Some("手動で観測所を選択してください"),
            _ => None,
        }
    }

    /// Manual station selection is the way forward
    pub fn needs_manual_selection(&self) -> bool {
        matches!(
            self,
            LocationStatus::Unsupported
                | LocationStatus::NoStationInRange { .. }
                | LocationStatus::Failed(_)
        )
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.hint() {
            Some(hint) => write!(f, "{} ({hint})", self.message()),
            None => f.write_str(&self.message()),
        }
    }
}
