use std::{collections::HashSet, fmt, fs, path::Path};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::{de::Visitor, Deserialize, Deserializer, Serialize};

use crate::{
    error::{Error, Result},
    location::Location,
    nearest::{find_nearest, ResolvedStation},
    station::Station,
};

/// Station data file shipped with the crate
const BUNDLED_STATIONS: &str = include_str!("../data/amedas_stations.json");

/// Major city stations used when no station file can be read
const FALLBACK_STATIONS: [(&str, &str, f64, f64, &str, &str); 15] = [
    ("44132", "東京", 35.6895, 139.6917, "tokyo", "kanto"),
    ("44136", "練馬", 35.7370, 139.6569, "tokyo", "kanto"),
    ("47772", "大阪", 34.6937, 135.5023, "osaka", "kansai"),
    ("47636", "名古屋", 35.1815, 136.9066, "aichi", "chubu"),
    ("82182", "福岡", 33.5819, 130.4011, "fukuoka", "kyushu"),
    ("12741", "札幌", 43.0642, 141.3469, "hokkaido", "hokkaido"),
    ("34106", "仙台", 38.2681, 140.8719, "miyagi", "tohoku"),
    ("46106", "横浜", 35.4437, 139.6380, "kanagawa", "kanto"),
    ("46141", "川崎", 35.5513, 139.6825, "kanagawa", "kanto"),
    ("43041", "さいたま", 35.8617, 139.6453, "saitama", "kanto"),
    ("43056", "熊谷", 36.1450, 139.3886, "saitama", "kanto"),
    ("45142", "千葉", 35.6058, 140.1069, "chiba", "kanto"),
    ("45212", "船橋", 35.6943, 139.9833, "chiba", "kanto"),
    ("63106", "神戸", 34.6913, 135.1831, "hyogo", "kansai"),
    ("91107", "那覇", 26.2072, 127.6792, "okinawa", "okinawa"),
];

/// A single AMeDAS weather observation point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmedasStation {
    #[serde(rename = "id", deserialize_with = "string_from_str_or_number")]
    pub station_id: String,
    pub name: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    #[serde(default)]
    pub prefecture: String,
    #[serde(default)]
    pub region: String,
}

impl AmedasStation {
    pub fn new(
        station_id: &str,
        name: &str,
        location: (f64, f64),
        prefecture: &str,
        region: &str,
    ) -> Self {
        Self {
            station_id: station_id.to_string(),
            name: name.to_string(),
            latitude: location.0,
            longitude: location.1,
            prefecture: prefecture.to_string(),
            region: region.to_string(),
        }
    }
}

impl Station for AmedasStation {
    fn id(&self) -> &str {
        &self.station_id
    }

    fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude, self.name.clone())
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn as_feature(&self) -> Feature {
        self.clone().into()
    }
}

impl From<AmedasStation> for Feature {
    fn from(station: AmedasStation) -> Feature {
        let lnglat: Vec<f64> = vec![station.longitude, station.latitude];
        let geometry = Geometry::new(Value::Point(lnglat));

        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), JsonValue::from(station.id().to_string()));
        properties.insert("name".to_string(), JsonValue::from(station.name()));
        properties.insert("prefecture".to_string(), JsonValue::from(station.prefecture));
        properties.insert("region".to_string(), JsonValue::from(station.region));

        Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// CSV row. Ids stay text so leading zeros survive.
#[derive(Debug, Deserialize)]
struct StationRecord {
    id: String,
    name: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    prefecture: String,
    #[serde(default)]
    region: String,
}

impl From<StationRecord> for AmedasStation {
    fn from(record: StationRecord) -> Self {
        AmedasStation {
            station_id: record.id,
            name: record.name,
            latitude: record.lat,
            longitude: record.lng,
            prefecture: record.prefecture,
            region: record.region,
        }
    }
}

/// The station catalog. Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AmedasStations {
    #[serde(rename = "count")]
    station_count: usize,
    stations: Vec<AmedasStation>,
}

impl AmedasStations {
    /// Parses a JSON array of station records
    pub fn from_raw_data(raw_data: &str) -> Result<Self> {
        let stations: Vec<AmedasStation> = serde_json::from_str(raw_data)?;
        Self::non_empty(stations)
    }

    /// Parses CSV with the columns `id,name,lat,lng,prefecture,region`
    pub fn from_csv(raw_data: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(raw_data.as_bytes());

        let stations = reader
            .deserialize::<StationRecord>()
            .map(|record| record.map(AmedasStation::from))
            .collect::<std::result::Result<Vec<_>, csv::Error>>()?;
        Self::non_empty(stations)
    }

    /// Keeps the first occurrence of every station id, in input order
    pub fn from_stations(stations: Vec<AmedasStation>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(stations.len());
        for station in stations {
            if seen.insert(station.station_id.clone()) {
                unique.push(station);
            } else {
                warn!("Dropping duplicate station id {}", station.station_id);
            }
        }

        AmedasStations {
            station_count: unique.len(),
            stations: unique,
        }
    }

    /// The embedded major city list
    pub fn fallback() -> Self {
        let stations = FALLBACK_STATIONS
            .iter()
            .map(|(id, name, lat, lng, prefecture, region)| {
                AmedasStation::new(id, name, (*lat, *lng), prefecture, region)
            })
            .collect();
        Self::from_stations(stations)
    }

    /// The station file bundled with the crate, or the fallback list if it cannot be parsed
    pub fn bundled() -> Self {
        Self::from_raw_data(BUNDLED_STATIONS).unwrap_or_else(|err| {
            warn!("Failed to parse bundled station data: {err}");
            Self::fallback()
        })
    }

    /// Reads a station file (CSV when the extension says so, JSON otherwise)
    pub fn read(path: &Path) -> Result<Self> {
        let raw_data = fs::read_to_string(path)?;
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        if is_csv {
            Self::from_csv(&raw_data)
        } else {
            Self::from_raw_data(&raw_data)
        }
    }

    /// Loads the catalog. Never fails and never returns an empty catalog:
    /// any read or parse failure falls back to the embedded station list.
    pub fn load(path: Option<&Path>) -> Self {
        let stations = match path {
            Some(path) => Self::read(path).unwrap_or_else(|err| {
                warn!("Failed to load stations from {}: {err}", path.display());
                let fallback = Self::fallback();
                info!("Using fallback station data: {} stations", fallback.len());
                fallback
            }),
            None => Self::bundled(),
        };

        info!("Loaded {} stations", stations.len());
        stations
    }

    pub fn stations(&self) -> &[AmedasStation] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.station_count
    }

    pub fn is_empty(&self) -> bool {
        self.station_count == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AmedasStation> {
        self.stations.iter()
    }

    pub fn find_station_by_id(&self, station_id: &str) -> Option<&AmedasStation> {
        self.stations.iter().find(|s| s.station_id == station_id)
    }

    /// Stations in `prefecture`, in catalog order
    pub fn by_prefecture(&self, prefecture: &str) -> Vec<&AmedasStation> {
        self.stations
            .iter()
            .filter(|s| s.prefecture == prefecture)
            .collect()
    }

    /// Distinct prefectures in catalog order
    pub fn prefectures(&self) -> Vec<&str> {
        self.stations
            .iter()
            .map(|s| s.prefecture.as_str())
            .unique()
            .collect()
    }

    /// Distinct regions in catalog order
    pub fn regions(&self) -> Vec<&str> {
        self.stations
            .iter()
            .map(|s| s.region.as_str())
            .unique()
            .collect()
    }

    /// Prefectures grouped under their region, both in catalog order
    pub fn prefectures_by_region(&self) -> Vec<(&str, Vec<&str>)> {
        let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
        for (region, prefecture) in self
            .stations
            .iter()
            .map(|s| (s.region.as_str(), s.prefecture.as_str()))
            .unique()
        {
            match grouped.iter_mut().find(|(r, _)| *r == region) {
                Some((_, prefectures)) => prefectures.push(prefecture),
                None => grouped.push((region, vec![prefecture])),
            }
        }
        grouped
    }

    pub fn find_nearest(
        &self,
        location: &Location,
        max_distance_km: f64,
    ) -> Option<ResolvedStation<AmedasStation>> {
        let resolved = find_nearest(&self.stations, location, max_distance_km);
        match &resolved {
            Some(r) => debug!(
                "Nearest station to ({}, {}): {} at {:.1} km",
                location.latitude, location.longitude, r.station.name, r.distance
            ),
            None => debug!(
                "No station within {max_distance_km} km of ({}, {})",
                location.latitude, location.longitude
            ),
        }
        resolved
    }

    fn non_empty(stations: Vec<AmedasStation>) -> Result<Self> {
        if stations.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self::from_stations(stations))
    }
}

impl Default for AmedasStations {
    fn default() -> Self {
        Self::fallback()
    }
}

impl<'a> IntoIterator for &'a AmedasStations {
    type Item = &'a AmedasStation;
    type IntoIter = std::slice::Iter<'a, AmedasStation>;

    fn into_iter(self) -> Self::IntoIter {
        self.stations.iter()
    }
}

impl From<AmedasStations> for FeatureCollection {
    fn from(stations: AmedasStations) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: stations
                .stations
                .into_iter()
                .map(Feature::from)
                .collect::<Vec<Feature>>(),
            foreign_members: None,
        }
    }
}

struct StationIdVisitor;

impl<'de> Visitor<'de> for StationIdVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a station id as a string or an integer")
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(v.to_string())
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(v)
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(v.to_string())
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(v.to_string())
    }
}

fn string_from_str_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(StationIdVisitor)
}
