use chrono::Local;
use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    error::Result,
    risk::{AgeGroup, RiskLevel, RiskThresholds},
};

pub const CONNECTION_FAILURE_ERROR: &str = "API接続失敗";
pub const CONNECTION_FAILURE_MESSAGE: &str =
    "すべてのAPIエンドポイントへの接続に失敗しました。しばらく時間をおいて再度お試しください。";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub station: Option<String>,
    pub station_id: Option<String>,
    pub time: Option<String>,
    /// °C
    pub temperature: Option<f64>,
    /// %
    pub humidity: Option<f64>,
    /// m/s
    pub wind_speed: Option<f64>,
    /// MJ/m²
    pub solar_radiation: Option<f64>,
    pub sunshine: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WbgtAnalysis {
    pub wbgt: Option<f64>,
    pub calculation_method: Option<String>,
    pub data_source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgeGroupAnalysis {
    pub target_age_group: Option<String>,
    /// Level name as the backend computed it. Display uses the local classification.
    pub risk_level: Option<String>,
    pub risk_color: Option<String>,
    pub advice_message: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
    pub ai_advice: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildTemperatureAnalysis {
    pub adult_temperature: Option<f64>,
    pub child_feels_like_min: Option<f64>,
    pub child_feels_like_max: Option<f64>,
}

/// The AI blocks below are copied from model output, so their shape is not
/// guaranteed. Fields of the wrong shape degrade instead of failing the response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyRecommendations {
    #[serde(default, deserialize_with = "lenient_strings")]
    pub general: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub age_specific: Vec<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub ai_generated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    #[serde(default, deserialize_with = "lenient_text")]
    pub ai_analysis: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub environmental_factors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub heat_risk_factors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub ai_generated: bool,
    #[serde(default, deserialize_with = "lenient_number")]
    pub ai_confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonAnalysis {
    #[serde(default, deserialize_with = "lenient_text")]
    pub ai_analysis: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub time_difference: Option<f64>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub changes_detected: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub ai_generated: bool,
    #[serde(default, deserialize_with = "lenient_number")]
    pub ai_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiFeatures {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub fallback_mode: bool,
    pub model: Option<String>,
}

/// Everything the analysis endpoint may answer, success or error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatRiskResponse {
    pub observation: Option<Observation>,
    pub wbgt_analysis: Option<WbgtAnalysis>,
    pub age_group_analysis: Option<AgeGroupAnalysis>,
    pub child_temperature_analysis: Option<ChildTemperatureAnalysis>,
    #[serde(default, deserialize_with = "lenient_block")]
    pub safety_recommendations: Option<SafetyRecommendations>,
    #[serde(default, deserialize_with = "lenient_block")]
    pub image_analysis: Option<ImageAnalysis>,
    #[serde(default, deserialize_with = "lenient_block")]
    pub comparison_analysis: Option<ComparisonAnalysis>,
    #[serde(default, deserialize_with = "lenient_block")]
    pub ai_features: Option<AiFeatures>,

    pub error: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
}

impl HeatRiskResponse {
    pub fn from_json(raw_data: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw_data)?)
    }

    /// Payload reported when every endpoint failed
    pub fn connection_failure() -> Self {
        HeatRiskResponse {
            error: Some(CONNECTION_FAILURE_ERROR.to_string()),
            message: Some(CONNECTION_FAILURE_MESSAGE.to_string()),
            timestamp: Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            ai_features: Some(AiFeatures {
                enabled: false,
                fallback_mode: true,
                model: None,
            }),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn heat_index(&self) -> Option<f64> {
        self.wbgt_analysis.as_ref().and_then(|w| w.wbgt)
    }

    pub fn observed_station_id(&self) -> Option<&str> {
        self.observation
            .as_ref()
            .and_then(|o| o.station_id.as_deref())
    }

    /// Age label the response is for, else the caller's selection
    pub fn target_age_label(&self, selected: AgeGroup) -> String {
        self.age_group_analysis
            .as_ref()
            .and_then(|a| a.target_age_group.clone())
            .unwrap_or_else(|| selected.to_string())
    }

    pub fn ai_advice(&self) -> Option<&str> {
        self.age_group_analysis
            .as_ref()
            .and_then(|a| a.ai_advice.as_deref().or(a.advice_message.as_deref()))
    }

    /// Classifies the heat index locally. Error payloads are always `Unknown`.
    pub fn assess(&self, thresholds: &RiskThresholds, selected: AgeGroup) -> Assessment {
        let age_label = self.target_age_label(selected);
        let heat_index = if self.is_error() { None } else { self.heat_index() };
        let age_group = AgeGroup::from_label_or_default(&age_label);

        Assessment {
            level: thresholds.classify(heat_index, age_group),
            marker_position: thresholds.marker_position(heat_index, age_group),
            age_group,
            heat_index,
        }
    }
}

/// Locally derived view of a response
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Assessment {
    pub age_group: AgeGroup,
    pub heat_index: Option<f64>,
    pub level: RiskLevel,
    pub marker_position: f64,
}

impl Assessment {
    pub fn gauge_percentage(&self) -> u8 {
        self.level.gauge_percentage()
    }

    pub fn color(&self) -> &'static str {
        self.level.color()
    }
}

/// The single final result of a submission
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(HeatRiskResponse),
    Failure(HeatRiskResponse),
}

impl Outcome {
    /// Error payloads from the backend count as failures
    pub fn from_response(response: HeatRiskResponse) -> Self {
        if response.is_error() {
            Outcome::Failure(response)
        } else {
            Outcome::Success(response)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn response(&self) -> &HeatRiskResponse {
        match self {
            Outcome::Success(response) | Outcome::Failure(response) => response,
        }
    }

    pub fn into_response(self) -> HeatRiskResponse {
        match self {
            Outcome::Success(response) | Outcome::Failure(response) => response,
        }
    }
}

/// A block that does not fit its struct at all is dropped
fn lenient_block<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => Ok(T::deserialize(value)
            .map_err(|err| warn!("Dropping malformed response block: {err}"))
            .ok()),
    }
}

/// Flattens strings out of any shape: a single string, nested lists, or
/// maps keyed by anything. Other scalars keep their JSON text.
fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut strings = Vec::new();
    collect_strings(Value::deserialize(deserializer)?, &mut strings);
    Ok(strings)
}

fn collect_strings(value: Value, strings: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => strings.push(s),
        Value::Array(items) => items
            .into_iter()
            .for_each(|item| collect_strings(item, strings)),
        Value::Object(map) => map
            .into_iter()
            .for_each(|(_, item)| collect_strings(item, strings)),
        other => strings.push(other.to_string()),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}
