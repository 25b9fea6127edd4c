use std::{fmt, fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    units::DataParseError,
};

/// Width of the color bar scale above the caution threshold
const COLOR_BAR_SPAN: f64 = 18.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "0-1")]
    Infant,
    #[serde(rename = "2-3")]
    Toddler,
    #[serde(rename = "4-6")]
    Preschooler,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 3] = [AgeGroup::Infant, AgeGroup::Toddler, AgeGroup::Preschooler];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Infant => "0-1",
            AgeGroup::Toddler => "2-3",
            AgeGroup::Preschooler => "4-6",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgeGroup::Infant => "0-1歳（乳児）",
            AgeGroup::Toddler => "2-3歳（幼児）",
            AgeGroup::Preschooler => "4-6歳（幼児・園児）",
        }
    }

    /// Parses a bracket label, falling back to `2-3` for anything unrecognized
    pub fn from_label_or_default(label: &str) -> AgeGroup {
        label.parse().unwrap_or_default()
    }
}

impl Default for AgeGroup {
    fn default() -> Self {
        AgeGroup::Toddler
    }
}

impl FromStr for AgeGroup {
    type Err = DataParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "0-1" => Ok(AgeGroup::Infant),
            "2-3" => Ok(AgeGroup::Toddler),
            "4-6" => Ok(AgeGroup::Preschooler),
            _ => Err(DataParseError::InvalidString),
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display name for an age label as the backend reports it. `adult` is
/// display only and never a selectable bracket.
pub fn age_label_display_name(label: &str) -> Option<&'static str> {
    match label {
        "adult" => Some("大人（成人）"),
        _ => label.parse::<AgeGroup>().ok().map(|a| a.display_name()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    Unknown,
    Safe,
    Caution,
    Warning,
    SevereWarning,
    #[serde(rename = "danger-1")]
    Danger1,
    #[serde(rename = "danger-2")]
    Danger2,
    #[serde(rename = "danger-3")]
    Danger3,
}

impl RiskLevel {
    /// Ranked levels, least severe first
    pub const RANKED: [RiskLevel; 7] = [
        RiskLevel::Safe,
        RiskLevel::Caution,
        RiskLevel::Warning,
        RiskLevel::SevereWarning,
        RiskLevel::Danger1,
        RiskLevel::Danger2,
        RiskLevel::Danger3,
    ];

    /// Position in the severity order, `None` for `Unknown`
    pub fn severity(&self) -> Option<usize> {
        RiskLevel::RANKED.iter().position(|l| l == self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Unknown => "unknown",
            RiskLevel::Safe => "safe",
            RiskLevel::Caution => "caution",
            RiskLevel::Warning => "warning",
            RiskLevel::SevereWarning => "severe-warning",
            RiskLevel::Danger1 => "danger-1",
            RiskLevel::Danger2 => "danger-2",
            RiskLevel::Danger3 => "danger-3",
        }
    }

    /// Japanese label shown to the user, identical to the backend's level names
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Unknown => "不明",
            RiskLevel::Safe => "ほぼ安全",
            RiskLevel::Caution => "注意",
            RiskLevel::Warning => "警戒",
            RiskLevel::SevereWarning => "厳重警戒",
            RiskLevel::Danger1 => "危険レベル1",
            RiskLevel::Danger2 => "高危険レベル2",
            RiskLevel::Danger3 => "非常に危険レベル3",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            RiskLevel::Unknown => "unknown",
            RiskLevel::Safe => "safe",
            RiskLevel::Caution => "caution",
            RiskLevel::Warning => "warning",
            RiskLevel::SevereWarning => "severe",
            RiskLevel::Danger1 => "danger",
            RiskLevel::Danger2 => "high-danger",
            RiskLevel::Danger3 => "extreme-danger",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Unknown => "#607D8B",
            RiskLevel::Safe => "#4CAF50",
            RiskLevel::Caution => "#FFEB3B",
            RiskLevel::Warning => "#FFB74D",
            RiskLevel::SevereWarning => "#FF8C42",
            RiskLevel::Danger1 => "#FF6B6B",
            RiskLevel::Danger2 => "#E53E3E",
            RiskLevel::Danger3 => "#740303",
        }
    }

    /// Fill of the circular gauge, in percent
    pub fn gauge_percentage(&self) -> u8 {
        match self {
            RiskLevel::Unknown => 25,
            RiskLevel::Safe => 18,
            RiskLevel::Caution => 28,
            RiskLevel::Warning => 42,
            RiskLevel::SevereWarning => 58,
            RiskLevel::Danger1 => 72,
            RiskLevel::Danger2 => 82,
            RiskLevel::Danger3 => 92,
        }
    }

    pub fn is_danger(&self) -> bool {
        matches!(
            self,
            RiskLevel::Danger1 | RiskLevel::Danger2 | RiskLevel::Danger3
        )
    }
}

impl FromStr for RiskLevel {
    type Err = DataParseError;

    /// Accepts both the kebab case names and the Japanese labels
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        std::iter::once(RiskLevel::Unknown)
            .chain(RiskLevel::RANKED)
            .find(|level| level.as_str() == s || level.label() == s)
            .ok_or(DataParseError::InvalidString)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimum heat index for each level above `safe`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LevelThresholds {
    pub caution: f64,
    pub warning: f64,
    pub severe_warning: f64,
    #[serde(rename = "danger-1")]
    pub danger_1: f64,
    #[serde(rename = "danger-2")]
    pub danger_2: f64,
    #[serde(rename = "danger-3")]
    pub danger_3: f64,
}

impl LevelThresholds {
    pub const fn new(mins: [f64; 6]) -> Self {
        LevelThresholds {
            caution: mins[0],
            warning: mins[1],
            severe_warning: mins[2],
            danger_1: mins[3],
            danger_2: mins[4],
            danger_3: mins[5],
        }
    }

    /// (level, minimum) pairs in increasing order
    pub fn bands(&self) -> [(RiskLevel, f64); 6] {
        [
            (RiskLevel::Caution, self.caution),
            (RiskLevel::Warning, self.warning),
            (RiskLevel::SevereWarning, self.severe_warning),
            (RiskLevel::Danger1, self.danger_1),
            (RiskLevel::Danger2, self.danger_2),
            (RiskLevel::Danger3, self.danger_3),
        ]
    }

    pub fn minimum(&self, level: RiskLevel) -> Option<f64> {
        self.bands()
            .into_iter()
            .find(|(l, _)| *l == level)
            .map(|(_, min)| min)
    }

    fn is_strictly_increasing(&self) -> bool {
        let bands = self.bands();
        bands.iter().all(|(_, min)| min.is_finite())
            && bands.windows(2).all(|pair| pair[0].1 < pair[1].1)
    }

    /// Scans from the highest minimum down and returns the first band met
    pub fn classify(&self, value: f64) -> RiskLevel {
        self.bands()
            .into_iter()
            .rev()
            .find(|(_, min)| value >= *min)
            .map(|(level, _)| level)
            .unwrap_or(RiskLevel::Safe)
    }
}

/// The one authoritative threshold table, keyed by age bracket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(rename = "0-1")]
    pub infant: LevelThresholds,
    #[serde(rename = "2-3")]
    pub toddler: LevelThresholds,
    #[serde(rename = "4-6")]
    pub preschooler: LevelThresholds,
}

pub const DEFAULT_THRESHOLDS: RiskThresholds = RiskThresholds {
    infant: LevelThresholds::new([16.0, 19.0, 22.0, 25.0, 28.0, 31.0]),
    toddler: LevelThresholds::new([17.0, 20.0, 23.0, 26.0, 29.0, 32.0]),
    preschooler: LevelThresholds::new([18.0, 21.0, 24.0, 27.0, 30.0, 33.0]),
};

impl Default for RiskThresholds {
    fn default() -> Self {
        DEFAULT_THRESHOLDS
    }
}

impl RiskThresholds {
    pub fn from_json(raw_data: &str) -> Result<Self> {
        let thresholds: RiskThresholds = serde_json::from_str(raw_data)?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        for age_group in AgeGroup::ALL {
            if !self.for_age(age_group).is_strictly_increasing() {
                return Err(Error::InvalidThresholds(format!(
                    "{age_group} thresholds must be finite and strictly increasing"
                )));
            }
        }

        // Younger brackets never trigger a level later than older ones
        for pair in AgeGroup::ALL.windows(2) {
            let (younger, older) = (self.for_age(pair[0]), self.for_age(pair[1]));
            for ((level, young_min), (_, old_min)) in younger.bands().into_iter().zip(older.bands()) {
                if young_min > old_min {
                    return Err(Error::InvalidThresholds(format!(
                        "{level} starts at {young_min} for {} but {old_min} for {}",
                        pair[0], pair[1]
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn for_age(&self, age_group: AgeGroup) -> &LevelThresholds {
        match age_group {
            AgeGroup::Infant => &self.infant,
            AgeGroup::Toddler => &self.toddler,
            AgeGroup::Preschooler => &self.preschooler,
        }
    }

    /// Maps a heat index to a level. Absent or non finite values are `Unknown`.
    pub fn classify(&self, value: Option<f64>, age_group: AgeGroup) -> RiskLevel {
        match value {
            Some(v) if v.is_finite() => self.for_age(age_group).classify(v),
            _ => RiskLevel::Unknown,
        }
    }

    /// Same as `classify` for a raw bracket label, unknown labels use `2-3`
    pub fn classify_label(&self, value: Option<f64>, age_label: &str) -> RiskLevel {
        self.classify(value, AgeGroup::from_label_or_default(age_label))
    }

    /// Marker position on the color bar, in percent of its width.
    ///
    /// The bar spans from the caution threshold to 18 above it. Values are
    /// clamped to that span and the marker is kept within [2, 98].
    pub fn marker_position(&self, value: Option<f64>, age_group: AgeGroup) -> f64 {
        let min = self.for_age(age_group).caution;
        let max = min + COLOR_BAR_SPAN;
        let value = value.filter(|v| v.is_finite()).unwrap_or(0.0);
        let clamped = value.clamp(min, max);
        let position = (clamped - min) / (max - min) * 100.0;
        position.clamp(2.0, 98.0)
    }
}

/// Classifies against the built in threshold table
pub fn classify(value: Option<f64>, age_group: AgeGroup) -> RiskLevel {
    DEFAULT_THRESHOLDS.classify(value, age_group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infant_caution_boundary() {
        assert_eq!(classify(Some(16.0), AgeGroup::Infant), RiskLevel::Caution);
        assert_eq!(classify(Some(15.9), AgeGroup::Infant), RiskLevel::Safe);
    }

    #[test]
    fn preschooler_top_band() {
        assert_eq!(classify(Some(33.0), AgeGroup::Preschooler), RiskLevel::Danger3);
        assert_eq!(classify(Some(33.5), AgeGroup::Preschooler), RiskLevel::Danger3);
        assert_eq!(classify(Some(32.9), AgeGroup::Preschooler), RiskLevel::Danger2);
    }

    #[test]
    fn every_band_of_toddler_table() {
        let expected = [
            (10.0, RiskLevel::Safe),
            (17.0, RiskLevel::Caution),
            (20.0, RiskLevel::Warning),
            (23.0, RiskLevel::SevereWarning),
            (26.0, RiskLevel::Danger1),
            (29.0, RiskLevel::Danger2),
            (32.0, RiskLevel::Danger3),
        ];
        for (value, level) in expected {
            assert_eq!(classify(Some(value), AgeGroup::Toddler), level, "value {value}");
        }
    }

    #[test]
    fn younger_brackets_are_more_conservative() {
        assert_eq!(classify(Some(16.5), AgeGroup::Infant), RiskLevel::Caution);
        assert_eq!(classify(Some(16.5), AgeGroup::Toddler), RiskLevel::Safe);
        assert_eq!(classify(Some(17.5), AgeGroup::Preschooler), RiskLevel::Safe);
    }

    #[test]
    fn invalid_values_are_unknown() {
        assert_eq!(classify(None, AgeGroup::Toddler), RiskLevel::Unknown);
        assert_eq!(classify(Some(f64::NAN), AgeGroup::Toddler), RiskLevel::Unknown);
        assert_eq!(classify(Some(f64::INFINITY), AgeGroup::Infant), RiskLevel::Unknown);
    }

    #[test]
    fn classification_is_monotonic() {
        for age_group in AgeGroup::ALL {
            let mut previous = 0;
            let mut value = -10.0;
            while value < 45.0 {
                let severity = classify(Some(value), age_group).severity().unwrap();
                assert!(severity >= previous, "{age_group} at {value}");
                previous = severity;
                value += 0.1;
            }
        }
    }

    #[test]
    fn unknown_label_uses_toddler_table() {
        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.classify_label(Some(17.0), "adult"), RiskLevel::Caution);
        assert_eq!(thresholds.classify_label(Some(17.0), "0-1"), RiskLevel::Caution);
        assert_eq!(thresholds.classify_label(Some(17.0), "4-6"), RiskLevel::Safe);
    }

    #[test]
    fn derived_values_follow_level() {
        let level = classify(Some(30.0), AgeGroup::Preschooler);
        assert_eq!(level, RiskLevel::Danger2);
        assert_eq!(level.gauge_percentage(), 82);
        assert_eq!(level.color(), "#E53E3E");
        assert_eq!(RiskLevel::Unknown.gauge_percentage(), 25);
    }

    #[test]
    fn parse_levels() {
        assert_eq!("severe-warning".parse::<RiskLevel>(), Ok(RiskLevel::SevereWarning));
        assert_eq!("厳重警戒".parse::<RiskLevel>(), Ok(RiskLevel::SevereWarning));
        assert_eq!("非常に危険レベル3".parse::<RiskLevel>(), Ok(RiskLevel::Danger3));
        assert_eq!("不明".parse::<RiskLevel>(), Ok(RiskLevel::Unknown));
        assert!("extreme".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn level_serde_names() {
        assert_eq!(serde_json::to_string(&RiskLevel::Danger1).unwrap(), "\"danger-1\"");
        assert_eq!(serde_json::to_string(&RiskLevel::SevereWarning).unwrap(), "\"severe-warning\"");
        assert_eq!(serde_json::to_string(&AgeGroup::Infant).unwrap(), "\"0-1\"");
    }

    #[test]
    fn marker_position_is_clamped() {
        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.marker_position(None, AgeGroup::Toddler), 2.0);
        assert_eq!(thresholds.marker_position(Some(50.0), AgeGroup::Toddler), 98.0);
        let middle = thresholds.marker_position(Some(26.0), AgeGroup::Toddler);
        assert!((middle - 50.0).abs() < 1e-9);
    }

    #[test]
    fn threshold_override_from_json() {
        let raw = r#"{
            "0-1": {"caution": 15, "warning": 18, "severe-warning": 21, "danger-1": 24, "danger-2": 27, "danger-3": 30},
            "2-3": {"caution": 17, "warning": 20, "severe-warning": 23, "danger-1": 26, "danger-2": 29, "danger-3": 32},
            "4-6": {"caution": 18, "warning": 21, "severe-warning": 24, "danger-1": 27, "danger-2": 30, "danger-3": 33}
        }"#;
        let thresholds = RiskThresholds::from_json(raw).unwrap();
        assert_eq!(thresholds.classify(Some(15.0), AgeGroup::Infant), RiskLevel::Caution);
        assert_eq!(thresholds.for_age(AgeGroup::Infant).minimum(RiskLevel::Danger3), Some(30.0));
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        let mut thresholds = RiskThresholds::default();
        thresholds.preschooler.warning = 40.0;
        assert!(matches!(thresholds.validate(), Err(Error::InvalidThresholds(_))));
    }

    #[test]
    fn inverted_brackets_are_rejected() {
        let mut thresholds = RiskThresholds::default();
        thresholds.infant.danger_2 = 29.5;
        thresholds.infant.danger_3 = 31.0;
        assert!(thresholds.infant.is_strictly_increasing());
        assert!(matches!(thresholds.validate(), Err(Error::InvalidThresholds(_))));

        // Equal thresholds across brackets are allowed
        let mut thresholds = RiskThresholds::default();
        thresholds.infant = thresholds.toddler.clone();
        assert!(thresholds.validate().is_ok());
        assert!(RiskThresholds::default().validate().is_ok());
    }

    #[test]
    fn age_display_names() {
        assert_eq!(age_label_display_name("adult"), Some("大人（成人）"));
        assert_eq!(age_label_display_name("0-1"), Some("0-1歳（乳児）"));
        assert_eq!(age_label_display_name("7-9"), None);
        assert!("adult".parse::<AgeGroup>().is_err());
    }
}
