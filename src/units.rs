use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Units {
    Metric,
    English,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::English => "english",
        }
    }

    /// Label for great circle distances in this unit system
    pub fn distance_label(&self, abbrev: bool) -> &'static str {
        match (self, abbrev) {
            (Units::Metric, true) => "km",
            (Units::Metric, false) => "kilometers",
            (Units::English, true) => "mi",
            (Units::English, false) => "miles",
        }
    }

    pub fn convert_distance(&self, destination: &Units, value: f64) -> f64 {
        match (self, destination) {
            (Units::Metric, Units::English) => value / 1.609344,
            (Units::English, Units::Metric) => value * 1.609344,
            _ => value,
        }
    }

    pub fn earths_radius(&self) -> f64 {
        match self {
            Units::Metric => 6371.0,
            Units::English => 3956.0,
        }
    }
}

impl Default for Units {
    fn default() -> Self {
        Units::Metric
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataParseError {
    InvalidString,
}

impl fmt::Display for DataParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataParseError::InvalidString => f.write_str("invalid string value"),
        }
    }
}

impl std::error::Error for DataParseError {}

impl FromStr for Units {
    type Err = DataParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metric" => Ok(Units::Metric),
            "english" => Ok(Units::English),
            _ => Err(DataParseError::InvalidString),
        }
    }
}
