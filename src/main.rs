//! heatrisk - outdoor heat risk for small children, by AMeDAS station.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use geojson::FeatureCollection;
use log::info;

use heatrisk::{
    advice::{format_ai_message, guidance_for_label},
    amedas_station::AmedasStations,
    config::Config,
    geolocation::{LocationStatus, UserLocation},
    nearest::is_valid_radius,
    photo::{CapturedImage, ImageSlot},
    response::{HeatRiskResponse, Outcome},
    risk::{age_label_display_name, AgeGroup, RiskThresholds},
    session::SessionState,
    units::Units,
};

#[derive(Parser)]
#[command(
    name = "heatrisk",
    version,
    about = "Outdoor heat risk for children aged 0-6"
)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the nearest station to a position
    Nearest {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Search radius in km, overrides the config
        #[arg(long, value_parser = parse_radius)]
        max_distance: Option<f64>,
        /// Units used to print the distance (metric or english)
        #[arg(long, default_value_t = Units::Metric)]
        units: Units,
    },

    /// List stations of a prefecture, or every prefecture by region
    Stations {
        #[arg(short, long)]
        prefecture: Option<String>,
    },

    /// Classify a heat index value for an age bracket
    Classify {
        #[arg(long, allow_hyphen_values = true)]
        wbgt: f64,
        #[arg(short, long, default_value_t = AgeGroup::Toddler)]
        age: AgeGroup,
    },

    /// Request a full assessment from the analysis service
    Assess {
        #[arg(short, long, default_value_t = AgeGroup::Toddler)]
        age: AgeGroup,
        /// Station id, wins over coordinates
        #[arg(short, long)]
        station: Option<String>,
        #[arg(long, allow_hyphen_values = true, requires = "lng")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,
        /// Accuracy of the position in meters
        #[arg(long, default_value_t = 0.0)]
        accuracy: f64,
        /// A single photo of the play area
        #[arg(long, conflicts_with_all = ["before", "after"])]
        image: Option<PathBuf>,
        /// Photo taken before going out
        #[arg(long, requires = "after")]
        before: Option<PathBuf>,
        /// Photo taken after coming back
        #[arg(long, requires = "before")]
        after: Option<PathBuf>,
    },

    /// Print the station catalog as GeoJSON
    Geojson,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Nearest {
            lat,
            lng,
            max_distance,
            units,
        } => nearest(&config, lat, lng, max_distance, units),
        Command::Stations { prefecture } => stations(&config, prefecture.as_deref()),
        Command::Classify { wbgt, age } => classify(&config, wbgt, age),
        Command::Assess {
            age,
            station,
            lat,
            lng,
            accuracy,
            image,
            before,
            after,
        } => {
            let mut session = SessionState::new(age, config.max_distance_km);
            let catalog = config.stations();

            if let (Some(lat), Some(lng)) = (lat, lng) {
                let status = session.on_position(UserLocation::new(lat, lng, accuracy), &catalog);
                println!("{status}");
            }
            if let Some(station) = station {
                session.select_station(&station, &catalog)?;
            }
            if let Some(path) = image {
                session.set_image(ImageSlot::After, read_image(&path)?);
            }
            if let (Some(before), Some(after)) = (before, after) {
                session.set_image(ImageSlot::Before, read_image(&before)?);
                session.set_image(ImageSlot::After, read_image(&after)?);
            }

            assess(&config, &session).await
        }
        Command::Geojson => {
            let collection = FeatureCollection::from(config.stations());
            println!("{}", serde_json::to_string_pretty(&collection)?);
            Ok(())
        }
    }
}

fn nearest(
    config: &Config,
    lat: f64,
    lng: f64,
    max_distance: Option<f64>,
    units: Units,
) -> anyhow::Result<()> {
    let catalog = config.stations();
    let max_distance_km = max_distance.unwrap_or(config.max_distance_km);
    let mut session = SessionState::new(AgeGroup::default(), max_distance_km);

    let status = session.on_position(UserLocation::new(lat, lng, 0.0), &catalog);
    match &status {
        LocationStatus::Resolved { station, .. } => {
            let distance = Units::Metric.convert_distance(&units, station.distance);
            println!(
                "{} {} ({}) {:.1} {}",
                station.station.station_id,
                station.station.name,
                station.station.prefecture,
                distance,
                units.distance_label(true)
            );
        }
        _ => println!("{status}"),
    }
    Ok(())
}

fn stations(config: &Config, prefecture: Option<&str>) -> anyhow::Result<()> {
    let catalog: AmedasStations = config.stations();

    match prefecture {
        Some(prefecture) => {
            let stations = catalog.by_prefecture(prefecture);
            if stations.is_empty() {
                bail!("No stations in prefecture {prefecture}");
            }
            for station in stations {
                println!(
                    "{}\t{}\t{:.4}\t{:.4}",
                    station.station_id, station.name, station.latitude, station.longitude
                );
            }
        }
        None => {
            for (region, prefectures) in catalog.prefectures_by_region() {
                println!("{region}: {}", prefectures.join(", "));
            }
        }
    }
    Ok(())
}

fn classify(config: &Config, wbgt: f64, age: AgeGroup) -> anyhow::Result<()> {
    let thresholds = config.thresholds()?;
    let level = thresholds.classify(Some(wbgt), age);
    println!(
        "{} ({}): {} [{}] gauge {}% marker {:.0}%",
        age.display_name(),
        wbgt,
        level.label(),
        level.color(),
        level.gauge_percentage(),
        thresholds.marker_position(Some(wbgt), age)
    );
    Ok(())
}

async fn assess(config: &Config, session: &SessionState) -> anyhow::Result<()> {
    let thresholds = config.thresholds()?;
    let client = config.client()?;

    let outcome = session.fetch(&client).await;
    info!("Request finished, success: {}", outcome.is_success());

    let response = outcome.response();
    print_assessment(response, &thresholds, session.age_group)?;

    if let Outcome::Failure(response) = &outcome {
        if let Some(error) = &response.error {
            println!("{error}");
        }
        if let Some(message) = &response.message {
            println!("{message}");
        }
    }
    Ok(())
}

fn print_assessment(
    response: &HeatRiskResponse,
    thresholds: &RiskThresholds,
    selected: AgeGroup,
) -> anyhow::Result<()> {
    let assessment = response.assess(thresholds, selected);
    let age_label = response.target_age_label(selected);

    match assessment.heat_index {
        Some(value) => println!("WBGT {value:.1}"),
        None => println!("WBGT ?"),
    }
    println!(
        "{}: {} [{}] gauge {}%",
        age_label_display_name(&age_label).unwrap_or(age_label.as_str()),
        assessment.level.label(),
        assessment.color(),
        assessment.gauge_percentage()
    );

    if let Some(observation) = &response.observation {
        if let Some(station) = &observation.station {
            println!("観測所: {station}");
        }
        if let Some(temperature) = observation.temperature {
            println!("気温: {temperature}°C");
        }
        if let Some(humidity) = observation.humidity {
            println!("湿度: {humidity}%");
        }
    }

    if let Some(advice) = response.ai_advice() {
        println!();
        for line in format_ai_message(advice)? {
            println!("{line}");
        }
    }

    let guidance = guidance_for_label(&age_label);
    println!();
    println!("{}", guidance.title);
    for item in guidance.items {
        println!("[{}]", item.title);
        for line in item.lines {
            println!("  {line}");
        }
    }
    Ok(())
}

fn read_image(path: &Path) -> anyhow::Result<CapturedImage> {
    let captured_at: DateTime<Utc> = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(DateTime::from)
        .unwrap_or_else(|_| Utc::now());
    CapturedImage::from_path(path, captured_at)
        .with_context(|| format!("Failed to read image {}", path.display()))
}

fn parse_radius(raw: &str) -> Result<f64, String> {
    let radius: f64 = raw.parse().map_err(|err| format!("{err}"))?;
    if is_valid_radius(radius) {
        Ok(radius)
    } else {
        Err(format!("radius must be zero or more kilometers, got {raw}"))
    }
}
