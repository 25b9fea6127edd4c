/// Error types for the heat risk library
use thiserror::Error;

/// Main error type for heat risk operations
#[derive(Error, Debug)]
pub enum Error {
    /// Reading a local file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or serialize JSON
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to build a regular expression
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("Endpoint {url} answered with status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Endpoint url cannot be used
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A wrapped GET response carried no `contents` body
    #[error("Wrapped response from {0} has no contents")]
    MissingContents(String),

    /// Selected file is not a usable image
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Threshold table is not strictly increasing
    #[error("Invalid threshold table: {0}")]
    InvalidThresholds(String),

    /// Search radius is negative or NaN
    #[error("Invalid search radius: {0} km")]
    InvalidRadius(f64),

    /// Station id is not present in the catalog
    #[error("Station not found: {0}")]
    StationNotFound(String),

    /// A station file parsed but held no stations
    #[error("Station catalog is empty")]
    EmptyCatalog,
}

/// Type alias for Results using the heat risk Error
pub type Result<T> = std::result::Result<T, Error>;
