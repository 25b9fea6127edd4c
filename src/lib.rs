pub mod advice;
pub mod amedas_station;
pub mod client;
pub mod config;
pub mod error;
pub mod geolocation;
pub mod location;
pub mod nearest;
pub mod photo;
pub mod request;
pub mod response;
pub mod risk;
pub mod session;
pub mod station;
pub mod units;

pub use error::{Error, Result};
