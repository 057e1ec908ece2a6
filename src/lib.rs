pub mod analytics;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod pagination;
pub mod records;
pub mod tracking;
pub mod transport;

pub use client::{Direction, FlightClient, FlightFilters, FlightQuery};
pub use error::{DateFailure, FlightError, FlightResult};
