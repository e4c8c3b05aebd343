//! Twelve Data market-data adapter (RapidAPI gateway).

pub mod rest;
pub mod types;

pub use rest::{TwelveDataClient, DEFAULT_BASE_URL, DEFAULT_RAPIDAPI_HOST};
