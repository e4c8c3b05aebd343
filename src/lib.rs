//! Online one-step-ahead ARMA price forecasting against a polled
//! market-data feed.

pub mod config;
pub mod error;
pub mod model;
pub mod predictor;
pub mod regression;
pub mod report;
pub mod session;
pub mod storage;
pub mod twelvedata;
