//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - run configuration (`DashboardConfig`, `WindowConfig`, ...)
//! - market data (`Bar`, `Series`)
//! - pipeline outputs (`FeatureTable`, `AnomalyLabel`, `PricePrediction`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
