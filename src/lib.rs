//! `coin-dash` library crate.
//!
//! The binary (`cdash`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the CLI and TUI front-ends share one pipeline
//! - collaborators (market data, sentiment, models) can be swapped in tests

pub mod anomaly;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod forecast;
pub mod indicators;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod tui;
