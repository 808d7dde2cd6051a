//! Input/output helpers.
//!
//! - feature table exports (CSV) (`export`)
//! - dashboard run JSON read/write (`snapshot`)

pub mod export;
pub mod snapshot;

pub use export::*;
pub use snapshot::*;
