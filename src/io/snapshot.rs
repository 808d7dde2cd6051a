//! Read/write dashboard run JSON files.
//!
//! A snapshot is the full `DashboardRun` (config, feature table, labels,
//! forecast, summary, warnings) so `cdash show` can re-render a past run
//! without touching the network.

use std::fs::File;
use std::path::Path;

use crate::app::pipeline::DashboardRun;
use crate::error::AppError;

/// Write a run snapshot as pretty-printed JSON.
pub fn write_run_json(path: &Path, run: &DashboardRun) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("failed to create run JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, run).map_err(|e| AppError::io(format!("failed to write run JSON: {e}")))?;
    tracing::info!(path = %path.display(), "wrote run snapshot");
    Ok(())
}

/// Read a run snapshot.
pub fn read_run_json(path: &Path) -> Result<DashboardRun, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("failed to open run JSON '{}': {e}", path.display())))?;
    let run: DashboardRun =
        serde_json::from_reader(file).map_err(|e| AppError::io(format!("invalid run JSON: {e}")))?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_run_json(Path::new("/nonexistent/coin-dash/run.json")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn malformed_file_is_an_io_error() {
        let path = std::env::temp_dir().join(format!("coin-dash-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_run_json(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, AppError::Io(_)));
    }
}
