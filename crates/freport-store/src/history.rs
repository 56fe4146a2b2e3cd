//! History tracking.
//!
//! The store does not own where history lives. A [`HistorySource`] is handed
//! to it at construction; the tracker only orders and queries what the source
//! returns.
//!
//! [`JsonlHistory`] keeps one [`HistoryDataPoint`] per line in an append-only
//! file, so a new report run adds a single line.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use freport_error::{ReportError, Result};
use freport_types::{HistoryDataPoint, HistoryTestResult, TestResult};
use tracing::{debug, info, warn};

/// Capability to load and extend the run history.
pub trait HistorySource: Send + Sync {
    /// Load every known data point, in any order.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be read.
    fn read_history(&self) -> Result<Vec<HistoryDataPoint>>;

    /// Persist one more data point.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing storage cannot be written.
    fn append_history(&mut self, point: HistoryDataPoint) -> Result<()>;
}

/// History held in memory; the usual fake for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    points: Vec<HistoryDataPoint>,
}

impl InMemoryHistory {
    #[must_use]
    pub fn new(points: Vec<HistoryDataPoint>) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn points(&self) -> &[HistoryDataPoint] {
        &self.points
    }
}

impl HistorySource for InMemoryHistory {
    fn read_history(&self) -> Result<Vec<HistoryDataPoint>> {
        Ok(self.points.clone())
    }

    fn append_history(&mut self, point: HistoryDataPoint) -> Result<()> {
        self.points.push(point);
        Ok(())
    }
}

/// JSON-lines history file.
#[derive(Debug, Clone)]
pub struct JsonlHistory {
    path: PathBuf,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn history_io(path: &Path, action: &str, err: &std::io::Error) -> ReportError {
    ReportError::history(format!("cannot {action} {}: {err}", path.display()))
}

impl HistorySource for JsonlHistory {
    /// A missing file is an empty history. Blank lines are skipped, and so is
    /// a line that fails to decode, with a warning.
    fn read_history(&self) -> Result<Vec<HistoryDataPoint>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "history file absent; starting empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(history_io(&self.path, "open", &err)),
        };
        let mut points = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|err| history_io(&self.path, "read", &err))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(point) => points.push(point),
                Err(err) => warn!(
                    path = %self.path.display(),
                    line = idx + 1,
                    error = %err,
                    "malformed history line skipped"
                ),
            }
        }
        Ok(points)
    }

    fn append_history(&mut self, point: HistoryDataPoint) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| history_io(parent, "create directory", &err))?;
        }
        let mut line = serde_json::to_string(&point)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| history_io(&self.path, "open", &err))?;
        file.write_all(line.as_bytes())
            .map_err(|err| history_io(&self.path, "write", &err))?;
        Ok(())
    }
}

/// Loaded history, newest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryTracker {
    points: Vec<HistoryDataPoint>,
    limit: Option<usize>,
}

impl HistoryTracker {
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            points: Vec::new(),
            limit,
        }
    }

    /// Replace the loaded points; sorts newest first and applies the limit.
    pub fn load(&mut self, mut points: Vec<HistoryDataPoint>) {
        points.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = self.limit {
            if points.len() > limit {
                warn!(
                    loaded = points.len(),
                    limit,
                    "history truncated to newest data points"
                );
                points.truncate(limit);
            }
        }
        info!(points = points.len(), "history loaded");
        self.points = points;
    }

    #[must_use]
    pub fn data_points(&self) -> &[HistoryDataPoint] {
        &self.points
    }

    /// Summaries recorded for `history_id`, newest first.
    #[must_use]
    pub fn by_history_id(&self, history_id: &str) -> Vec<&HistoryTestResult> {
        self.points
            .iter()
            .filter_map(|point| point.test_results.get(history_id))
            .collect()
    }

    /// Whether any data point has seen this test case.
    #[must_use]
    pub fn knows_test_case(&self, test_case_id: &str) -> bool {
        self.points
            .iter()
            .any(|point| point.known_test_case_ids.contains(test_case_id))
    }
}

/// History summary of one visible result.
#[must_use]
pub fn summarize(tr: &TestResult) -> HistoryTestResult {
    HistoryTestResult {
        id: tr.id.clone(),
        name: tr.name.clone(),
        full_name: tr.full_name.clone(),
        history_id: tr.history_id.clone(),
        status: tr.status,
        status_details: tr.status_details.clone(),
        start: Some(tr.start),
        stop: tr.stop,
        duration: tr.duration,
        environment: Some(tr.environment.clone()),
        labels: tr.labels.clone(),
    }
}
