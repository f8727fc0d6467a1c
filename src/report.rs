use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{Archive, Compression, ProductCategory, ProductRequest};
use crate::error::GnssError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    AlreadyExisted,
    Succeeded,
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::AlreadyExisted => write!(f, "exists"),
            OutcomeStatus::Succeeded => write!(f, "ok"),
            OutcomeStatus::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub requested_url: String,
    pub local_path: Utf8PathBuf,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_suffix: Option<Compression>,
    /// Archive that supplied the file; for union requests this tells which
    /// side won.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Archive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FetchOutcome {
    pub fn already_existed(requested_url: String, local_path: Utf8PathBuf) -> Self {
        Self {
            requested_url,
            local_path,
            status: OutcomeStatus::AlreadyExisted,
            used_suffix: None,
            provenance: None,
            detail: None,
        }
    }

    pub fn succeeded(
        requested_url: String,
        local_path: Utf8PathBuf,
        used_suffix: Compression,
        provenance: Archive,
    ) -> Self {
        Self {
            requested_url,
            local_path,
            status: OutcomeStatus::Succeeded,
            used_suffix: Some(used_suffix),
            provenance: Some(provenance),
            detail: None,
        }
    }

    /// A leftover intermediate from an earlier run was converted. Nothing was
    /// downloaded, and for union requests the supplying archive is unknown.
    pub fn reconverted(
        requested_url: String,
        local_path: Utf8PathBuf,
        provenance: Option<Archive>,
    ) -> Self {
        Self {
            requested_url,
            local_path,
            status: OutcomeStatus::Succeeded,
            used_suffix: None,
            provenance,
            detail: Some("converted intermediate left by an earlier run".to_string()),
        }
    }

    pub fn failed(requested_url: String, local_path: Utf8PathBuf, detail: String) -> Self {
        Self {
            requested_url,
            local_path,
            status: OutcomeStatus::Failed,
            used_suffix: None,
            provenance: None,
            detail: Some(detail),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// Receives exactly one outcome per request. Implementations must not panic;
/// sink-side failures are logged and swallowed.
pub trait OutcomeSink: Send + Sync {
    fn report(&self, request: &ProductRequest, outcome: &FetchOutcome);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl OutcomeSink for TracingReporter {
    fn report(&self, request: &ProductRequest, outcome: &FetchOutcome) {
        match outcome.status {
            OutcomeStatus::Failed => warn!(
                category = %request.category,
                subject = %request.subject,
                epoch = %request.epoch,
                url = %outcome.requested_url,
                detail = outcome.detail.as_deref().unwrap_or(""),
                "fetch failed"
            ),
            status => info!(
                category = %request.category,
                subject = %request.subject,
                epoch = %request.epoch,
                path = %outcome.local_path,
                %status,
                "fetched"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    Overwrite,
    #[default]
    Append,
}

/// Plain-text log, one line per attempted file.
#[derive(Debug)]
pub struct LogFileReporter {
    path: Utf8PathBuf,
    file: Mutex<File>,
}

impl LogFileReporter {
    pub fn open(path: &Utf8Path, mode: LogMode) -> Result<Self, GnssError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent.as_std_path())
                .map_err(|err| GnssError::Filesystem(err.to_string()))?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            LogMode::Append => options.append(true),
            LogMode::Overwrite => options.write(true).truncate(true),
        };
        let file = options
            .open(path.as_std_path())
            .map_err(|err| GnssError::Filesystem(format!("open log {path}: {err}")))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

pub fn log_line(request: &ProductRequest, outcome: &FetchOutcome) -> String {
    let mut line = format!(
        "{} {:<6} {} {} {} {} -> {}",
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        outcome.status.to_string(),
        request.category,
        request.subject,
        request.epoch,
        outcome.requested_url,
        outcome.local_path
    );
    if let Some(archive) = outcome.provenance {
        line.push_str(&format!(" [{archive}]"));
    }
    if let Some(detail) = &outcome.detail {
        line.push_str(&format!(" ({detail})"));
    }
    line
}

impl OutcomeSink for LogFileReporter {
    fn report(&self, request: &ProductRequest, outcome: &FetchOutcome) {
        let line = log_line(request, outcome);
        let Ok(mut file) = self.file.lock() else {
            warn!(path = %self.path, "log file lock poisoned");
            return;
        };
        if let Err(err) = writeln!(file, "{line}") {
            warn!(path = %self.path, error = %err, "failed to append to log");
        }
    }
}

#[derive(Default, Clone)]
pub struct MultiReporter {
    sinks: Vec<Arc<dyn OutcomeSink>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl OutcomeSink for MultiReporter {
    fn report(&self, request: &ProductRequest, outcome: &FetchOutcome) {
        for sink in &self.sinks {
            sink.report(request, outcome);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub request: String,
    pub category: ProductCategory,
    pub archive: Archive,
    #[serde(flatten)]
    pub outcome: FetchOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub already_existed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.already_existed + self.succeeded + self.failed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub summary: Summary,
    pub entries: Vec<ReportEntry>,
}

impl FetchReport {
    pub fn from_entries(entries: Vec<ReportEntry>) -> Self {
        let mut summary = Summary::default();
        for entry in &entries {
            match entry.outcome.status {
                OutcomeStatus::AlreadyExisted => summary.already_existed += 1,
                OutcomeStatus::Succeeded => summary.succeeded += 1,
                OutcomeStatus::Failed => summary.failed += 1,
            }
        }
        Self { summary, entries }
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }
}

/// Collects outcomes in arrival order.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<ReportEntry>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn fetch_report(&self) -> FetchReport {
        FetchReport::from_entries(self.entries())
    }
}

impl OutcomeSink for MemoryReporter {
    fn report(&self, request: &ProductRequest, outcome: &FetchOutcome) {
        let entry = ReportEntry {
            request: request.to_string(),
            category: request.category,
            archive: request.archive,
            outcome: outcome.clone(),
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(_) => warn!("outcome collector lock poisoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::domain::Subject;
    use crate::epoch::Epoch;

    fn request() -> ProductRequest {
        ProductRequest::new(
            ProductCategory::ObservationDaily,
            Epoch::from_year_doy(2021, 6).unwrap(),
            Subject::Site("abpo".parse().unwrap()),
            Archive::Igs,
        )
    }

    fn ok_outcome() -> FetchOutcome {
        FetchOutcome::succeeded(
            "ftp://host/abpo0060.21d.*".to_string(),
            Utf8PathBuf::from("/data/obs/2021/006/abpo0060.21o"),
            Compression::Gzip,
            Archive::Igs,
        )
    }

    #[test]
    fn log_file_appends_one_line_per_outcome() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = dir.join("fetch.log");
        fs::write(&path, "earlier run\n").unwrap();

        let reporter = LogFileReporter::open(&path, LogMode::Append).unwrap();
        reporter.report(&request(), &ok_outcome());
        let failure = FetchOutcome::failed(
            "ftp://host/abpo0070.21d.*".to_string(),
            Utf8PathBuf::from("/data/obs/2021/007/abpo0070.21o"),
            GnssError::FetchFailed {
                url: "ftp://host/abpo0070.21d.*".to_string(),
                pattern: "abpo0070.21d.*".to_string(),
            }
            .to_string(),
        );
        reporter.report(&request(), &failure);
        drop(reporter);

        let content = fs::read_to_string(&path).unwrap();
        let lines = content.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(" ok "));
        assert!(lines[1].ends_with("[igs]"));
        assert!(lines[2].contains("FAILED"));
    }

    #[test]
    fn overwrite_mode_truncates() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = dir.join("fetch.log");
        fs::write(&path, "earlier run\n").unwrap();
        let reporter = LogFileReporter::open(&path, LogMode::Overwrite).unwrap();
        reporter.report(&request(), &ok_outcome());
        drop(reporter);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn multi_reporter_fans_out_and_memory_summarizes() {
        let first = Arc::new(MemoryReporter::new());
        let second = Arc::new(MemoryReporter::new());
        let multi = MultiReporter::new()
            .with(first.clone())
            .with(second.clone());
        multi.report(&request(), &ok_outcome());
        multi.report(
            &request(),
            &FetchOutcome::already_existed(String::new(), Utf8PathBuf::from("/x")),
        );

        let report = first.fetch_report();
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.already_existed, 1);
        assert_eq!(report.summary.total(), 2);
        assert!(!report.has_failures());
        assert_eq!(second.entries().len(), 2);
    }
}
