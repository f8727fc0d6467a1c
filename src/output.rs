use std::io::{self, Write};

use serde::Serialize;

use crate::engine::PlannedFetch;
use crate::epoch::Epoch;
use crate::report::FetchReport;

#[derive(Debug, Clone, Serialize)]
pub struct EpochInfo {
    pub date: String,
    pub year: i32,
    pub doy: u32,
    pub gps_week: u32,
    pub day_of_week: u32,
}

impl From<&Epoch> for EpochInfo {
    fn from(epoch: &Epoch) -> Self {
        Self {
            date: epoch.date().to_string(),
            year: epoch.year(),
            doy: epoch.doy(),
            gps_week: epoch.gps_week(),
            day_of_week: epoch.day_of_week(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &FetchReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_plan(plan: &[PlannedFetch]) -> io::Result<()> {
        Self::print_json(&plan)
    }

    pub fn print_epoch(info: &EpochInfo) -> io::Result<()> {
        Self::print_json(info)
    }

    pub fn to_bytes<T: Serialize>(value: &T) -> io::Result<Vec<u8>> {
        serde_json::to_vec_pretty(value).map_err(io::Error::other)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = Self::to_bytes(value)?;
        let mut stdout = io::stdout();
        stdout.write_all(&json)?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_summary(report: &FetchReport) -> io::Result<()> {
        let mut stdout = io::stdout();
        for entry in report.entries.iter().filter(|entry| entry.outcome.is_failure()) {
            writeln!(
                stdout,
                "failed: {} ({})",
                entry.request,
                entry.outcome.detail.as_deref().unwrap_or("unknown error")
            )?;
        }
        let summary = &report.summary;
        writeln!(
            stdout,
            "{} files: {} fetched, {} already present, {} failed",
            summary.total(),
            summary.succeeded,
            summary.already_existed,
            summary.failed
        )
    }

    pub fn print_epoch(info: &EpochInfo) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(
            stdout,
            "{}  year {}  doy {:03}  GPS week {:04}  day {}",
            info.date, info.year, info.doy, info.gps_week, info.day_of_week
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_info_serializes_gps_fields() {
        let epoch = Epoch::from_ymd(2021, 1, 6).unwrap();
        let bytes = JsonOutput::to_bytes(&EpochInfo::from(&epoch)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["gps_week"], 2139);
        assert_eq!(value["day_of_week"], 3);
        assert_eq!(value["doy"], 6);
        assert_eq!(value["date"], "2021-01-06");
    }
}
