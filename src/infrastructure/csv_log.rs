// Append-only CSV sample log
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;

use crate::domain::reading::{GasChannel, Reading};

const HEADER: [&str; 6] = ["Timestamp", "CO2", "CO", "CH4", "H2", "O2"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes one row per accepted sample. Every append opens and closes the
/// file, so an external reader always sees whole rows; the header is written
/// exactly once, when the file is first created. Missing channel values
/// serialize as empty fields.
#[derive(Debug, Clone)]
pub struct CsvLogWriter {
    path: PathBuf,
}

impl CsvLogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Dated log file in `dir`, named like the original tooling:
    /// `xtream_data_2024-11-20_14-03.csv`.
    pub fn for_directory(dir: impl AsRef<Path>) -> Self {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M");
        Self::new(dir.as_ref().join(format!("xtream_data_{stamp}.csv")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, reading: &Reading) -> anyhow::Result<()> {
        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut writer = csv::Writer::from_writer(file);

        if write_header {
            writer.write_record(HEADER)?;
        }

        let mut row = Vec::with_capacity(HEADER.len());
        row.push(reading.timestamp.format(TIMESTAMP_FORMAT).to_string());
        for channel in GasChannel::ALL {
            row.push(match reading.value(channel) {
                Some(value) => value.to_string(),
                None => String::new(),
            });
        }
        writer.write_record(&row)?;
        writer.flush().context("failed to flush sample row")?;
        Ok(())
    }
}
