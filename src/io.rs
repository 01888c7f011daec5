// Module for loading and validating the emissions table. It reads the csv file, checks the required
// headers, and skips rows that cannot be parsed.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{EmissionsError, Result};

pub const REQUIRED_COLUMNS: [&str; 6] =
    ["year", "country", "gdp", "population", "energy_per_capita", "co2"];

/// One country-year observation. Numeric fields stay optional here; rows with gaps are
/// kept for display and dropped later by the feature preparer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub year: i32,
    pub country: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub gdp: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub population: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub energy_per_capita: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub co2: Option<f64>,
}

pub fn load_csv(path: &Path) -> Result<Vec<EmissionRecord>> {
    info!("Loading emissions data from {}", path.display());
    let file = File::open(path)?;
    read_records(file)
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<EmissionRecord>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b',')
        .flexible(true)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    check_columns(&headers)?;
    let expected_len = headers.len();

    let mut out = Vec::new();
    for result in rdr.records() {
        let raw: StringRecord = result?;
        let line = raw.position().map(|p| p.line()).unwrap_or(0);

        if raw.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        if raw.len() != expected_len {
            warn!(
                "Skipping line {}: expected {} fields, found {}",
                line,
                expected_len,
                raw.len(),
            );
            continue;
        }

        match raw.deserialize::<EmissionRecord>(Some(&headers)) {
            Ok(rec) if rec.country.trim().is_empty() => {
                warn!("Skipping line {}: empty country", line);
            }
            Ok(rec) => out.push(rec),
            Err(e) => warn!("Skipping malformed record at line {}: {}", line, e),
        }
    }

    info!("Read {} records", out.len());
    Ok(out)
}

fn check_columns(headers: &StringRecord) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h.trim() == *col))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EmissionsError::Schema(format!(
            "data must contain these columns: {:?}; missing {:?}",
            REQUIRED_COLUMNS, missing
        )))
    }
}

/// Writes only the required columns, in their canonical order.
pub fn write_csv(path: &Path, records: &[EmissionRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    for rec in records {
        wtr.serialize(rec)?;
    }
    wtr.flush()?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
