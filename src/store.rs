use crate::record::{RecordSet, DOI_COLUMN};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of the machine-reloadable baseline format (comma-delimited,
/// header row, quoted where needed).
pub const BASELINE_EXT: &str = "csv";

/// Extension of the human-reviewable report format (tab-separated, header
/// row, no index column; opens as a single sheet in spreadsheet tools).
pub const REPORT_EXT: &str = "tsv";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("baseline file not found: {0}")]
    BaselineMissing(PathBuf),
    #[error("column '{0}' missing from baseline file")]
    MissingColumn(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Full path of an artifact: working folder + caller-supplied alias + fixed
/// extension per artifact kind.
pub fn artifact_path(dir: &Path, alias: &str, ext: &str) -> PathBuf {
    dir.join(format!("{alias}.{ext}"))
}

/// Load the baseline extraction into a normalized record set.
///
/// A missing or unparsable file is fatal for the run; the orchestrator must
/// not proceed to remote fetches afterwards.
pub fn load_baseline(path: &Path) -> Result<RecordSet, StoreError> {
    if !path.exists() {
        return Err(StoreError::BaselineMissing(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)?;

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = RecordSet::new(columns);
    for row in reader.records() {
        let row = row?;
        records.push_row(row.iter().map(|v| v.to_string()).collect());
    }

    let records = records.normalized();
    if records.column_index(DOI_COLUMN).is_none() {
        return Err(StoreError::MissingColumn(DOI_COLUMN.to_string()));
    }
    Ok(records)
}

/// Write a record set in the baseline format, overwriting any existing file.
pub fn write_baseline(path: &Path, records: &RecordSet) -> Result<(), StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_path(path)?;
    write_records(&mut writer, records)
}

/// Write a record set in the report format, overwriting any existing file.
pub fn write_report(path: &Path, records: &RecordSet) -> Result<(), StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    write_records(&mut writer, records)
}

fn write_records<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    records: &RecordSet,
) -> Result<(), StoreError> {
    writer.write_record(records.columns())?;
    for row in records.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
