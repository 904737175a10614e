//! Data preprocessing stage.

use super::records::Record;
use super::{PROCESSED_DATA, RAW_DATA};
use crate::context::SharedState;
use crate::core::Event;
use crate::errors::StageError;
use crate::stages::{EventStream, Stage};
use async_stream::stream;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

const DATE_COLUMN: &str = "Date";
const CONTEXT: &str = "Error during data preprocessing";

/// Cleans `raw_data` into `processed_data`.
///
/// Nulls in numeric columns become 0 and the `Date` column is normalized to
/// `YYYY-MM-DD`. A column is numeric when every non-null cell is a number.
#[derive(Debug, Clone)]
pub struct PreprocessorStage {
    name: String,
}

/// What preprocessing changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessStats {
    /// Number of rows processed.
    pub rows: usize,
    /// Number of null numeric cells replaced with 0.
    pub filled: usize,
}

impl PreprocessorStage {
    /// Creates a new preprocessor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn process(state: &mut SharedState) -> Result<PreprocessStats, StageError> {
        let mut records: Vec<Record> = state.require_as(RAW_DATA)?;
        let stats = clean_records(&mut records)?;
        state.set_as(PROCESSED_DATA, &records)?;
        Ok(stats)
    }
}

impl Stage for PreprocessorStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute<'a>(&'a self, state: &'a mut SharedState) -> EventStream<'a> {
        Box::pin(stream! {
            tracing::info!(stage = %self.name, "Preprocessing data");

            match Self::process(state) {
                Ok(stats) => {
                    yield Event::progress(
                        &self.name,
                        "Data preprocessing complete. Processed data stored in state.",
                    )
                    .with_data(serde_json::json!({ "rows": stats.rows, "filled": stats.filled }));
                }
                Err(err) => {
                    yield err.into_event(&self.name);
                }
            }
        })
    }
}

/// Fills numeric nulls and normalizes dates in place.
///
/// # Errors
///
/// Returns `StageError::CollaboratorFailure` if a date cell cannot be parsed.
pub fn clean_records(records: &mut [Record]) -> Result<PreprocessStats, StageError> {
    let numeric = numeric_columns(records);
    let mut filled = 0;

    for (index, record) in records.iter_mut().enumerate() {
        for column in &numeric {
            let cell = record
                .entry(column.clone())
                .or_insert(serde_json::Value::Null);
            if cell.is_null() {
                *cell = serde_json::json!(0);
                filled += 1;
            }
        }

        if let Some(cell) = record.get_mut(DATE_COLUMN) {
            if let Some(raw) = cell.as_str() {
                let date = normalize_date(raw).ok_or_else(|| {
                    StageError::collaborator(CONTEXT, format!("invalid date '{raw}' in row {index}"))
                })?;
                *cell = serde_json::json!(date.format("%Y-%m-%d").to_string());
            }
        }
    }

    Ok(PreprocessStats {
        rows: records.len(),
        filled,
    })
}

fn numeric_columns(records: &[Record]) -> BTreeSet<String> {
    let mut candidates: BTreeSet<String> = BTreeSet::new();
    let mut rejected: BTreeSet<String> = BTreeSet::new();

    for record in records {
        for (column, value) in record {
            if value.is_number() {
                candidates.insert(column.clone());
            } else if !value.is_null() {
                rejected.insert(column.clone());
            }
        }
    }

    candidates.difference(&rejected).cloned().collect()
}

fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(raw, "%m/%d/%Y").ok())
}
