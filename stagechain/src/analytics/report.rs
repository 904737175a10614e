//! Report rendering stage.

use super::records::Record;
use super::{GEMINI_ANALYSIS, OPENAI_ANALYSIS, PROCESSED_DATA, VISUALIZATION_PATHS};
use crate::context::SharedState;
use crate::core::Event;
use crate::errors::StageError;
use crate::stages::{EventStream, Stage};
use async_stream::stream;
use std::collections::BTreeMap;
use std::path::PathBuf;

const CONTEXT: &str = "Error during visualization generation";
const SNIPPET_CHARS: usize = 70;

/// File name of the revenue-over-time rendering.
pub const REVENUE_OVER_TIME_FILE: &str = "sales_revenue_over_time.csv";
/// File name of the revenue-by-product rendering.
pub const PRODUCT_REVENUE_FILE: &str = "product_revenue.csv";

/// Renders revenue tables from `processed_data` into a results directory.
///
/// The two analyses are optional: when absent, a placeholder note is used.
#[derive(Debug, Clone)]
pub struct ReportStage {
    name: String,
    results_dir: PathBuf,
}

impl ReportStage {
    /// Creates a report stage writing into `results_dir`.
    #[must_use]
    pub fn new(name: impl Into<String>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            results_dir: results_dir.into(),
        }
    }

    fn note(state: &SharedState, key: &str, label: &str) -> String {
        state
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map_or_else(
                || format!("{label} analysis not available."),
                |text| text.chars().take(SNIPPET_CHARS).collect(),
            )
    }

    async fn write(&self, file: &str, contents: Vec<u8>) -> Result<PathBuf, StageError> {
        tokio::fs::create_dir_all(&self.results_dir)
            .await
            .map_err(|e| StageError::collaborator(CONTEXT, e))?;
        let path = self.results_dir.join(file);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| StageError::collaborator(CONTEXT, e))?;
        Ok(path)
    }
}

impl Stage for ReportStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute<'a>(&'a self, state: &'a mut SharedState) -> EventStream<'a> {
        Box::pin(stream! {
            tracing::info!(stage = %self.name, dir = %self.results_dir.display(), "Generating visualizations");

            let records: Vec<Record> = match state.require_as(PROCESSED_DATA) {
                Ok(records) => records,
                Err(err) => {
                    yield err.into_event(&self.name);
                    return;
                }
            };
            let trend_note = Self::note(state, GEMINI_ANALYSIS, "Gemini");
            let anomaly_note = Self::note(state, OPENAI_ANALYSIS, "OpenAI");

            let mut paths: Vec<String> = Vec::new();

            let rendered = match revenue_over_time(&records) {
                Ok(csv) => self.write(REVENUE_OVER_TIME_FILE, csv).await,
                Err(err) => Err(err),
            };
            match rendered {
                Ok(path) => {
                    let shown = path.display().to_string();
                    paths.push(shown.clone());
                    yield Event::progress(&self.name, format!("Sales revenue table saved to {shown}"))
                        .with_data(serde_json::json!({ "note": trend_note }));
                }
                Err(err) => {
                    yield err.into_event(&self.name);
                    return;
                }
            }

            if has_column(&records, "Product_Name") {
                let rendered = match revenue_by_product(&records) {
                    Ok(csv) => self.write(PRODUCT_REVENUE_FILE, csv).await,
                    Err(err) => Err(err),
                };
                match rendered {
                    Ok(path) => {
                        let shown = path.display().to_string();
                        paths.push(shown.clone());
                        yield Event::progress(&self.name, format!("Product revenue table saved to {shown}"))
                            .with_data(serde_json::json!({ "note": anomaly_note }));
                    }
                    Err(err) => {
                        yield err.into_event(&self.name);
                        return;
                    }
                }
            }

            if let Err(err) = state.set_as(VISUALIZATION_PATHS, &paths) {
                yield err.into_event(&self.name);
                return;
            }
            yield Event::progress(&self.name, "Visualizations generated successfully.");
        })
    }
}

fn has_column(records: &[Record], column: &str) -> bool {
    records.iter().any(|r| r.contains_key(column))
}

fn revenue(record: &Record, row: usize) -> Result<f64, StageError> {
    record
        .get("Revenue")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| StageError::collaborator(CONTEXT, format!("row {row} has no numeric 'Revenue'")))
}

fn text_cell<'r>(record: &'r Record, column: &str, row: usize) -> Result<&'r str, StageError> {
    record
        .get(column)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| StageError::collaborator(CONTEXT, format!("row {row} has no '{column}'")))
}

fn render<I, R>(header: &[&str], rows: I) -> Result<Vec<u8>, StageError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|e| StageError::collaborator(CONTEXT, e))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| StageError::collaborator(CONTEXT, e))?;
    }
    writer
        .into_inner()
        .map_err(|e| StageError::collaborator(CONTEXT, e))
}

/// Renders date, category, and revenue per row, ordered by date.
///
/// # Errors
///
/// Returns `StageError::CollaboratorFailure` if a row lacks a date or revenue.
pub fn revenue_over_time(records: &[Record]) -> Result<Vec<u8>, StageError> {
    let mut rows: Vec<[String; 3]> = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let category = record
                .get("Product_Category")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            Ok([
                text_cell(record, "Date", index)?.to_string(),
                category.to_string(),
                format!("{:.2}", revenue(record, index)?),
            ])
        })
        .collect::<Result<_, StageError>>()?;
    rows.sort_by(|a, b| a[0].cmp(&b[0]));

    render(&["Date", "Product_Category", "Revenue"], rows)
}

/// Renders total revenue per product, highest first.
///
/// # Errors
///
/// Returns `StageError::CollaboratorFailure` if a row lacks a product or revenue.
pub fn revenue_by_product(records: &[Record]) -> Result<Vec<u8>, StageError> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        *totals.entry(text_cell(record, "Product_Name", index)?).or_default() +=
            revenue(record, index)?;
    }

    let mut ranked: Vec<(&str, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    render(
        &["Product_Name", "Total_Revenue"],
        ranked
            .into_iter()
            .map(|(name, total)| [name.to_string(), format!("{total:.2}")]),
    )
}
